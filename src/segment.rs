//! Splitting a multi-plate scan export into per-plate row groups.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::{sequence_number, WELLS_PER_PLATE};
use crate::records::ScanRow;

/// How a platform's scan export is split into plates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segmentation {
    /// Every row belongs to one plate; its number may be carried by a
    /// locator marker (`X<n>`) on any row.
    #[default]
    SinglePlate,
    /// Rows are grouped by the trailing integer of their labware id.
    MultiPlate,
}

/// Row indices (into the scan export) of one physical plate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateRows {
    pub plate_number: u32,
    pub row_indices: Vec<usize>,
}

/// Partition `rows` into plates, ascending by plate number. Row indices keep
/// scan order within each plate and every row lands in exactly one plate.
pub fn segment_plates(
    rows: &[ScanRow],
    strategy: Segmentation,
    rows_per_plate: usize,
) -> Vec<PlateRows> {
    if rows.is_empty() {
        return Vec::new();
    }
    match strategy {
        Segmentation::SinglePlate => vec![PlateRows {
            plate_number: single_plate_number(rows),
            row_indices: (0..rows.len()).collect(),
        }],
        Segmentation::MultiPlate if rows.iter().all(|r| labware(r).is_none()) => {
            log::warn!(
                "no labware ids in scan export, chunking {} rows by {}",
                rows.len(),
                rows_per_plate.max(1)
            );
            chunk_rows(rows.len(), rows_per_plate)
        }
        Segmentation::MultiPlate => group_by_labware(rows),
    }
}

fn single_plate_number(rows: &[ScanRow]) -> u32 {
    rows.iter()
        .filter_map(ScanRow::locator_marker)
        .find(|&n| n >= 1)
        .unwrap_or(1)
}

fn labware(row: &ScanRow) -> Option<&str> {
    row.labware_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Trailing integer of a labware id, e.g. `"RACK_A00_0007"` -> 7.
fn trailing_number(id: &str) -> Option<u32> {
    let digits = id.len() - id.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    id[id.len() - digits..].parse().ok().filter(|&n| n >= 1)
}

/// Plate derived from the position label when the labware id has no usable
/// number: readings are bucketed 96 at a time by sequence number.
fn position_group(row: &ScanRow) -> u32 {
    sequence_number(&row.position_label)
        .map(|seq| ((seq - 1) / WELLS_PER_PLATE + 1) as u32)
        .unwrap_or(1)
}

fn group_by_labware(rows: &[ScanRow]) -> Vec<PlateRows> {
    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        let group = labware(row)
            .and_then(trailing_number)
            .unwrap_or_else(|| position_group(row));
        groups.entry(group).or_default().push(i);
    }
    groups
        .into_iter()
        .map(|(plate_number, row_indices)| PlateRows {
            plate_number,
            row_indices,
        })
        .collect()
}

// Heuristic only: nothing guarantees a malformed export is laid out in
// whole-plate runs.
fn chunk_rows(len: usize, rows_per_plate: usize) -> Vec<PlateRows> {
    let size = rows_per_plate.max(1);
    (0..len)
        .collect::<Vec<_>>()
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| PlateRows {
            plate_number: i as u32 + 1,
            row_indices: chunk.to_vec(),
        })
        .collect()
}
