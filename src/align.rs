//! Mapping one plate's raw scan rows onto the canonical 96-well grid.

use std::collections::HashMap;

use serde::Serialize;

use crate::grid::{canonical_positions, locator_label, FillOrder, Position, COLUMNS};
use crate::matcher::DuplicateFlag;
use crate::records::ScanRow;
use crate::schema::sentinel;

/// One of the 96 wells of a plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Well {
    pub position: Position,
    pub status: String,
    pub origin_barcode: String,
    /// Barcode before the first hyphen.
    pub cut_barcode: String,
    /// Hyphen plus remainder, or empty.
    pub sub_barcode: String,
    pub warm: String,
    /// A scan row was present for this position.
    pub scanned: bool,
    pub is_locator: bool,
    pub locator_label: String,

    // Filled in by the matcher.
    pub matched: bool,
    /// Grid display text; also the worklist key of clinical wells.
    pub display_name: String,
    pub matched_sample_name: String,
    pub duplicate_flag: Option<DuplicateFlag>,
    pub duplicate_sample: bool,
}

impl Well {
    fn missing(position: Position) -> Self {
        Self::from_fields(position, sentinel::NOT_USED, sentinel::NO_TUBE, "", false)
    }

    fn from_fields(
        position: Position,
        status: &str,
        origin_barcode: &str,
        warm: &str,
        scanned: bool,
    ) -> Self {
        Self {
            position,
            status: status.to_string(),
            origin_barcode: origin_barcode.to_string(),
            cut_barcode: String::new(),
            sub_barcode: String::new(),
            warm: warm.to_string(),
            scanned,
            is_locator: false,
            locator_label: String::new(),
            matched: false,
            display_name: String::new(),
            matched_sample_name: String::new(),
            duplicate_flag: None,
            duplicate_sample: false,
        }
    }

    pub fn label(&self) -> String {
        self.position.to_string()
    }

    pub fn well_index(&self) -> usize {
        self.position.well_index()
    }

    /// No tube was scanned here and nothing was substituted.
    pub fn is_unused(&self) -> bool {
        !self.is_locator
            && (self.cut_barcode.is_empty() || self.cut_barcode == sentinel::NO_TUBE)
    }

    fn split_barcode(&mut self) {
        let (cut, sub) = split_barcode(&self.origin_barcode);
        self.cut_barcode = cut;
        self.sub_barcode = sub;
    }
}

/// Split on the first hyphen: `"AB12-2"` -> `("AB12", "-2")`.
pub fn split_barcode(barcode: &str) -> (String, String) {
    match barcode.split_once('-') {
        Some((cut, rest)) => (cut.to_string(), format!("-{rest}")),
        None => (barcode.to_string(), String::new()),
    }
}

/// One physical plate with exactly 96 wells in row-major order.
#[derive(Debug, Clone, Serialize)]
pub struct Plate {
    pub plate_number: u32,
    pub plate_label: String,
    pub fill_order: FillOrder,
    pub wells: Vec<Well>,
}

impl Plate {
    /// 8 rows of 12 wells.
    pub fn grid(&self) -> impl Iterator<Item = &[Well]> {
        self.wells.chunks(COLUMNS)
    }

    pub fn well(&self, position: Position) -> &Well {
        &self.wells[position.well_index() - 1]
    }
}

/// Align the rows selected by `row_indices` onto the 96 canonical positions.
///
/// When `locator_markers` is set the platform reports locator wells through the
/// diagnostic marker, so marked wells are flagged instead of substituted.
pub fn align_plate(
    rows: &[ScanRow],
    row_indices: &[usize],
    fill_order: FillOrder,
    plate_number: u32,
    locator_markers: bool,
) -> Plate {
    let mut lookup: HashMap<Position, &ScanRow> = HashMap::new();
    for row in row_indices.iter().filter_map(|&i| rows.get(i)) {
        match Position::from_label(&row.position_label, fill_order) {
            Ok(position) => {
                lookup.insert(position, row);
            }
            Err(e) => log::warn!("plate {plate_number}: skipping row, {e}"),
        }
    }

    let mut wells: Vec<Well> = canonical_positions()
        .map(|position| match lookup.get(&position) {
            Some(row) => {
                let mut well = Well::from_fields(
                    position,
                    &row.status_text,
                    &row.origin_barcode,
                    row.warm(),
                    true,
                );
                if let Some(n) = row.locator_marker().filter(|_| locator_markers) {
                    well.is_locator = true;
                    well.locator_label = locator_label(n);
                }
                well
            }
            None => Well::missing(position),
        })
        .collect();

    match Position::locator(plate_number) {
        Some(position) => {
            let well = &mut wells[position.well_index() - 1];
            if !well.scanned {
                well.origin_barcode = locator_label(plate_number);
                well.is_locator = true;
                well.locator_label = locator_label(plate_number);
            }
        }
        None => log::warn!("plate {plate_number} has no locator well"),
    }

    for well in &mut wells {
        well.split_barcode();
    }

    Plate {
        plate_number,
        plate_label: locator_label(plate_number),
        fill_order,
        wells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::WELLS_PER_PLATE;
    use std::collections::HashSet;

    fn plate_of(rows: &[ScanRow], plate_number: u32) -> Plate {
        let indices: Vec<usize> = (0..rows.len()).collect();
        align_plate(rows, &indices, FillOrder::RowMajor, plate_number, true)
    }

    #[test]
    fn every_position_present_exactly_once() {
        let rows = vec![
            ScanRow::new("A1", "OK", "AB1"),
            ScanRow::new("bogus", "OK", "AB2"),
            ScanRow::new("H12", "OK", "AB3"),
        ];
        let plate = plate_of(&rows, 1);
        assert_eq!(plate.wells.len(), WELLS_PER_PLATE);
        let positions: HashSet<Position> = plate.wells.iter().map(|w| w.position).collect();
        assert_eq!(positions.len(), WELLS_PER_PLATE);
        for (i, well) in plate.wells.iter().enumerate() {
            assert_eq!(well.well_index(), i + 1);
        }
        assert_eq!(plate.grid().count(), 8);
    }

    #[test]
    fn missing_positions_are_synthesized() {
        let plate = plate_of(&[ScanRow::new("A1", "OK", "AB1")], 1);
        let well = plate.well(Position::parse("A2").unwrap());
        assert_eq!(well.status, "Not used");
        assert_eq!(well.origin_barcode, "NOTUBE");
        assert_eq!(well.warm, "");
        assert!(!well.scanned);
        assert!(well.is_unused());
    }

    #[test]
    fn last_row_wins_on_label_collision() {
        let rows = vec![ScanRow::new("A1", "OK", "FIRST"), ScanRow::new("A1", "OK", "SECOND")];
        let plate = plate_of(&rows, 1);
        assert_eq!(plate.wells[0].origin_barcode, "SECOND");
    }

    #[test]
    fn locator_substituted_into_missing_well() {
        let plate = plate_of(&[ScanRow::new("A1", "OK", "AB1")], 13);
        let well = plate.well(Position::parse("C1").unwrap());
        assert_eq!(well.origin_barcode, "X13");
        assert_eq!(well.cut_barcode, "X13");
        assert!(well.is_locator);
        assert_eq!(plate.plate_label, "X13");
    }

    #[test]
    fn scanned_locator_is_marked_not_substituted() {
        let rows = vec![ScanRow::new("B2", "OK", "RACKTAG").with_warm("X2")];
        let plate = plate_of(&rows, 2);
        let well = plate.well(Position::parse("B2").unwrap());
        assert_eq!(well.origin_barcode, "RACKTAG");
        assert!(well.is_locator);
        assert_eq!(well.locator_label, "X2");
    }

    #[test]
    fn scanned_sample_at_locator_position_is_kept() {
        let rows = vec![ScanRow::new("B1", "OK", "AB1")];
        let plate = plate_of(&rows, 1);
        let well = plate.well(Position::parse("B1").unwrap());
        assert_eq!(well.origin_barcode, "AB1");
        assert!(!well.is_locator);
    }

    #[test]
    fn plates_past_the_locator_range_are_left_alone() {
        let plate = plate_of(&[], 85);
        assert!(plate.wells.iter().all(|w| !w.is_locator));
    }

    #[test]
    fn barcodes_split_on_first_hyphen() {
        assert_eq!(split_barcode("AB12-2-b"), ("AB12".into(), "-2-b".into()));
        assert_eq!(split_barcode("AB12"), ("AB12".into(), String::new()));
        assert_eq!(split_barcode(""), (String::new(), String::new()));
    }

    #[test]
    fn slot_labels_follow_fill_order() {
        let rows = vec![ScanRow::new("2", "OK", "AB2")];
        let plate = align_plate(&rows, &[0], FillOrder::ColumnMajor, 1, false);
        assert_eq!(plate.well(Position::parse("B1").unwrap()).origin_barcode, "AB2");
    }
}
