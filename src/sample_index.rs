//! Lookup index from samples to the plate wells they were run in.
//!
//! Writes are per plate: a plate processed again on the same day replaces
//! everything previously stored for it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::align::Plate;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PlateKey {
    pub project: String,
    pub date: NaiveDate,
    pub plate_label: String,
}

impl PlateKey {
    pub fn new(project: &str, date: NaiveDate, plate_label: &str) -> Self {
        Self {
            project: project.to_string(),
            date,
            plate_label: plate_label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub well_label: String,
    pub sample_name: String,
    pub barcode: String,
}

/// A search result: the stored entry and the plate it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexHit {
    pub key: PlateKey,
    pub entry: IndexEntry,
}

pub trait SampleIndex {
    /// Drop every entry stored under `key`, then store `entries`.
    fn replace_plate(&mut self, key: PlateKey, entries: Vec<IndexEntry>) -> Result<()>;

    /// Entries whose sample name contains `name`, ignoring case.
    fn search_by_name(&self, name: &str) -> Vec<IndexHit>;

    /// Entries whose barcode is `barcode`, with or without a hyphen suffix.
    fn search_by_barcode(&self, barcode: &str) -> Vec<IndexHit>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Index entries for every used well of a matched plate, in well order.
pub fn plate_entries(plate: &Plate) -> Vec<IndexEntry> {
    plate
        .wells
        .iter()
        .filter(|w| !w.is_unused())
        .map(|w| IndexEntry {
            well_label: w.label(),
            sample_name: w.matched_sample_name.clone(),
            barcode: w.origin_barcode.clone(),
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct InMemorySampleIndex {
    plates: BTreeMap<PlateKey, Vec<IndexEntry>>,
}

impl InMemorySampleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plate(&self, key: &PlateKey) -> Option<&[IndexEntry]> {
        self.plates.get(key).map(Vec::as_slice)
    }

    fn hits<F>(&self, mut keep: F) -> Vec<IndexHit>
    where
        F: FnMut(&IndexEntry) -> bool,
    {
        self.plates
            .iter()
            .flat_map(|(key, entries)| {
                entries
                    .iter()
                    .filter(|e| keep(e))
                    .map(|e| IndexHit {
                        key: key.clone(),
                        entry: e.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl SampleIndex for InMemorySampleIndex {
    fn replace_plate(&mut self, key: PlateKey, entries: Vec<IndexEntry>) -> Result<()> {
        log::debug!(
            "index {} {} {}: {} entries",
            key.project,
            key.date,
            key.plate_label,
            entries.len()
        );
        if entries.is_empty() {
            self.plates.remove(&key);
        } else {
            self.plates.insert(key, entries);
        }
        Ok(())
    }

    fn search_by_name(&self, name: &str) -> Vec<IndexHit> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.hits(|e| e.sample_name.to_lowercase().contains(&needle))
    }

    fn search_by_barcode(&self, barcode: &str) -> Vec<IndexHit> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Vec::new();
        }
        self.hits(|e| {
            e.barcode == barcode
                || e.barcode
                    .split_once('-')
                    .is_some_and(|(cut, _)| cut == barcode)
        })
    }

    fn len(&self) -> usize {
        self.plates.values().map(Vec::len).sum()
    }
}
