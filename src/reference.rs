//! The project's "worksheet mapping": barcodes of curve standards, QC
//! material and test tubes, each tagged with a code such as `STD3` or `QC1`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub barcode: String,
    pub name: String,
    pub code: String,
}

impl MappingEntry {
    pub fn new(barcode: &str, name: &str, code: &str) -> Self {
        Self {
            barcode: barcode.to_string(),
            name: name.to_string(),
            code: code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: Vec<MappingEntry>,
    by_barcode: HashMap<String, usize>,
}

impl ReferenceTable {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        let mut by_barcode = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if !entry.barcode.is_empty() {
                by_barcode.entry(entry.barcode.clone()).or_insert(i);
            }
        }
        Self {
            entries,
            by_barcode,
        }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn is_reference(&self, barcode: &str) -> bool {
        self.by_barcode.contains_key(barcode)
    }

    pub fn get(&self, barcode: &str) -> Option<&MappingEntry> {
        self.by_barcode.get(barcode).map(|&i| &self.entries[i])
    }

    pub fn name_for(&self, barcode: &str) -> Option<&str> {
        self.get(barcode).map(|e| e.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
