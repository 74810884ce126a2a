//! Resolving well barcodes to sample names through the station list.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Serialize, Serializer};

use crate::align::Plate;
use crate::records::StationEntry;
use crate::reference::ReferenceTable;
use crate::schema::sentinel;

/// Sample-name prefixes in display order; anything else sorts last.
const NAME_PRIORITY: [(&str, u8); 6] = [
    ("VF", 1),
    ("AE", 2),
    ("VD", 3),
    ("V", 4),
    ("VK", 5),
    ("WV", 6),
];
const LOWEST_PRIORITY: u8 = NAME_PRIORITY.len() as u8 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateFlag {
    /// The barcode maps to the same name more than once.
    Likely,
    /// Distinct names share a barcode that occurs on several wells.
    True,
}

impl DuplicateFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateFlag::Likely => "Likely",
            DuplicateFlag::True => "TRUE",
        }
    }
}

impl fmt::Display for DuplicateFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DuplicateFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Barcode -> sample names, keeping station-list order and duplicates.
#[derive(Debug, Clone, Default)]
pub struct StationLookup {
    names: HashMap<String, Vec<String>>,
}

impl StationLookup {
    pub fn new(entries: &[StationEntry]) -> Self {
        let mut names: HashMap<String, Vec<String>> = HashMap::new();
        for entry in entries {
            let barcode = entry.main_barcode.trim();
            if barcode.is_empty() {
                continue;
            }
            names
                .entry(barcode.to_string())
                .or_default()
                .push(entry.sample_name.trim().to_string());
        }
        Self { names }
    }

    pub fn lookup(&self, barcode: &str) -> &[String] {
        self.names.get(barcode).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    pub display_name: String,
    pub duplicate_flag: Option<DuplicateFlag>,
    pub duplicate_sample: bool,
}

impl MatchOutcome {
    fn single(name: String, duplicate_flag: Option<DuplicateFlag>) -> Self {
        Self {
            matched: true,
            display_name: name,
            duplicate_flag,
            duplicate_sample: false,
        }
    }

    fn combined(names: &[&str], count: usize) -> Self {
        let repeated = count >= 2;
        Self {
            matched: true,
            display_name: names.join("-"),
            duplicate_flag: repeated.then_some(DuplicateFlag::True),
            duplicate_sample: repeated,
        }
    }
}

fn name_priority(name: &str) -> u8 {
    let lookup = |prefix: &str| {
        NAME_PRIORITY
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|&(_, rank)| rank)
    };
    let two: String = name.chars().take(2).collect();
    let one: String = name.chars().take(1).collect();
    (two.chars().count() == 2)
        .then(|| lookup(&two))
        .flatten()
        .or_else(|| lookup(&one))
        .unwrap_or(LOWEST_PRIORITY)
}

/// Resolve one barcode given the names the station list holds for it and
/// the number of wells on the plate carrying it.
pub fn match_barcode(barcode: &str, names: &[String], count: usize) -> MatchOutcome {
    match names {
        [] => MatchOutcome {
            matched: false,
            display_name: barcode.to_string(),
            duplicate_flag: None,
            duplicate_sample: false,
        },
        [name] => MatchOutcome::single(name.clone(), None),
        [a, b] if a == b => MatchOutcome::single(a.clone(), Some(DuplicateFlag::Likely)),
        [a, b] => MatchOutcome::combined(&[a.as_str(), b.as_str()], count),
        _ => {
            let mut seen = HashSet::new();
            let mut unique: Vec<&str> = names
                .iter()
                .map(String::as_str)
                .filter(|n| seen.insert(*n))
                .collect();
            unique.sort_by_key(|n| name_priority(n));
            if unique.len() < 2 {
                MatchOutcome::single(unique.join("-"), Some(DuplicateFlag::Likely))
            } else {
                MatchOutcome::combined(&unique, count)
            }
        }
    }
}

/// Fill the match fields of every well on the plate.
pub fn match_plate(plate: &mut Plate, stations: &StationLookup, reference: &ReferenceTable) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for well in &plate.wells {
        *counts.entry(well.cut_barcode.clone()).or_default() += 1;
    }

    for well in &mut plate.wells {
        let count = counts.get(&well.cut_barcode).copied().unwrap_or(0);
        let outcome = match_barcode(&well.cut_barcode, stations.lookup(&well.cut_barcode), count);
        well.matched = outcome.matched;
        well.duplicate_flag = outcome.duplicate_flag;
        well.duplicate_sample = outcome.duplicate_sample;
        well.display_name = outcome.display_name;

        well.matched_sample_name = if let Some(name) = reference.name_for(&well.cut_barcode) {
            well.display_name = name.to_string();
            name.to_string()
        } else if well.is_locator {
            well.display_name = well.locator_label.clone();
            well.locator_label.clone()
        } else if well.matched {
            well.display_name.clone()
        } else if well.is_unused() {
            String::new()
        } else {
            sentinel::NO_MATCH.to_string()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_plate;
    use crate::grid::{FillOrder, Position};
    use crate::records::ScanRow;
    use crate::reference::MappingEntry;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_barcode_is_unmatched() {
        let outcome = match_barcode("AB1", &[], 1);
        assert!(!outcome.matched);
        assert_eq!(outcome.display_name, "AB1");
        assert_eq!(outcome.duplicate_flag, None);
        assert_eq!(match_barcode("", &[], 1).display_name, "");
    }

    #[test]
    fn single_name_matches() {
        let outcome = match_barcode("AB1", &names(&["S001"]), 1);
        assert!(outcome.matched);
        assert_eq!(outcome.display_name, "S001");
        assert_eq!(outcome.duplicate_flag, None);
    }

    #[test]
    fn identical_pair_is_likely_duplicate() {
        let outcome = match_barcode("AB1", &names(&["S001", "S001"]), 1);
        assert_eq!(outcome.display_name, "S001");
        assert_eq!(outcome.duplicate_flag, Some(DuplicateFlag::Likely));
    }

    #[test]
    fn distinct_pair_is_combined() {
        let outcome = match_barcode("AB1", &names(&["S001", "S002"]), 2);
        assert_eq!(outcome.display_name, "S001-S002");
        assert_eq!(outcome.duplicate_flag, Some(DuplicateFlag::True));
        assert!(outcome.duplicate_sample);

        let once = match_barcode("AB1", &names(&["S001", "S002"]), 1);
        assert_eq!(once.display_name, "S001-S002");
        assert_eq!(once.duplicate_flag, None);
        assert!(!once.duplicate_sample);
    }

    #[test]
    fn many_names_dedupe_and_sort_by_priority() {
        let outcome = match_barcode(
            "AB1",
            &names(&["X9", "V12", "VK3", "VF1", "V12", "AE2"]),
            3,
        );
        assert_eq!(outcome.display_name, "VF1-AE2-V12-VK3-X9");
        assert_eq!(outcome.duplicate_flag, Some(DuplicateFlag::True));

        let same = match_barcode("AB1", &names(&["S1", "S1", "S1"]), 3);
        assert_eq!(same.display_name, "S1");
        assert!(!same.duplicate_sample);
    }

    #[test]
    fn priorities() {
        assert_eq!(name_priority("VF100"), 1);
        assert_eq!(name_priority("VK100"), 5);
        assert_eq!(name_priority("V100"), 4);
        assert_eq!(name_priority("V"), 4);
        assert_eq!(name_priority("WV1"), 6);
        assert_eq!(name_priority("Q1"), LOWEST_PRIORITY);
        assert_eq!(name_priority(""), LOWEST_PRIORITY);
    }

    #[test]
    fn plate_matching_classifies_wells() {
        let rows = vec![
            ScanRow::new("A1", "OK", "AB1234"),
            ScanRow::new("A2", "OK", "AB1234-2"),
            ScanRow::new("A3", "OK", "C001"),
            ScanRow::new("A4", "OK", "ZZ999"),
        ];
        let mut plate = align_plate(&rows, &[0, 1, 2, 3], FillOrder::RowMajor, 1, true);
        let stations = StationLookup::new(&[
            StationEntry::new("AB1234", "S001"),
            StationEntry::new("AB1234", "S002"),
        ]);
        let reference = ReferenceTable::new(vec![MappingEntry::new("C001", "STD0", "STD0")]);
        match_plate(&mut plate, &stations, &reference);

        let well = |label: &str| plate.well(Position::parse(label).unwrap()).clone();
        assert_eq!(well("A1").matched_sample_name, "S001-S002");
        assert_eq!(well("A2").duplicate_flag, Some(DuplicateFlag::True));
        assert_eq!(well("A3").matched_sample_name, "STD0");
        assert_eq!(well("A4").matched_sample_name, "No match");
        assert_eq!(well("A4").display_name, "ZZ999");
        assert_eq!(well("A5").matched_sample_name, "");
        assert_eq!(well("B1").matched_sample_name, "X1");
    }
}
