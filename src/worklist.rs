//! Projection of a matched plate onto the instrument's worklist template.
//!
//! The output is one row per worklist key in a fixed bracket order (blanks,
//! tests, standards, QCs, clinical samples, QCs again). Each row starts empty
//! and is filled by the project's directive table: every directive selects a
//! class of rows and patches column values into them, resolving the
//! `{{Well_Number}}` / `{{Well_Position}}` / `{{Sample_Name}}` placeholders
//! against the plate.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::align::{Plate, Well};
use crate::grid::{locator_plate_number, Position};
use crate::reference::ReferenceTable;
use crate::schema::placeholder;

/// Worklist keys with more hyphens than this are dropped.
const MAX_KEY_HYPHENS: usize = 3;

const WILDCARD_KEY: &str = "*";
const PREFIX_CLASSES: [&str; 2] = ["DB", "Test"];

/// Which worklist rows a directive applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Rows whose key equals the code (`STD3`, `QC1`, ...).
    ExactCode(String),
    /// Rows whose key starts with the prefix (`DB`, `Test`, `DB2`, ...).
    PrefixClass(String),
    /// Rows whose first template column is still empty.
    Wildcard,
}

impl Selector {
    pub fn parse(sample_key: &str) -> Self {
        let key = sample_key.trim();
        if key == WILDCARD_KEY {
            Selector::Wildcard
        } else if PREFIX_CLASSES.iter().any(|p| key.starts_with(p)) {
            Selector::PrefixClass(key.to_string())
        } else {
            Selector::ExactCode(key.to_string())
        }
    }

    pub fn selects(&self, row: &WorklistRow) -> bool {
        match self {
            Selector::ExactCode(code) => row.key == *code,
            Selector::PrefixClass(prefix) => row.key.starts_with(prefix.as_str()),
            Selector::Wildcard => row.cells.first().map_or(true, |c| c.is_empty()),
        }
    }
}

/// One row of the "worklist mapping" sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklistDirective {
    pub selector: Selector,
    /// `(template column, fill value)` pairs; values may hold placeholders.
    pub cells: Vec<(String, String)>,
}

impl WorklistDirective {
    pub fn new(sample_key: &str, cells: Vec<(String, String)>) -> Self {
        Self {
            selector: Selector::parse(sample_key),
            cells: cells.into_iter().filter(|(_, v)| !v.is_empty()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorklistRow {
    pub key: String,
    /// One cell per template column, in template order.
    pub cells: Vec<String>,
}

/// Name -> barcodes, each consumed at most once.
///
/// A name can label several tubes (the same QC level before and after the
/// clinical block, or a duplicated sample). Every worklist row that needs a
/// well position takes the next barcode queued under its key, so repeated
/// keys land on successive tubes.
#[derive(Debug, Clone, Default)]
pub struct NameQueue {
    queues: HashMap<String, VecDeque<String>>,
}

impl NameQueue {
    pub fn push(&mut self, name: &str, barcode: &str) {
        self.queues
            .entry(name.to_string())
            .or_default()
            .push_back(barcode.to_string());
    }

    pub fn consume(&mut self, name: &str) -> Option<String> {
        self.queues.get_mut(name).and_then(VecDeque::pop_front)
    }

    pub fn remaining(&self, name: &str) -> usize {
        self.queues.get(name).map_or(0, VecDeque::len)
    }
}

/// Per-plate lookups used to resolve well placeholders.
#[derive(Debug, Clone, Default)]
pub struct PlateLookup {
    by_barcode: HashMap<String, Position>,
    names: NameQueue,
}

impl PlateLookup {
    pub fn build(plate: &Plate, reference: &ReferenceTable) -> Self {
        let mut by_barcode = HashMap::new();
        for well in plate.wells.iter().filter(|w| !w.is_unused()) {
            by_barcode
                .entry(well.cut_barcode.clone())
                .or_insert(well.position);
        }

        let mut names = NameQueue::default();
        for entry in reference.entries() {
            if by_barcode.contains_key(&entry.barcode) {
                names.push(&entry.name, &entry.barcode);
            }
        }
        for well in clinical_wells(plate, reference) {
            names.push(&clinical_key(well), &well.cut_barcode);
        }

        Self { by_barcode, names }
    }

    /// Well position for a worklist key. Locator keys (`X<n>`) map straight
    /// to their locator well; anything else consumes one queued barcode.
    pub fn resolve(&mut self, key: &str) -> Option<Position> {
        if let Some(n) = locator_plate_number(key) {
            return Position::locator(n);
        }
        if let Some(position) = self
            .names
            .consume(key)
            .and_then(|barcode| self.by_barcode.get(&barcode).copied())
        {
            return Some(position);
        }
        self.by_barcode.get(key).copied()
    }
}

/// Everything the projector needs besides the plate and directives.
#[derive(Debug, Clone, Default)]
pub struct ProjectionConfig {
    pub columns: Vec<String>,
    pub test_count: u32,
    pub curve_points: u32,
    pub qc_names: Vec<String>,
    pub qc_insert: bool,
    pub volume_column: Option<String>,
    pub injection_volume: String,
    pub injection_plate_column: Option<String>,
    pub injection_plate: Option<String>,
    pub set_name_column: Option<String>,
    pub output_path_column: Option<String>,
    pub instrument: String,
    pub project: String,
    pub date: NaiveDate,
}

impl ProjectionConfig {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn optional_index(&self, name: &Option<String>) -> Option<usize> {
        name.as_deref().and_then(|n| self.column_index(n))
    }

    pub fn set_name(&self, plate_label: &str) -> String {
        format!(
            "{}-{}-{}-{}",
            self.instrument,
            self.project,
            self.date.format("%Y%m%d"),
            plate_label
        )
    }

    pub fn output_path(&self, set_name: &str) -> String {
        format!(
            "{}\\{}\\Data{}",
            self.date.year(),
            self.date.format("%Y%m"),
            set_name
        )
    }
}

fn clinical_wells<'a>(
    plate: &'a Plate,
    reference: &'a ReferenceTable,
) -> impl Iterator<Item = &'a Well> {
    plate
        .wells
        .iter()
        .filter(move |w| !w.is_unused() && !reference.is_reference(&w.cut_barcode))
}

fn clinical_key(well: &Well) -> String {
    if well.is_locator {
        well.locator_label.clone()
    } else {
        well.display_name.clone()
    }
}

/// Worklist keys in output order.
pub fn output_keys(
    config: &ProjectionConfig,
    plate: &Plate,
    reference: &ReferenceTable,
) -> Vec<String> {
    let mut keys = vec!["DB1".to_string()];
    keys.extend((0..config.test_count).map(|i| format!("Test{i}")));
    keys.push("DB2".to_string());
    keys.extend((0..=config.curve_points).map(|i| format!("STD{i}")));
    keys.push("DB3".to_string());
    keys.extend(config.qc_names.iter().cloned());
    keys.push("DB4".to_string());

    let mut seen = HashSet::new();
    keys.extend(
        clinical_wells(plate, reference)
            .map(clinical_key)
            .filter(|k| seen.insert(k.clone())),
    );

    if config.qc_insert {
        keys.extend(config.qc_names.iter().cloned());
    }
    keys.push("DB5".to_string());

    keys.retain(|k| {
        let keep = k.matches('-').count() <= MAX_KEY_HYPHENS;
        if !keep {
            log::warn!("{}: dropping worklist key {k}", plate.plate_label);
        }
        keep
    });
    keys
}

struct Projector<'a> {
    config: &'a ProjectionConfig,
    lookup: PlateLookup,
    resolved: HashMap<usize, Option<Position>>,
}

impl Projector<'_> {
    fn position(&mut self, row: usize, key: &str) -> Option<Position> {
        if let Some(position) = self.resolved.get(&row) {
            return *position;
        }
        let position = self.lookup.resolve(key);
        if position.is_none() {
            log::warn!("no well found for worklist key {key}");
        }
        self.resolved.insert(row, position);
        position
    }

    fn fill(&mut self, value: &str, row: usize, key: &str) -> String {
        let needs_well =
            value.contains(placeholder::WELL_NUMBER) || value.contains(placeholder::WELL_POSITION);
        let mut out = value.replace(placeholder::SAMPLE_NAME, key);
        if needs_well {
            let Some(position) = self.position(row, key) else {
                return String::new();
            };
            out = out
                .replace(placeholder::WELL_NUMBER, &position.well_index().to_string())
                .replace(placeholder::WELL_POSITION, &position.to_string());
        }
        out
    }

    fn apply(&mut self, directive: &WorklistDirective, rows: &mut [WorklistRow]) {
        let volume = self.config.optional_index(&self.config.volume_column);
        let targets: Vec<(usize, &str)> = directive
            .cells
            .iter()
            .filter_map(|(column, value)| match self.config.column_index(column) {
                Some(i) if Some(i) != volume => Some((i, value.as_str())),
                Some(_) => None,
                None => {
                    log::warn!("directive column {column} is not in the template");
                    None
                }
            })
            .collect();

        for (r, row) in rows.iter_mut().enumerate() {
            if !directive.selector.selects(row) {
                continue;
            }
            for &(i, value) in &targets {
                row.cells[i] = self.fill(value, r, &row.key);
            }
            if let Some(v) = volume {
                row.cells[v] = self.config.injection_volume.clone();
            }
        }
    }
}

/// Build the worklist rows for a matched plate.
pub fn project_worklist(
    plate: &Plate,
    reference: &ReferenceTable,
    directives: &[WorklistDirective],
    config: &ProjectionConfig,
) -> Vec<WorklistRow> {
    let mut rows: Vec<WorklistRow> = output_keys(config, plate, reference)
        .into_iter()
        .map(|key| WorklistRow {
            key,
            cells: vec![String::new(); config.columns.len()],
        })
        .collect();

    let mut projector = Projector {
        config,
        lookup: PlateLookup::build(plate, reference),
        resolved: HashMap::new(),
    };
    for directive in directives {
        projector.apply(directive, &mut rows);
    }

    let set_name = config.set_name(&plate.plate_label);
    let derived = [
        (config.optional_index(&config.set_name_column), Some(set_name.clone())),
        (
            config.optional_index(&config.output_path_column),
            Some(config.output_path(&set_name)),
        ),
        (
            config.optional_index(&config.injection_plate_column),
            config.injection_plate.clone(),
        ),
    ];
    for (index, value) in derived {
        if let (Some(i), Some(value)) = (index, value) {
            for row in &mut rows {
                row.cells[i] = value.clone();
            }
        }
    }

    log::debug!("{}: {} worklist rows", plate.plate_label, rows.len());
    rows
}
