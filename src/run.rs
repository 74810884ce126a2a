//! Processing one run: scan rows in, one payload per physical plate out.
//!
//! Plates are independent and run in parallel. They share only the read-only
//! [`RunContext`]; writes to the sample index go through a mutex so each
//! plate's replace happens as one step.

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::align::{align_plate, Plate};
use crate::classify::{classify_errors, ErrorRow};
use crate::config::{ResolvedConfig, Settings};
use crate::error::{Result, WorklistError};
use crate::frames;
use crate::loader;
use crate::matcher::{match_plate, StationLookup};
use crate::records::{ScanRow, StationEntry};
use crate::reference::ReferenceTable;
use crate::sample_index::{plate_entries, PlateKey, SampleIndex};
use crate::segment::{segment_plates, PlateRows};
use crate::template::Template;
use crate::worklist::{project_worklist, ProjectionConfig, WorklistDirective, WorklistRow};

/// Everything a run reads. Built once, then shared by every plate.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub config: ResolvedConfig,
    pub reference: ReferenceTable,
    pub directives: Vec<WorklistDirective>,
    pub template: Template,
    pub stations: StationLookup,
    pub date: NaiveDate,
    pub injection_plate: Option<String>,
}

impl RunContext {
    pub fn new(
        config: ResolvedConfig,
        reference: ReferenceTable,
        directives: Vec<WorklistDirective>,
        template: Template,
        stations: &[StationEntry],
        date: NaiveDate,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            reference,
            directives,
            template,
            stations: StationLookup::new(stations),
            date,
            injection_plate: None,
        }
    }

    pub fn with_injection_plate(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.injection_plate = (!label.trim().is_empty()).then_some(label);
        self
    }

    /// Resolve the project-instrument pair and load its reference tables,
    /// its template and the run's station list.
    pub fn load(
        settings: &Settings,
        project: &str,
        instrument: Option<&str>,
        station_file: impl AsRef<Path>,
        date: NaiveDate,
    ) -> Result<Self> {
        let config = settings.resolve(project, instrument)?;
        let (reference, directives) = loader::load_reference(
            &config.project.worksheet_mapping,
            &config.project.worklist_mapping,
        )?;
        let template = Template::from_path(&config.instrument.template_path)?;
        let stations = loader::load_station(station_file)?;
        log::debug!(
            "{project} on {}: {} reference barcodes, {} directives, {} template columns",
            config.instrument.name,
            reference.entries().len(),
            directives.len(),
            template.columns.len()
        );
        Ok(Self::new(config, reference, directives, template, &stations, date))
    }

    pub fn projection(&self) -> ProjectionConfig {
        let project = &self.config.project;
        let instrument = &self.config.instrument;
        ProjectionConfig {
            columns: self.template.columns.clone(),
            test_count: project.test_count,
            curve_points: project.curve_points,
            qc_names: project.qc_names.clone(),
            qc_insert: project.qc_insert,
            volume_column: instrument.volume_column.clone(),
            injection_volume: self.config.injection_volume.clone(),
            injection_plate_column: instrument.injection_plate_column.clone(),
            injection_plate: self.injection_plate.clone(),
            set_name_column: instrument.set_name_column.clone(),
            output_path_column: instrument.output_path_column.clone(),
            instrument: instrument.name.clone(),
            project: project.name.clone(),
            date: self.date,
        }
    }
}

/// One plate's worksheet, error rows and worklist.
#[derive(Debug, Clone, Serialize)]
pub struct PlatePayload {
    pub plate_number: u32,
    pub plate_label: String,
    pub plate: Plate,
    pub errors: Vec<ErrorRow>,
    /// Template header, in output order.
    pub columns: Vec<String>,
    pub worklist: Vec<WorklistRow>,
}

impl PlatePayload {
    pub fn worksheet_frame(&self) -> Result<DataFrame> {
        frames::worksheet_frame(&self.plate)
    }

    pub fn worklist_frame(&self) -> Result<DataFrame> {
        frames::worklist_frame(&self.columns, &self.worklist)
    }

    pub fn errors_frame(&self) -> Result<DataFrame> {
        frames::errors_frame(&self.errors)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    /// Ascending by plate number.
    pub plates: Vec<PlatePayload>,
}

impl RunResult {
    pub fn plate(&self, plate_label: &str) -> Option<&PlatePayload> {
        self.plates.iter().find(|p| p.plate_label == plate_label)
    }
}

/// Align, match, classify and project one plate.
pub fn process_plate(
    ctx: &RunContext,
    projection: &ProjectionConfig,
    rows: &[ScanRow],
    group: &PlateRows,
) -> PlatePayload {
    let layout = &ctx.config.project.layout;
    let mut plate = align_plate(
        rows,
        &group.row_indices,
        layout.fill_order,
        group.plate_number,
        layout.locator_markers,
    );
    match_plate(&mut plate, &ctx.stations, &ctx.reference);
    let errors = classify_errors(&plate);
    let worklist = project_worklist(&plate, &ctx.reference, &ctx.directives, projection);
    log::debug!(
        "{}: {} scan rows, {} errors, {} worklist rows",
        plate.plate_label,
        group.row_indices.len(),
        errors.len(),
        worklist.len()
    );

    PlatePayload {
        plate_number: plate.plate_number,
        plate_label: plate.plate_label.clone(),
        plate,
        errors,
        columns: projection.columns.clone(),
        worklist,
    }
}

/// Process every plate of the run and store its samples in `index`.
///
/// The first failure aborts the run. Plates already stored by then stay
/// stored; resubmitting the run replaces them.
pub fn process_run<I>(ctx: &RunContext, rows: &[ScanRow], index: &Mutex<I>) -> Result<RunResult>
where
    I: SampleIndex + Send,
{
    if rows.is_empty() {
        return Err(WorklistError::InputMissing("scan result has no rows".into()));
    }
    let project = &ctx.config.project;
    let groups = segment_plates(rows, project.layout.segmentation, project.rows_per_plate);
    log::debug!("run {}: {} rows in {} plates", ctx.run_id, rows.len(), groups.len());

    let projection = ctx.projection();
    let plates = groups
        .par_iter()
        .map(|group| -> Result<PlatePayload> {
            let payload = process_plate(ctx, &projection, rows, group);
            let key = PlateKey::new(&project.name, ctx.date, &payload.plate_label);
            index
                .lock()
                .map_err(|_| WorklistError::SampleIndex("sample index lock poisoned".into()))?
                .replace_plate(key, plate_entries(&payload.plate))?;
            Ok(payload)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RunResult {
        run_id: ctx.run_id,
        plates,
    })
}

/// [`process_run`] on a scan export file.
pub fn process_scan_file<I>(
    ctx: &RunContext,
    scan_file: impl AsRef<Path>,
    index: &Mutex<I>,
) -> Result<RunResult>
where
    I: SampleIndex + Send,
{
    let rows = loader::load_scan(scan_file)?;
    process_run(ctx, &rows, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InstrumentRecord, Layout, ProjectConfig};
    use crate::grid::FillOrder;
    use crate::reference::MappingEntry;
    use crate::sample_index::InMemorySampleIndex;
    use crate::segment::Segmentation;

    fn context(layout: Layout) -> RunContext {
        let config = ResolvedConfig {
            project: ProjectConfig {
                name: "VitD".into(),
                curve_points: 1,
                qc_names: vec!["QC1".into()],
                qc_insert: false,
                test_count: 1,
                layout,
                default_instrument: None,
                rows_per_plate: 96,
                worksheet_mapping: "unused".into(),
                worklist_mapping: "unused".into(),
            },
            instrument: InstrumentRecord {
                name: "LC01".into(),
                vendor: "acme".into(),
                template_path: "unused".into(),
                volume_column: None,
                set_name_column: None,
                output_path_column: None,
                injection_plate_column: Some("Plate".into()),
            },
            injection_volume: "5".into(),
        };
        let template = Template::from_bytes(b"Sample Name\tPlate").unwrap();
        let directives = vec![WorklistDirective::new(
            "*",
            vec![("Sample Name".into(), "{{Sample_Name}}".into())],
        )];
        RunContext::new(
            config,
            ReferenceTable::new(vec![MappingEntry::new("Q1", "QC1", "QC1")]),
            directives,
            template,
            &[StationEntry::new("AB1", "S001"), StationEntry::new("AB2", "S002")],
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        )
        .with_injection_plate("P7")
    }

    fn multi_plate_rows() -> Vec<ScanRow> {
        vec![
            ScanRow::new("A1", "OK", "AB2").with_labware("RACK_0002"),
            ScanRow::new("A1", "OK", "AB1").with_labware("RACK_0001"),
            ScanRow::new("A2", "OK", "Q1").with_labware("RACK_0001"),
            ScanRow::new("A3", "OK", "ZZ9").with_labware("RACK_0001"),
        ]
    }

    #[test]
    fn plates_come_back_in_order_and_are_indexed() {
        let ctx = context(Layout {
            segmentation: Segmentation::MultiPlate,
            fill_order: FillOrder::RowMajor,
            locator_markers: false,
        });
        let index = Mutex::new(InMemorySampleIndex::new());
        let result = process_run(&ctx, &multi_plate_rows(), &index).unwrap();

        assert_eq!(result.run_id, ctx.run_id);
        let labels: Vec<&str> = result.plates.iter().map(|p| p.plate_label.as_str()).collect();
        assert_eq!(labels, vec!["X1", "X2"]);

        let first = result.plate("X1").unwrap();
        assert_eq!(first.errors.len(), 1);
        assert_eq!(first.errors[0].origin_barcode, "ZZ9");
        let keys: Vec<&str> = first.worklist.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["DB1", "Test0", "DB2", "STD0", "STD1", "DB3", "QC1", "DB4", "S001", "ZZ9", "X1", "DB5"]
        );
        assert!(first.worklist.iter().all(|r| r.cells[1] == "P7"));

        // X1: AB1, Q1, ZZ9 and the locator well; X2: AB2 and its locator well.
        let index = index.into_inner().unwrap();
        assert_eq!(index.len(), 6);
        let hits = index.search_by_name("S002");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key.plate_label, "X2");
    }

    #[test]
    fn rerun_replaces_index_entries() {
        let ctx = context(Layout::default());
        let rows = vec![
            ScanRow::new("A1", "OK", "AB1"),
            ScanRow::new("A2", "OK", "AB2"),
        ];
        let index = Mutex::new(InMemorySampleIndex::new());
        process_run(&ctx, &rows, &index).unwrap();
        let first = index.lock().unwrap().len();
        process_run(&ctx, &rows, &index).unwrap();
        assert_eq!(index.lock().unwrap().len(), first);
    }

    #[test]
    fn empty_scan_aborts_the_run() {
        let ctx = context(Layout::default());
        let index = Mutex::new(InMemorySampleIndex::new());
        let err = process_run(&ctx, &[], &index).unwrap_err();
        assert!(matches!(err, WorklistError::InputMissing(_)));
        assert!(index.lock().unwrap().is_empty());
    }

    #[test]
    fn payload_serializes() {
        let ctx = context(Layout::default());
        let index = Mutex::new(InMemorySampleIndex::new());
        let result = process_run(&ctx, &[ScanRow::new("A1", "OK", "AB1")], &index).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["plates"][0]["plate_label"], "X1");
        assert_eq!(json["plates"][0]["plate"]["wells"].as_array().unwrap().len(), 96);
        assert_eq!(json["plates"][0]["columns"][0], "Sample Name");
    }
}
