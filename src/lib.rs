//! Plate worksheets and instrument worklists from liquid-handler scan exports.
//!
//! A run takes the instrument's scan export and the operator's station list,
//! splits the export into physical plates, aligns each plate onto the 96-well
//! grid, matches barcodes to sample names, flags wells that need attention
//! and projects the plate onto the instrument's worklist template.

pub mod align;
pub mod classify;
pub mod config;
pub mod error;
pub mod frames;
pub mod grid;
pub mod loader;
pub mod matcher;
pub mod records;
pub mod reference;
pub mod run;
pub mod sample_index;
pub mod schema;
pub mod segment;
pub mod template;
pub mod worklist;

#[cfg(feature = "python")]
mod model;

pub use error::{Result, WorklistError};
pub use run::{process_run, process_scan_file, PlatePayload, RunContext, RunResult};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Scan export
    let scan = PyModule::new(m.py(), "scan")?;
    scan.add("POSITION", schema::scan::POSITION)?;
    scan.add("STATUS", schema::scan::STATUS)?;
    scan.add("BARCODE", schema::scan::BARCODE)?;
    scan.add("LABWARE_ID", schema::scan::LABWARE_ID)?;
    scan.add("WARM", schema::scan::WARM)?;
    m.add_submodule(&scan)?;

    // Station list
    let station = PyModule::new(m.py(), "station")?;
    station.add("MAIN_BARCODE", schema::station::MAIN_BARCODE)?;
    station.add("SAMPLE_NAME", schema::station::SAMPLE_NAME)?;
    m.add_submodule(&station)?;

    // Reference workbook
    let mapping = PyModule::new(m.py(), "mapping")?;
    mapping.add("WORKSHEET_SHEET", schema::mapping::WORKSHEET_SHEET)?;
    mapping.add("WORKLIST_SHEET", schema::mapping::WORKLIST_SHEET)?;
    mapping.add("BARCODE", schema::mapping::BARCODE)?;
    mapping.add("NAME", schema::mapping::NAME)?;
    mapping.add("CODE", schema::mapping::CODE)?;
    mapping.add("SAMPLE_KEY", schema::mapping::SAMPLE_KEY)?;
    m.add_submodule(&mapping)?;

    // Worksheet
    let worksheet = PyModule::new(m.py(), "worksheet")?;
    worksheet.add("ROW", schema::worksheet::ROW)?;
    m.add_submodule(&worksheet)?;

    // Errors
    let errors = PyModule::new(m.py(), "errors")?;
    errors.add("SAMPLE_NAME", schema::errors::SAMPLE_NAME)?;
    errors.add("ORIGIN_BARCODE", schema::errors::ORIGIN_BARCODE)?;
    errors.add("PLATE_LABEL", schema::errors::PLATE_LABEL)?;
    errors.add("WELL_LABEL", schema::errors::WELL_LABEL)?;
    errors.add("WARN_LEVEL", schema::errors::WARN_LEVEL)?;
    errors.add("WARN_INFO", schema::errors::WARN_INFO)?;
    m.add_submodule(&errors)?;

    // Sample index
    let index = PyModule::new(m.py(), "index")?;
    index.add("PROJECT", schema::index::PROJECT)?;
    index.add("DATE", schema::index::DATE)?;
    index.add("PLATE_LABEL", schema::index::PLATE_LABEL)?;
    index.add("WELL_LABEL", schema::index::WELL_LABEL)?;
    index.add("SAMPLE_NAME", schema::index::SAMPLE_NAME)?;
    index.add("BARCODE", schema::index::BARCODE)?;
    m.add_submodule(&index)?;

    // Placeholders
    let placeholder = PyModule::new(m.py(), "placeholder")?;
    placeholder.add("WELL_NUMBER", schema::placeholder::WELL_NUMBER)?;
    placeholder.add("WELL_POSITION", schema::placeholder::WELL_POSITION)?;
    placeholder.add("SAMPLE_NAME", schema::placeholder::SAMPLE_NAME)?;
    m.add_submodule(&placeholder)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<model::WorklistModel>()?;
    add_schema_exports(m)?;
    Ok(())
}
