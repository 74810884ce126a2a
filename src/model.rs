use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;
use polars::prelude::DataFrame;

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::Settings;
use crate::error::WorklistError;
use crate::frames;
use crate::loader;
use crate::run::{process_scan_file, RunContext};
use crate::sample_index::{InMemorySampleIndex, SampleIndex};
use crate::template::Template;

type PlateFrames = (String, PyDataFrame, PyDataFrame, PyDataFrame);

#[pyclass]
pub struct WorklistModel {
    base_path: PathBuf,
    settings: Settings,
    index: Mutex<InMemorySampleIndex>,
}

#[pymethods]
impl WorklistModel {
    #[new]
    #[pyo3(signature = (base_path, settings_file=None))]
    fn new(base_path: String, settings_file: Option<&str>) -> PyResult<Self> {
        let base_path = PathBuf::from(base_path);
        let settings = Settings::from_path(base_path.join(settings_file.unwrap_or("settings.json")))?;
        Ok(Self {
            base_path,
            settings,
            index: Mutex::new(InMemorySampleIndex::new()),
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load a CSV or spreadsheet with all columns as strings.
    #[pyo3(signature = (filename, sheet=None))]
    fn load_table(&self, filename: &str, sheet: Option<&str>) -> PyResult<PyDataFrame> {
        let df = loader::read_table(self.base_path.join(filename), sheet)?;
        Ok(PyDataFrame(df))
    }

    // ── Processing ──────────────────────────────────────────────────────────

    /// Process one run.
    ///
    /// Returns one `(plate_label, worksheet, worklist, errors)` tuple per plate,
    /// ascending by plate number. Every plate's samples are stored in the
    /// model's sample index, replacing earlier results for the same day.
    #[pyo3(signature = (project, scan_file, station_file, date, instrument=None, injection_plate=None))]
    fn process(
        &self,
        project: &str,
        scan_file: &str,
        station_file: &str,
        date: NaiveDate,
        instrument: Option<&str>,
        injection_plate: Option<&str>,
    ) -> PyResult<Vec<PlateFrames>> {
        let mut ctx = RunContext::load(
            &self.settings,
            project,
            instrument,
            self.base_path.join(station_file),
            date,
        )?;
        if let Some(label) = injection_plate {
            ctx = ctx.with_injection_plate(label);
        }
        let result = process_scan_file(&ctx, self.base_path.join(scan_file), &self.index)?;

        let plates = result
            .plates
            .iter()
            .map(|p| -> Result<PlateFrames, WorklistError> {
                Ok((
                    p.plate_label.clone(),
                    PyDataFrame(p.worksheet_frame()?),
                    PyDataFrame(p.worklist_frame()?),
                    PyDataFrame(p.errors_frame()?),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plates)
    }

    /// Write a worklist frame next to the inputs, using the instrument
    /// template's delimiter.
    #[pyo3(signature = (worklist, filename, project, instrument=None))]
    fn write_worklist(
        &self,
        worklist: PyDataFrame,
        filename: &str,
        project: &str,
        instrument: Option<&str>,
    ) -> PyResult<()> {
        let config = self.settings.resolve(project, instrument)?;
        let template = Template::from_path(&config.instrument.template_path)?;
        let mut df: DataFrame = worklist.0;
        frames::write_worklist(self.base_path.join(filename), &mut df, template.delimiter)?;
        Ok(())
    }

    // ── Sample index ────────────────────────────────────────────────────────

    fn search_by_name(&self, name: &str) -> PyResult<PyDataFrame> {
        let hits = self.lock_index()?.search_by_name(name);
        Ok(PyDataFrame(frames::index_hits_frame(&hits)?))
    }

    fn search_by_barcode(&self, barcode: &str) -> PyResult<PyDataFrame> {
        let hits = self.lock_index()?.search_by_barcode(barcode);
        Ok(PyDataFrame(frames::index_hits_frame(&hits)?))
    }

    #[getter]
    fn indexed_samples(&self) -> PyResult<usize> {
        Ok(self.lock_index()?.len())
    }
}

impl WorklistModel {
    fn lock_index(&self) -> PyResult<std::sync::MutexGuard<'_, InMemorySampleIndex>> {
        self.index
            .lock()
            .map_err(|_| PyRuntimeError::new_err("sample index lock poisoned"))
    }
}
