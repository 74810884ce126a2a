//! Project, instrument and injection-volume configuration.
//!
//! A [`Settings`] document is plain JSON. Paths inside it are resolved
//! relative to the document's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorklistError};
use crate::grid::{FillOrder, WELLS_PER_PLATE};
use crate::segment::Segmentation;

fn default_true() -> bool {
    true
}

fn default_rows_per_plate() -> usize {
    WELLS_PER_PLATE
}

/// How a platform's scan export maps onto plates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub segmentation: Segmentation,
    pub fill_order: FillOrder,
    /// The instrument reports locator wells through the diagnostic marker.
    pub locator_markers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub curve_points: u32,
    #[serde(default)]
    pub qc_names: Vec<String>,
    /// Repeat the QC bracket after the clinical samples.
    #[serde(default = "default_true")]
    pub qc_insert: bool,
    #[serde(default)]
    pub test_count: u32,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub default_instrument: Option<String>,
    #[serde(default = "default_rows_per_plate")]
    pub rows_per_plate: usize,
    /// Table with the "worksheet mapping" (Barcode, Name, Code).
    pub worksheet_mapping: PathBuf,
    /// Table with the "worklist mapping" directives; often the same workbook.
    pub worklist_mapping: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub name: String,
    #[serde(default)]
    pub vendor: String,
    pub template_path: PathBuf,
    #[serde(default)]
    pub volume_column: Option<String>,
    #[serde(default)]
    pub set_name_column: Option<String>,
    #[serde(default)]
    pub output_path_column: Option<String>,
    #[serde(default)]
    pub injection_plate_column: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionVolume {
    pub project: String,
    pub instrument: String,
    pub volume: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub projects: Vec<ProjectConfig>,
    pub instruments: Vec<InstrumentRecord>,
    pub injection_volumes: Vec<InjectionVolume>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Configuration for one project-instrument pair.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub project: ProjectConfig,
    pub instrument: InstrumentRecord,
    pub injection_volume: String,
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WorklistError::ConfigurationMissing(format!(
                "settings file {} not found",
                path.display()
            )));
        }
        let mut settings = Self::from_json(&std::fs::read_to_string(path)?)?;
        settings.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(settings)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Pick the project, its instrument (explicit or the project default) and
    /// the injection volume configured for the pair.
    pub fn resolve(&self, project: &str, instrument: Option<&str>) -> Result<ResolvedConfig> {
        let project_cfg = self.project(project).ok_or_else(|| {
            WorklistError::ConfigurationMissing(format!("project {project} is not configured"))
        })?;
        let instrument_name = instrument
            .map(str::to_string)
            .or_else(|| project_cfg.default_instrument.clone())
            .ok_or_else(|| {
                WorklistError::ConfigurationMissing(format!(
                    "project {project} has no instrument, set a default instrument first"
                ))
            })?;
        let instrument_cfg = self
            .instruments
            .iter()
            .find(|i| i.name == instrument_name)
            .ok_or_else(|| {
                WorklistError::ConfigurationMissing(format!(
                    "no worklist template for instrument {instrument_name}, configure it first"
                ))
            })?;
        let volume = self
            .injection_volumes
            .iter()
            .find(|v| v.project == project && v.instrument == instrument_name)
            .ok_or_else(|| {
                WorklistError::ConfigurationMissing(format!(
                    "no injection volume for {project} on {instrument_name}, configure it first"
                ))
            })?;

        let mut project_cfg = project_cfg.clone();
        project_cfg.worksheet_mapping = self.absolute(&project_cfg.worksheet_mapping);
        project_cfg.worklist_mapping = self.absolute(&project_cfg.worklist_mapping);
        let mut instrument_cfg = instrument_cfg.clone();
        instrument_cfg.template_path = self.absolute(&instrument_cfg.template_path);

        Ok(ResolvedConfig {
            project: project_cfg,
            instrument: instrument_cfg,
            injection_volume: volume.volume.clone(),
        })
    }
}
