use serde::{Deserialize, Serialize};

use crate::grid::locator_plate_number;

/// One instrument-reported tube reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRow {
    pub position_label: String,
    pub status_text: String,
    pub origin_barcode: String,
    pub labware_id: Option<String>,
    pub warm_marker: Option<String>,
}

impl ScanRow {
    pub fn new(position_label: &str, status_text: &str, origin_barcode: &str) -> Self {
        Self {
            position_label: position_label.to_string(),
            status_text: status_text.to_string(),
            origin_barcode: origin_barcode.to_string(),
            labware_id: None,
            warm_marker: None,
        }
    }

    pub fn with_labware(mut self, labware_id: &str) -> Self {
        self.labware_id = Some(labware_id.to_string());
        self
    }

    pub fn with_warm(mut self, warm_marker: &str) -> Self {
        self.warm_marker = Some(warm_marker.to_string());
        self
    }

    pub fn warm(&self) -> &str {
        self.warm_marker.as_deref().unwrap_or("")
    }

    /// Plate number when the diagnostic marker encodes a locator (`X<n>`).
    pub fn locator_marker(&self) -> Option<u32> {
        self.warm_marker.as_deref().and_then(locator_plate_number)
    }
}

/// One operator record of the station list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationEntry {
    pub main_barcode: String,
    pub sample_name: String,
}

impl StationEntry {
    pub fn new(main_barcode: &str, sample_name: &str) -> Self {
        Self {
            main_barcode: main_barcode.to_string(),
            sample_name: sample_name.to_string(),
        }
    }
}
