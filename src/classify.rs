//! Flagging wells that need operator attention.

use serde::Serialize;

use crate::align::{Plate, Well};
use crate::schema::sentinel;

/// Instrument warm codes that indicate a failed or suspect aspiration.
const FLAGGED_WARM_CODES: [&str; 3] = ["1", "4", "16384"];

const PIPETTING_ERROR_TEXT: &str = "pipetting error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRow {
    pub sample_name: String,
    pub origin_barcode: String,
    pub plate_label: String,
    pub well_label: String,
    pub warn_level: String,
    pub warn_info: String,
}

fn flagged_warm(code: &str) -> Option<&str> {
    let code = code.trim();
    FLAGGED_WARM_CODES.iter().any(|c| *c == code).then_some(code)
}

fn classify_well(well: &Well, plate_label: &str) -> Option<ErrorRow> {
    let warm = flagged_warm(&well.warm);
    let pipetting = well
        .status
        .to_lowercase()
        .contains(PIPETTING_ERROR_TEXT);
    let no_match = well.matched_sample_name == sentinel::NO_MATCH;

    let (warn_level, warn_info) = match (warm, pipetting, no_match) {
        (Some(code), _, _) => (code.to_string(), format!("instrument warm code {code}")),
        (None, true, _) => (sentinel::PIPETTING_ERROR.to_string(), well.status.clone()),
        (None, false, true) => (String::new(), "barcode not in station list".to_string()),
        (None, false, false) => return None,
    };

    Some(ErrorRow {
        sample_name: well.matched_sample_name.clone(),
        origin_barcode: well.origin_barcode.clone(),
        plate_label: plate_label.to_string(),
        well_label: well.label(),
        warn_level,
        warn_info,
    })
}

/// Error rows for a matched plate, in row-major well order.
pub fn classify_errors(plate: &Plate) -> Vec<ErrorRow> {
    plate
        .wells
        .iter()
        .filter_map(|well| classify_well(well, &plate.plate_label))
        .collect()
}
