/// Column-name constants for plate-worklist inputs and outputs.
/// Single source of truth - exported to Python via PyO3.

// ── Scan export columns ─────────────────────────────────────────────────────
pub mod scan {
    pub const POSITION: &str = "Position";
    pub const STATUS: &str = "Status";
    pub const BARCODE: &str = "Barcode";
    pub const LABWARE_ID: &str = "LabwareID";
    pub const WARM: &str = "Warm";
}

// ── Station list columns ────────────────────────────────────────────────────
pub mod station {
    pub const MAIN_BARCODE: &str = "Main Barcode";
    pub const SAMPLE_NAME: &str = "Sample Name";
}

// ── Reference workbook ──────────────────────────────────────────────────────
pub mod mapping {
    pub const WORKSHEET_SHEET: &str = "worksheet mapping";
    pub const WORKLIST_SHEET: &str = "worklist mapping";

    pub const BARCODE: &str = "Barcode";
    pub const NAME: &str = "Name";
    pub const CODE: &str = "Code";

    pub const SAMPLE_KEY: &str = "Sample Key";
}

// ── Worksheet grid output ───────────────────────────────────────────────────
pub mod worksheet {
    pub const ROW: &str = "row";
}

// ── Error rows ──────────────────────────────────────────────────────────────
pub mod errors {
    pub const SAMPLE_NAME: &str = "sample_name";
    pub const ORIGIN_BARCODE: &str = "origin_barcode";
    pub const PLATE_LABEL: &str = "plate_label";
    pub const WELL_LABEL: &str = "well_label";
    pub const WARN_LEVEL: &str = "warn_level";
    pub const WARN_INFO: &str = "warn_info";

    pub const ALL: [&str; 6] = [
        SAMPLE_NAME,
        ORIGIN_BARCODE,
        PLATE_LABEL,
        WELL_LABEL,
        WARN_LEVEL,
        WARN_INFO,
    ];
}

// ── Sample index search results ─────────────────────────────────────────────
pub mod index {
    pub const PROJECT: &str = "project";
    pub const DATE: &str = "date";
    pub const PLATE_LABEL: &str = "plate_label";
    pub const WELL_LABEL: &str = "well_label";
    pub const SAMPLE_NAME: &str = "sample_name";
    pub const BARCODE: &str = "barcode";

    pub const ALL: [&str; 6] = [PROJECT, DATE, PLATE_LABEL, WELL_LABEL, SAMPLE_NAME, BARCODE];
}

// ── Well placeholders ───────────────────────────────────────────────────────
pub mod placeholder {
    pub const WELL_NUMBER: &str = "{{Well_Number}}";
    pub const WELL_POSITION: &str = "{{Well_Position}}";
    pub const SAMPLE_NAME: &str = "{{Sample_Name}}";
}

// ── Sentinel values ─────────────────────────────────────────────────────────
pub mod sentinel {
    pub const NOT_USED: &str = "Not used";
    pub const NO_TUBE: &str = "NOTUBE";
    pub const NO_MATCH: &str = "No match";
    pub const PIPETTING_ERROR: &str = "PIPETTING_ERROR";
}
