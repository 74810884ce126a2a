//! Reading scan exports, station lists and the reference workbook.
//!
//! Every table is loaded with all columns as strings: CSV through polars,
//! spreadsheets (`.xlsx`, `.xlsm`, `.xls`, `.ods`) through calamine. Header
//! names and cell values are trimmed.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;

use crate::error::{Result, WorklistError};
use crate::records::{ScanRow, StationEntry};
use crate::reference::{MappingEntry, ReferenceTable};
use crate::schema::{mapping, scan, station};
use crate::worklist::WorklistDirective;

const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SPREADSHEET_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Read a table with every column as String. `sheet` selects a worksheet of a
/// spreadsheet (first sheet when `None`) and is ignored for CSV.
pub fn read_table(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(WorklistError::InputMissing(path.display().to_string()));
    }
    let df = if is_spreadsheet(path) {
        read_sheet(path, sheet)?
    } else {
        read_csv_as_strings(path)?
    };
    strip_cells(df)
}

fn read_csv_as_strings(path: &Path) -> Result<DataFrame> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.trim().eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| WorklistError::parse(wanted, "worksheet not found"))?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| {
                WorklistError::InputMissing(format!("{} has no sheets", path.display()))
            })?,
    };
    let range = workbook.worksheet_range(&name)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let headers: Vec<String> = header.iter().map(|c| cell_text(c).trim().to_string()).collect();
    let mut values: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (i, column) in values.iter_mut().enumerate() {
            column.push(row.get(i).map(cell_text).unwrap_or_default());
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(values.iter())
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, vals)| Column::new(name.as_str().into(), vals))
        .collect();
    Ok(DataFrame::new(columns)?)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn strip_cells(df: DataFrame) -> Result<DataFrame> {
    let exprs: Vec<Expr> = df
        .get_column_names_str()
        .iter()
        .map(|c| col(*c).str().strip_chars(lit(" \t\r\n")))
        .collect();
    if exprs.is_empty() {
        return Ok(df);
    }
    Ok(df.lazy().with_columns(exprs).collect()?)
}

fn required<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    df.column(name)
        .map_err(|_| WorklistError::parse(name, "required column missing"))?
        .str()
        .map_err(|e| WorklistError::parse(name, e.to_string()))
}

fn optional<'a>(df: &'a DataFrame, name: &str) -> Option<&'a StringChunked> {
    df.column(name).ok().and_then(|c| c.str().ok())
}

fn text(column: &StringChunked, i: usize) -> String {
    column.get(i).unwrap_or("").to_string()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

pub fn scan_rows(df: &DataFrame) -> Result<Vec<ScanRow>> {
    let position = required(df, scan::POSITION)?;
    let status = required(df, scan::STATUS)?;
    let barcode = required(df, scan::BARCODE)?;
    let labware = optional(df, scan::LABWARE_ID);
    let warm = optional(df, scan::WARM);

    let rows: Vec<ScanRow> = (0..df.height())
        .filter(|&i| !text(position, i).is_empty())
        .map(|i| ScanRow {
            position_label: text(position, i),
            status_text: text(status, i),
            origin_barcode: text(barcode, i),
            labware_id: labware.and_then(|c| non_empty(text(c, i))),
            warm_marker: warm.and_then(|c| non_empty(text(c, i))),
        })
        .collect();
    Ok(rows)
}

pub fn station_entries(df: &DataFrame) -> Result<Vec<StationEntry>> {
    let barcode = required(df, station::MAIN_BARCODE)?;
    let name = required(df, station::SAMPLE_NAME)?;
    Ok((0..df.height())
        .map(|i| StationEntry {
            main_barcode: text(barcode, i),
            sample_name: text(name, i),
        })
        .collect())
}

pub fn mapping_entries(df: &DataFrame) -> Result<Vec<MappingEntry>> {
    let barcode = required(df, mapping::BARCODE)?;
    let name = required(df, mapping::NAME)?;
    let code = required(df, mapping::CODE)?;
    Ok((0..df.height())
        .filter(|&i| !text(barcode, i).is_empty() || !text(name, i).is_empty())
        .map(|i| MappingEntry {
            barcode: text(barcode, i),
            name: text(name, i),
            code: text(code, i),
        })
        .collect())
}

pub fn worklist_directives(df: &DataFrame) -> Result<Vec<WorklistDirective>> {
    let key = required(df, mapping::SAMPLE_KEY)?;
    let columns: Vec<(String, &StringChunked)> = df
        .get_column_names_str()
        .into_iter()
        .filter(|c| *c != mapping::SAMPLE_KEY)
        .map(|c| required(df, c).map(|s| (c.to_string(), s)))
        .collect::<Result<_>>()?;

    Ok((0..df.height())
        .filter(|&i| !text(key, i).is_empty())
        .map(|i| {
            let cells = columns
                .iter()
                .map(|(name, values)| (name.clone(), text(values, i)))
                .collect();
            WorklistDirective::new(&text(key, i), cells)
        })
        .collect())
}

/// Load the scan export. An export without readings is an input error.
pub fn load_scan(path: impl AsRef<Path>) -> Result<Vec<ScanRow>> {
    let path = path.as_ref();
    let rows = scan_rows(&read_table(path, None)?)?;
    if rows.is_empty() {
        return Err(WorklistError::InputMissing(format!(
            "scan result {} has no rows",
            path.display()
        )));
    }
    Ok(rows)
}

pub fn load_station(path: impl AsRef<Path>) -> Result<Vec<StationEntry>> {
    station_entries(&read_table(path, None)?)
}

/// Load the "worksheet mapping" and "worklist mapping" tables. Both paths may
/// name the same workbook.
pub fn load_reference(
    worksheet_mapping: impl AsRef<Path>,
    worklist_mapping: impl AsRef<Path>,
) -> Result<(ReferenceTable, Vec<WorklistDirective>)> {
    let entries = mapping_entries(&read_table(worksheet_mapping, Some(mapping::WORKSHEET_SHEET))?)?;
    let directives =
        worklist_directives(&read_table(worklist_mapping, Some(mapping::WORKLIST_SHEET))?)?;
    Ok((ReferenceTable::new(entries), directives))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worklist::Selector;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn scan_rows_with_optional_columns() {
        let file = csv_file(
            " Position ,Status,Barcode,LabwareID,Warm\n\
             A1,OK, AB1 ,RACK_0001,\n\
             ,,,,\n\
             A2,Pipetting error,AB2-2,RACK_0001,4\n",
        );
        let rows = load_scan(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].origin_barcode, "AB1");
        assert_eq!(rows[0].labware_id.as_deref(), Some("RACK_0001"));
        assert_eq!(rows[0].warm_marker, None);
        assert_eq!(rows[1].warm(), "4");
    }

    #[test]
    fn missing_required_column_names_it() {
        let file = csv_file("Position,Status\nA1,OK\n");
        let err = load_scan(file.path()).unwrap_err();
        match err {
            WorklistError::ParseFailure { column, .. } => assert_eq!(column, "Barcode"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn empty_scan_is_missing_input() {
        let file = csv_file("Position,Status,Barcode\n");
        assert!(matches!(
            load_scan(file.path()).unwrap_err(),
            WorklistError::InputMissing(_)
        ));
    }

    #[test]
    fn missing_file_is_missing_input() {
        assert!(matches!(
            load_station("/nonexistent/stations.csv").unwrap_err(),
            WorklistError::InputMissing(_)
        ));
    }

    #[test]
    fn station_and_reference_tables() {
        let stations = csv_file("Main Barcode,Sample Name\nAB1,S001\nAB1,S002\n");
        let entries = load_station(stations.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].sample_name, "S002");

        let worksheet = csv_file("Barcode,Name,Code\nC0,STD0,STD0\nQ1,QC1,QC1\n");
        let worklist = csv_file(
            "Sample Key,Sample Name,Vial\nDB,Blank,\n*,{{Sample_Name}},{{Well_Number}}\n,,\n",
        );
        let (reference, directives) = load_reference(worksheet.path(), worklist.path()).unwrap();
        assert_eq!(reference.name_for("Q1"), Some("QC1"));
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].selector, Selector::PrefixClass("DB".into()));
        assert_eq!(directives[0].cells, vec![("Sample Name".into(), "Blank".into())]);
        assert_eq!(directives[1].selector, Selector::Wildcard);
        assert_eq!(directives[1].cells.len(), 2);
    }
}
