//! Polars views of a plate payload, and worklist export.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::align::Plate;
use crate::classify::ErrorRow;
use crate::error::Result;
use crate::grid::{COLUMNS, LETTERS};
use crate::sample_index::IndexHit;
use crate::schema::{errors, index, worksheet};
use crate::worklist::WorklistRow;

/// 8x12 worksheet: a `row` column with the letter, then columns `1`..`12`
/// holding each well's display name.
pub fn worksheet_frame(plate: &Plate) -> Result<DataFrame> {
    let mut columns = vec![Column::new(
        worksheet::ROW.into(),
        LETTERS.iter().map(|l| l.to_string()).collect::<Vec<_>>(),
    )];
    for number in 0..COLUMNS {
        let names: Vec<String> = plate
            .grid()
            .map(|row| row[number].display_name.clone())
            .collect();
        columns.push(Column::new((number + 1).to_string().into(), names));
    }
    Ok(DataFrame::new(columns)?)
}

/// Worklist rows under the template's header, all columns as strings.
pub fn worklist_frame(template_columns: &[String], rows: &[WorklistRow]) -> Result<DataFrame> {
    let columns: Vec<Column> = template_columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<&str> = rows
                .iter()
                .map(|r| r.cells.get(i).map(String::as_str).unwrap_or(""))
                .collect();
            Column::new(name.as_str().into(), values)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

pub fn errors_frame(rows: &[ErrorRow]) -> Result<DataFrame> {
    let fields: [fn(&ErrorRow) -> &str; 6] = [
        |r| r.sample_name.as_str(),
        |r| r.origin_barcode.as_str(),
        |r| r.plate_label.as_str(),
        |r| r.well_label.as_str(),
        |r| r.warn_level.as_str(),
        |r| r.warn_info.as_str(),
    ];
    let columns: Vec<Column> = errors::ALL
        .iter()
        .zip(fields)
        .map(|(name, field)| {
            let values: Vec<&str> = rows.iter().map(field).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Sample index search results, one row per hit.
pub fn index_hits_frame(hits: &[IndexHit]) -> Result<DataFrame> {
    let fields: [fn(&IndexHit) -> String; 6] = [
        |h| h.key.project.clone(),
        |h| h.key.date.format("%Y-%m-%d").to_string(),
        |h| h.key.plate_label.clone(),
        |h| h.entry.well_label.clone(),
        |h| h.entry.sample_name.clone(),
        |h| h.entry.barcode.clone(),
    ];
    let columns: Vec<Column> = index::ALL
        .iter()
        .zip(fields)
        .map(|(name, field)| {
            let values: Vec<String> = hits.iter().map(field).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Write a worklist frame as delimited text with the template's delimiter.
pub fn write_worklist(path: impl AsRef<Path>, df: &mut DataFrame, delimiter: u8) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(delimiter)
        .finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_plate;
    use crate::grid::FillOrder;
    use crate::records::ScanRow;

    #[test]
    fn worksheet_is_eight_by_thirteen() {
        let rows = vec![ScanRow::new("A1", "OK", "AB1"), ScanRow::new("H12", "OK", "AB2")];
        let mut plate = align_plate(&rows, &[0, 1], FillOrder::RowMajor, 1, false);
        plate.wells[0].display_name = "S001".into();
        plate.wells[95].display_name = "S002".into();

        let df = worksheet_frame(&plate).unwrap();
        assert_eq!(df.shape(), (8, 13));
        let first = df.column("1").unwrap().str().unwrap();
        assert_eq!(first.get(0), Some("S001"));
        let last = df.column("12").unwrap().str().unwrap();
        assert_eq!(last.get(7), Some("S002"));
        let letters = df.column(worksheet::ROW).unwrap().str().unwrap();
        assert_eq!(letters.get(2), Some("C"));
    }

    #[test]
    fn worklist_frame_follows_template_and_writes() {
        let columns = vec!["Sample Name".to_string(), "Vial".to_string()];
        let rows = vec![
            WorklistRow {
                key: "DB1".into(),
                cells: vec!["Blank".into(), "R1".into()],
            },
            WorklistRow {
                key: "S001".into(),
                cells: vec!["S001".into(), "5".into()],
            },
        ];
        let mut df = worklist_frame(&columns, &rows).unwrap();
        assert_eq!(df.get_column_names_str(), vec!["Sample Name", "Vial"]);
        assert_eq!(df.height(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worklist.txt");
        write_worklist(&path, &mut df, b'\t').unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Sample Name\tVial\n"));
        assert!(text.contains("S001\t5"));
    }

    #[test]
    fn errors_frame_has_fixed_columns() {
        let rows = vec![ErrorRow {
            sample_name: "No match".into(),
            origin_barcode: "ZZ1".into(),
            plate_label: "X1".into(),
            well_label: "A1".into(),
            warn_level: String::new(),
            warn_info: "barcode not in station list".into(),
        }];
        let df = errors_frame(&rows).unwrap();
        assert_eq!(df.get_column_names_str(), errors::ALL.to_vec());
        assert_eq!(df.column(errors::ORIGIN_BARCODE).unwrap().str().unwrap().get(0), Some("ZZ1"));
        assert_eq!(errors_frame(&[]).unwrap().height(), 0);
    }

    #[test]
    fn index_hits_frame_formats_dates() {
        use crate::sample_index::{IndexEntry, PlateKey};
        let hits = vec![IndexHit {
            key: PlateKey::new("VitD", chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(), "X1"),
            entry: IndexEntry {
                well_label: "A1".into(),
                sample_name: "S001".into(),
                barcode: "AB1".into(),
            },
        }];
        let df = index_hits_frame(&hits).unwrap();
        assert_eq!(df.get_column_names_str(), index::ALL.to_vec());
        assert_eq!(df.column(index::DATE).unwrap().str().unwrap().get(0), Some("2024-06-03"));
    }
}
