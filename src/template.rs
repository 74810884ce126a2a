//! Instrument worklist templates: a delimited text file whose header row
//! defines the output columns.

use std::path::Path;

use encoding_rs::{Encoding, GBK, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::{Result, WorklistError};

/// Encodings tried, in order, when the file carries no BOM.
const FALLBACK_ENCODINGS: [&Encoding; 2] = [UTF_8, GBK];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub columns: Vec<String>,
    pub delimiter: u8,
    /// Name of the encoding the file was decoded with.
    pub encoding: &'static str,
}

/// Decode template bytes under the supported encoding set.
pub fn decode(bytes: &[u8]) -> Result<(String, &'static Encoding)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if encoding == UTF_8 || encoding == UTF_16LE || encoding == UTF_16BE {
            return encoding
                .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
                .map(|text| (text.into_owned(), encoding))
                .ok_or_else(|| {
                    WorklistError::EncodingFailure(format!("malformed {}", encoding.name()))
                });
        }
    }
    FALLBACK_ENCODINGS
        .iter()
        .find_map(|&encoding| {
            encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| (text.into_owned(), encoding))
        })
        .ok_or_else(|| {
            WorklistError::EncodingFailure(format!(
                "template is not valid {}",
                FALLBACK_ENCODINGS
                    .iter()
                    .map(|e| e.name())
                    .collect::<Vec<_>>()
                    .join(" or ")
            ))
        })
}

fn detect_delimiter(header: &str) -> u8 {
    if header.contains('\t') {
        b'\t'
    } else if header.contains(';') {
        b';'
    } else {
        b','
    }
}

impl Template {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (text, encoding) = decode(bytes)?;
        let header = text
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| WorklistError::parse("header", "template has no header row"))?;
        let delimiter = detect_delimiter(header);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(header.as_bytes());
        let record = reader
            .records()
            .next()
            .transpose()?
            .ok_or_else(|| WorklistError::parse("header", "template has no header row"))?;

        let columns: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        if columns.iter().all(String::is_empty) {
            return Err(WorklistError::parse("header", "template header is empty"));
        }

        Ok(Self {
            columns,
            delimiter,
            encoding: encoding.name(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WorklistError::ConfigurationMissing(format!(
                "instrument template {} not found, configure the instrument template first",
                path.display()
            )));
        }
        Self::from_bytes(&std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_separated_utf8_header() {
        let t = Template::from_bytes(b"Sample Name\tPosition\tInj Vol\r\nx\ty\tz\r\n").unwrap();
        assert_eq!(t.columns, vec!["Sample Name", "Position", "Inj Vol"]);
        assert_eq!(t.delimiter, b'\t');
        assert_eq!(t.encoding, "UTF-8");
    }

    #[test]
    fn quoted_comma_header_after_blank_lines() {
        let t = Template::from_bytes(b"\n\n\"Sample, Name\",Vial\n").unwrap();
        assert_eq!(t.columns, vec!["Sample, Name", "Vial"]);
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let t = Template::from_bytes(b"\xEF\xBB\xBFName;Vial").unwrap();
        assert_eq!(t.columns, vec!["Name", "Vial"]);
        assert_eq!(t.delimiter, b';');
    }

    #[test]
    fn utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "A\tB".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let t = Template::from_bytes(&bytes).unwrap();
        assert_eq!(t.columns, vec!["A", "B"]);
        assert_eq!(t.encoding, "UTF-16LE");
    }

    #[test]
    fn gbk_fallback() {
        let (encoded, _, _) = GBK.encode("样品名\t位置");
        let t = Template::from_bytes(&encoded).unwrap();
        assert_eq!(t.columns, vec!["样品名", "位置"]);
        assert_eq!(t.encoding, "GBK");
    }

    #[test]
    fn undecodable_bytes_fail() {
        let err = Template::from_bytes(&[0x41, 0xFF, 0xFF, 0x0A]).unwrap_err();
        assert!(matches!(err, WorklistError::EncodingFailure(_)));
    }

    #[test]
    fn empty_template_is_a_parse_failure() {
        assert!(matches!(
            Template::from_bytes(b"  \n\n").unwrap_err(),
            WorklistError::ParseFailure { .. }
        ));
    }
}
