//! Canonical 96-well addressing.
//!
//! Rows are lettered `A..H`, columns numbered `1..12`. The well index is always
//! row-major (`rank(letter) * 12 + number`) no matter which fill order was used
//! to lay the scan sequence onto the plate; worklist placeholders rely on it.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorklistError};

pub const LETTERS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
pub const ROWS: usize = 8;
pub const COLUMNS: usize = 12;
pub const WELLS_PER_PLATE: usize = ROWS * COLUMNS;

/// Rows that can hold a locator well. Row `A` is never used.
const LOCATOR_ROWS: [char; 7] = ['B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// Highest plate number that still has a locator target.
pub const MAX_LOCATOR_PLATE: u32 = (LOCATOR_ROWS.len() * COLUMNS) as u32;

/// Traversal used when a linear scan sequence is laid onto the plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillOrder {
    #[default]
    RowMajor,
    ColumnMajor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    letter: char,
    number: u8,
}

impl Position {
    pub fn new(letter: char, number: u8) -> Result<Self> {
        let letter = letter.to_ascii_uppercase();
        if !LETTERS.contains(&letter) || !(1..=COLUMNS as u8).contains(&number) {
            return Err(WorklistError::InvalidPosition(format!("{letter}{number}")));
        }
        Ok(Self { letter, number })
    }

    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    fn rank(&self) -> usize {
        (self.letter as u8 - b'A') as usize
    }

    /// 1-based row-major index in `1..=96`.
    pub fn well_index(&self) -> usize {
        self.rank() * COLUMNS + self.number as usize
    }

    /// Inverse of [`Position::well_index`].
    pub fn from_well_index(index: usize) -> Result<Self> {
        if !(1..=WELLS_PER_PLATE).contains(&index) {
            return Err(WorklistError::InvalidPosition(format!("well index {index}")));
        }
        let zero = index - 1;
        Ok(Self {
            letter: LETTERS[zero / COLUMNS],
            number: (zero % COLUMNS + 1) as u8,
        })
    }

    /// Position at 0-based linear offset `i` under the given fill order.
    pub fn at(i: usize, order: FillOrder) -> Result<Self> {
        if i >= WELLS_PER_PLATE {
            return Err(WorklistError::InvalidPosition(format!("linear offset {i}")));
        }
        let (row, col) = match order {
            FillOrder::RowMajor => (i / COLUMNS, i % COLUMNS),
            FillOrder::ColumnMajor => (i % ROWS, i / ROWS),
        };
        Ok(Self {
            letter: LETTERS[row],
            number: (col + 1) as u8,
        })
    }

    /// Parse a label such as `A1`, `h12` or `B07`.
    pub fn parse(label: &str) -> Result<Self> {
        let label = label.trim();
        let mut chars = label.chars();
        let letter = chars
            .next()
            .ok_or_else(|| WorklistError::InvalidPosition(label.to_string()))?;
        let number: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| WorklistError::InvalidPosition(label.to_string()))?;
        Self::new(letter, number)
    }

    /// Resolve an instrument position label. Letter/number labels map
    /// directly; a bare slot number `n` is the `n`-th reading of the scan
    /// sequence and is laid out with the plate's fill order.
    pub fn from_label(label: &str, order: FillOrder) -> Result<Self> {
        if let Ok(position) = Self::parse(label) {
            return Ok(position);
        }
        match label.trim().parse::<usize>() {
            Ok(slot) if slot >= 1 => Self::at((slot - 1) % WELLS_PER_PLATE, order),
            _ => Err(WorklistError::InvalidPosition(label.to_string())),
        }
    }

    /// Designated locator well for a plate, or `None` past plate 84.
    pub fn locator(plate_number: u32) -> Option<Self> {
        if plate_number == 0 || plate_number > MAX_LOCATOR_PLATE {
            return None;
        }
        let n = (plate_number - 1) as usize;
        Some(Self {
            letter: LOCATOR_ROWS[n / COLUMNS],
            number: (n % COLUMNS + 1) as u8,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)
    }
}

/// All 96 positions, row-major.
pub fn canonical_positions() -> impl Iterator<Item = Position> {
    LETTERS.iter().flat_map(|&letter| {
        (1..=COLUMNS as u8).map(move |number| Position { letter, number })
    })
}

static LOCATOR_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^X(\d+)$").expect("static regex"));

/// Plate number carried by a locator label such as `X13`.
pub fn locator_plate_number(label: &str) -> Option<u32> {
    LOCATOR_LABEL
        .captures(label.trim())
        .and_then(|caps| caps[1].parse().ok())
}

pub fn locator_label(plate_number: u32) -> String {
    format!("X{plate_number}")
}

/// Sequence number of a raw instrument label: the well index for letter/number
/// labels, the slot itself for numeric slot ids.
pub fn sequence_number(label: &str) -> Option<usize> {
    if let Ok(position) = Position::parse(label) {
        return Some(position.well_index());
    }
    label.trim().parse::<usize>().ok().filter(|&n| n >= 1)
}
