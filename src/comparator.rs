//! Sort keys for the listing columns.
//!
//! Every header name maps to a [`ColumnKind`], which turns a cell into a
//! [`SortKey`]. Keys are compared ascending; columns where more is better use
//! negated numbers so that the biggest value ends up on top.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::listing::{Cell, Row};

const QUANTITY_COLUMNS: [&str; 7] = [
    "Disk space",
    "Bandwidth",
    "RAM",
    "Burst (OpenVZ)",
    "vSwap (OpenVZ)",
    "IPv6 addresses",
    "Connection speed",
];
const TRISTATE_COLUMNS: [&str; 2] = ["IRC usage", "IRC bots"];
const IDENTIFIER_COLUMN: &str = "Name";
const LOCATION_COLUMN: &str = "Location";

pub const INFINITY_GLYPH: &str = "\u{221e}";
/// Value of a cell without any number in it.
pub const MISSING_NUMBER: f64 = -1.0;
const GIGA: f64 = 1024.0;
const TERA: f64 = 1024.0 * 1024.0;
const US_PREFIX: &str = "US ";
const US_SENTINEL: &str = "ZZZ";

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// More is better: disk, bandwidth, memory, address counts, speed.
    Quantity,
    /// The server name, ordered by its number.
    Identifier,
    /// Yes / Unknown / No.
    Tristate,
    /// Country first, United States last.
    Location,
    Text,
}

impl ColumnKind {
    pub fn for_header(name: &str) -> Self {
        if QUANTITY_COLUMNS.contains(&name) {
            ColumnKind::Quantity
        } else if TRISTATE_COLUMNS.contains(&name) {
            ColumnKind::Tristate
        } else if name == IDENTIFIER_COLUMN {
            ColumnKind::Identifier
        } else if name == LOCATION_COLUMN {
            ColumnKind::Location
        } else {
            ColumnKind::Text
        }
    }

    pub fn key(self, cell: &Cell) -> SortKey {
        let value = cell.text.as_str();
        match self {
            ColumnKind::Quantity => SortKey::Number(quantity_key(cell)),
            ColumnKind::Identifier => SortKey::Number(
                DIGITS
                    .find(value)
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .unwrap_or(MISSING_NUMBER),
            ),
            ColumnKind::Tristate => SortKey::Number(match value {
                "Yes" => 1.0,
                "Unknown" => 2.0,
                "No" => 3.0,
                _ => 4.0,
            }),
            ColumnKind::Location if value.starts_with(US_PREFIX) => {
                SortKey::Text(format!("{US_SENTINEL}{value}"))
            }
            ColumnKind::Location => SortKey::Text(value.to_string()),
            ColumnKind::Text => SortKey::Text(value.to_string()),
        }
    }
}

fn quantity_key(cell: &Cell) -> f64 {
    let value = cell.text.as_str();
    if value == INFINITY_GLYPH {
        return f64::NEG_INFINITY;
    }

    let mut result = DECIMAL
        .find(value)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(MISSING_NUMBER);

    // Also hits counts that happen to contain the letter, which is harmless.
    if value.contains('G') {
        result *= GIGA;
    } else if value.contains('T') {
        result *= TERA;
    }

    if let Some(exponent) = cell
        .superscript
        .as_deref()
        .and_then(|e| e.parse::<f64>().ok())
    {
        result = result.powf(exponent);
    }

    -result
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

/// Stable sort of `order` (indices into `rows`) by the key of `column`.
/// Rows without that cell sort like an empty cell.
pub fn sort_by_column(order: &mut [usize], rows: &[Row], column: usize, kind: ColumnKind) {
    let empty = Cell::default();
    let keys: Vec<SortKey> = rows
        .iter()
        .map(|row| kind.key(row.cell(column).unwrap_or(&empty)))
        .collect();
    order.sort_by(|&a, &b| keys[a].compare(&keys[b]));
}
