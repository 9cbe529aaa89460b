//! Raw line splitting and header schema resolution.
//!
//! The source file is CSV with occasional commas inside double-quoted fields
//! (city lists, mostly). Those commas are neutralized before splitting so the
//! field count comes out right; the quoted fields themselves are only ever
//! compared or date-parsed, so the replacement is never undone.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Replace every comma that falls inside a double-quoted span with a space.
pub fn neutralize_quoted_commas(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                out.push(ch);
            }
            ',' if in_quotes => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// Split one raw line into exactly `expected_arity` fields.
///
/// Returns `None` when the field count disagrees with the header. That silent
/// skip is the sole malformed-row strategy; nothing is logged per row.
pub fn split_line(line: &str, expected_arity: usize) -> Option<Vec<String>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<String> = neutralize_quoted_commas(line)
        .split(',')
        .map(str::to_owned)
        .collect();
    if fields.len() != expected_arity {
        return None;
    }
    Some(fields)
}

/// Column layout resolved from the header row by name, never by fixed index.
///
/// The dataset has shipped under two shapes: the global.health line list
/// (one row per case) and the OWID aggregated time series (one row per
/// nation-day). The presence of `iso_code` in the header selects the latter.
#[derive(Debug, Clone)]
pub enum Schema {
    LineList {
        arity: usize,
        status: usize,
        country: usize,
        date_confirmation: usize,
        date_entry: usize,
    },
    Timeseries {
        arity: usize,
        iso_code: usize,
        date: usize,
        new_cases: usize,
    },
}

impl Schema {
    pub fn from_header(header: &str) -> Result<Self> {
        let header = header.trim_end_matches(['\r', '\n']);
        let names: Vec<String> = neutralize_quoted_commas(header)
            .split(',')
            .map(|n| n.trim().to_owned())
            .collect();
        let positions: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        let arity = names.len();

        let col = |name: &str| -> Result<usize> {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| Error::SchemaDrift(name.to_owned()))
        };

        if positions.contains_key("iso_code") {
            Ok(Schema::Timeseries {
                arity,
                iso_code: col("iso_code")?,
                date: col("date")?,
                new_cases: col("new_cases")?,
            })
        } else {
            Ok(Schema::LineList {
                arity,
                status: col("Status")?,
                country: col("Country")?,
                date_confirmation: col("Date_confirmation")?,
                date_entry: col("Date_entry")?,
            })
        }
    }

    /// Field count every data row must match.
    pub fn arity(&self) -> usize {
        match *self {
            Schema::LineList { arity, .. } | Schema::Timeseries { arity, .. } => arity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_LIST_HEADER: &str =
        "ID,Status,Location,City,Country,Country_ISO3,Age,Gender,Date_confirmation,Date_entry";

    #[test]
    fn quoted_commas_do_not_change_arity() {
        let fields = split_line("1,confirmed,\"Madrid, Spain\",Madrid,Spain", 5).unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[2], "\"Madrid  Spain\"");
    }

    #[test]
    fn arity_mismatch_is_a_silent_skip() {
        assert!(split_line("1,confirmed,Spain", 5).is_none());
        assert!(split_line("1,confirmed,a,b,c,d", 5).is_none());
    }

    #[test]
    fn line_list_header_resolves_by_name() {
        let schema = Schema::from_header(LINE_LIST_HEADER).unwrap();
        match schema {
            Schema::LineList {
                arity,
                status,
                country,
                date_confirmation,
                date_entry,
            } => {
                assert_eq!(arity, 10);
                assert_eq!(status, 1);
                assert_eq!(country, 4);
                assert_eq!(date_confirmation, 8);
                assert_eq!(date_entry, 9);
            }
            _ => panic!("expected line-list schema"),
        }
    }

    #[test]
    fn timeseries_header_selected_by_iso_code() {
        let schema = Schema::from_header("location,iso_code,date,new_cases,total_cases").unwrap();
        match schema {
            Schema::Timeseries {
                arity,
                iso_code,
                date,
                new_cases,
            } => {
                assert_eq!(arity, 5);
                assert_eq!(iso_code, 1);
                assert_eq!(date, 2);
                assert_eq!(new_cases, 3);
            }
            _ => panic!("expected time-series schema"),
        }
    }

    #[test]
    fn missing_column_is_schema_drift() {
        let err = Schema::from_header("ID,Status,Country,Date_entry").unwrap_err();
        assert!(matches!(err, Error::SchemaDrift(name) if name == "Date_confirmation"));
    }
}
