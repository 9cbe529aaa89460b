//! Turns parsed records into dated events.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::record::Schema;

/// One accepted case report. Line-list rows always carry a count of 1; the
/// aggregated time-series variant reports `new_cases` per nation-day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub date: NaiveDate,
    pub nation: String,
    pub count: u64,
}

/// Which case statuses are admitted, and therefore which date column is read.
///
/// Confirmed-only runs date cases by their confirmation date. The inclusive
/// mode admits everything not explicitly discarded and falls back to the
/// entry date, since unconfirmed cases have no confirmation date yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    ConfirmedOnly,
    IncludeUnconfirmed,
}

/// Nation selection. `World` admits everything; `Only` is an exact match
/// against the record's nation-identifier field, with any of the listed keys
/// accepted so a caller can offer both a display name and its ISO3 code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NationFilter {
    World,
    Only(Vec<String>),
}

impl NationFilter {
    pub fn only<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NationFilter::Only(keys.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, nation: &str) -> bool {
        match self {
            NationFilter::World => true,
            NationFilter::Only(keys) => keys.iter().any(|k| k == nation),
        }
    }
}

fn parse_date(field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .map_err(|_| Error::MalformedDate(field.to_owned()))
}

/// Extract zero or one [`Event`] from a record that already passed the arity
/// check. Filter misses yield `Ok(None)`; an unparsable date on an admitted
/// row is fatal.
pub fn extract(
    fields: &[String],
    schema: &Schema,
    status_filter: StatusFilter,
    nation_filter: &NationFilter,
) -> Result<Option<Event>> {
    match *schema {
        Schema::LineList {
            status,
            country,
            date_confirmation,
            date_entry,
            ..
        } => {
            let admitted = match status_filter {
                StatusFilter::ConfirmedOnly => fields[status].eq_ignore_ascii_case("confirmed"),
                StatusFilter::IncludeUnconfirmed => fields[status] != "discarded",
            };
            if !admitted || !nation_filter.matches(&fields[country]) {
                return Ok(None);
            }
            let date_field = match status_filter {
                StatusFilter::ConfirmedOnly => &fields[date_confirmation],
                StatusFilter::IncludeUnconfirmed => &fields[date_entry],
            };
            Ok(Some(Event {
                date: parse_date(date_field)?,
                nation: fields[country].clone(),
                count: 1,
            }))
        }
        Schema::Timeseries {
            iso_code,
            date,
            new_cases,
            ..
        } => {
            // The aggregated variant has no per-case status; the status
            // filter only decides things for the line list.
            if !nation_filter.matches(&fields[iso_code]) {
                return Ok(None);
            }
            // Empty or non-numeric new_cases means no reportable count for
            // that nation-day.
            let raw = fields[new_cases].trim();
            if raw.is_empty() {
                return Ok(None);
            }
            let count = match raw.parse::<f64>() {
                Ok(v) if v > 0.0 => v.round() as u64,
                _ => return Ok(None),
            };
            Ok(Some(Event {
                date: parse_date(&fields[date])?,
                nation: fields[iso_code].clone(),
                count,
            }))
        }
    }
}
