//! Single pass from raw CSV text to extracted events.

use std::io::BufRead;

use crate::error::{Error, Result};
use crate::event::{self, Event, NationFilter, StatusFilter};
use crate::record::{self, Schema};

/// Parse the header, then scan every data line into events.
///
/// Rows whose field count disagrees with the header are skipped silently;
/// rows the filters reject contribute nothing. A malformed date on an
/// accepted row aborts the scan.
pub fn collect_events<R: BufRead>(
    reader: R,
    status_filter: StatusFilter,
    nation_filter: &NationFilter,
) -> Result<Vec<Event>> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::EmptyDataset),
    };
    let schema = Schema::from_header(&header)?;

    let mut events = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(fields) = record::split_line(&line, schema.arity()) else {
            skipped += 1;
            continue;
        };
        if let Some(e) = event::extract(&fields, &schema, status_filter, nation_filter)? {
            events.push(e);
        }
    }
    if skipped > 0 {
        log::debug!("skipped {skipped} rows with mismatched field counts");
    }
    Ok(events)
}
