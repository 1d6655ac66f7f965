use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use common::{BacktestError, Bar, Result};
use csv::StringRecord;
use tracing::debug;

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    width: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require =
            |name: &str| find(name).ok_or_else(|| BacktestError::MissingColumn(name.to_string()));

        Ok(Self {
            date: require("Date")?,
            open: require("Open")?,
            high: require("High")?,
            low: require("Low")?,
            close: require("Close")?,
            volume: find("Volume"),
            width: headers.len(),
        })
    }
}

/// Load bars from a CSV file with `Date,Open,High,Low,Close[,Volume]` headers
pub fn load_csv(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).map_err(|e| {
        BacktestError::DataLoadError(format!("{}: {}", path.display(), e))
    })?;
    let bars = read_bars(BufReader::new(file))?;
    if bars.is_empty() {
        return Err(BacktestError::EmptyData(path.display().to_string()));
    }
    Ok(bars)
}

/// Parse, drop incomplete rows, sort ascending and de-duplicate by date
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| BacktestError::CsvError(e.to_string()))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;

    for (line, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| BacktestError::CsvError(e.to_string()))?;
        match parse_row(&record, &columns, line + 2)? {
            Some(bar) => bars.push(bar),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, "dropped rows with missing values");
    }

    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    if bars.len() < before {
        debug!(duplicates = before - bars.len(), "dropped rows with duplicate dates");
    }

    Ok(bars)
}

/// `Ok(None)` means the row has a missing value in some column and should be skipped
fn parse_row(record: &StringRecord, columns: &Columns, line: usize) -> Result<Option<Bar>> {
    if record.len() < columns.width || record.iter().any(is_missing) {
        return Ok(None);
    }

    let Some(date) = cell(record, columns.date) else {
        return Ok(None);
    };

    let mut prices = [0.0; 4];
    for (slot, idx) in prices
        .iter_mut()
        .zip([columns.open, columns.high, columns.low, columns.close])
    {
        match cell(record, idx) {
            Some(raw) => *slot = parse_number(raw, line)?,
            None => return Ok(None),
        }
    }

    let volume = match columns.volume {
        Some(idx) => match cell(record, idx) {
            Some(raw) => parse_number(raw, line)?,
            None => return Ok(None),
        },
        None => 0.0,
    };

    let [open, high, low, close] = prices;
    Ok(Some(Bar::new(
        parse_timestamp(date)?,
        open,
        high,
        low,
        close,
        volume,
    )))
}

fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    let raw = record.get(idx)?.trim();
    if is_missing(raw) {
        None
    } else {
        Some(raw)
    }
}

fn is_missing(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || is_missing_marker(raw)
}

fn is_missing_marker(raw: &str) -> bool {
    ["nan", "null", "na", "n/a", "none"]
        .iter()
        .any(|m| raw.eq_ignore_ascii_case(m))
}

fn parse_number(raw: &str, line: usize) -> Result<f64> {
    raw.replace(',', "")
        .parse()
        .map_err(|_| BacktestError::CsvError(format!("line {line}: invalid number '{raw}'")))
}

/// Parse timestamp from various formats
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%b-%Y"];
    for fmt in &date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
        }
    }

    // Unix seconds
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(BacktestError::CsvError(format!(
        "Unable to parse timestamp: {}",
        s
    )))
}
