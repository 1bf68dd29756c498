//! Tabular rendering of measurement records.
//!
//! Column order is `profile_id, depth_level, time, pressure, temperature,
//! salinity`. Null time and salinity render as empty fields. When a
//! [`DatasetMetadata`] is supplied its keys are appended as extra columns
//! carrying the same value on every row.

use std::io::{Read, Write};

use argo_common::{
    format_timestamp, parse_timestamp, DatasetMetadata, MeasurementRecord, SourcedRecord,
};

use crate::error::{IngestionError, Result};

/// Column names of the measurement table.
pub const RECORD_COLUMNS: [&str; 6] = [
    "profile_id",
    "depth_level",
    "time",
    "pressure",
    "temperature",
    "salinity",
];

/// A row that can be written to a CSV table.
pub trait TableRow {
    fn header() -> Vec<&'static str>;
    fn fields(&self) -> Vec<String>;
}

impl TableRow for MeasurementRecord {
    fn header() -> Vec<&'static str> {
        RECORD_COLUMNS.to_vec()
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.profile_id.to_string(),
            self.depth_level.to_string(),
            self.time.as_ref().map(format_timestamp).unwrap_or_default(),
            self.pressure.to_string(),
            self.temperature.to_string(),
            self.salinity.map(|s| s.to_string()).unwrap_or_default(),
        ]
    }
}

impl TableRow for SourcedRecord {
    fn header() -> Vec<&'static str> {
        let mut header = vec!["dataset"];
        header.extend(RECORD_COLUMNS);
        header
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = vec![self.dataset.to_string()];
        fields.extend(self.record.fields());
        fields
    }
}

/// Write rows as CSV, optionally joining metadata columns onto each row.
pub fn write_table<W: Write, T: TableRow>(
    writer: W,
    rows: &[T],
    metadata: Option<&DatasetMetadata>,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let extra: Vec<(&String, String)> = metadata
        .map(|m| m.iter().map(|(k, v)| (k, v.to_string())).collect())
        .unwrap_or_default();

    let mut header: Vec<&str> = T::header();
    header.extend(extra.iter().map(|(k, _)| k.as_str()));
    wtr.write_record(&header)?;

    for row in rows {
        let mut fields = row.fields();
        fields.extend(extra.iter().map(|(_, v)| v.clone()));
        wtr.write_record(&fields)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render rows as a CSV string.
pub fn render_csv<T: TableRow>(rows: &[T], metadata: Option<&DatasetMetadata>) -> Result<String> {
    let mut buf = Vec::new();
    write_table(&mut buf, rows, metadata)?;
    Ok(String::from_utf8(buf)?)
}

/// Read measurement records back from a CSV table.
///
/// Columns are located by header name; joined metadata columns are ignored.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<MeasurementRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IngestionError::MissingColumn(name.to_string()))
    };
    let [profile_col, depth_col, time_col, pres_col, temp_col, psal_col] =
        RECORD_COLUMNS.map(column);
    let (profile_col, depth_col, time_col) = (profile_col?, depth_col?, time_col?);
    let (pres_col, temp_col, psal_col) = (pres_col?, temp_col?, psal_col?);

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let field = |i: usize| row.get(i).unwrap_or("").trim();

        let time = match field(time_col) {
            "" => None,
            raw => Some(parse_timestamp(raw).map_err(|_| invalid("time", raw))?),
        };
        let salinity = match field(psal_col) {
            "" => None,
            raw => Some(parse_number("salinity", raw)?),
        };

        records.push(MeasurementRecord {
            profile_id: field(profile_col)
                .parse()
                .map_err(|_| invalid("profile_id", field(profile_col)))?,
            depth_level: field(depth_col)
                .parse()
                .map_err(|_| invalid("depth_level", field(depth_col)))?,
            time,
            pressure: parse_number("pressure", field(pres_col))?,
            temperature: parse_number("temperature", field(temp_col))?,
            salinity,
        });
    }

    Ok(records)
}

/// Keep only the rows of one profile, in their original order.
pub fn retain_profile(records: Vec<MeasurementRecord>, profile_id: u32) -> Vec<MeasurementRecord> {
    records
        .into_iter()
        .filter(|r| r.profile_id == profile_id)
        .collect()
}

/// Copy a CSV table keeping only rows of one profile. Every column,
/// including joined metadata, is preserved. Returns the number of rows kept.
pub fn filter_table_by_profile<R: Read, W: Write>(
    reader: R,
    writer: W,
    profile_id: u32,
) -> Result<usize> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut wtr = csv::Writer::from_writer(writer);

    let headers = rdr.headers()?.clone();
    let profile_col = headers
        .iter()
        .position(|h| h == "profile_id")
        .ok_or_else(|| IngestionError::MissingColumn("profile_id".to_string()))?;
    wtr.write_record(&headers)?;

    let wanted = profile_id.to_string();
    let mut kept = 0;
    for result in rdr.records() {
        let row = result?;
        if row.get(profile_col).map(str::trim) == Some(wanted.as_str()) {
            wtr.write_record(&row)?;
            kept += 1;
        }
    }

    wtr.flush()?;
    Ok(kept)
}

fn invalid(column: &str, value: &str) -> IngestionError {
    IngestionError::InvalidValue {
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn parse_number(column: &str, raw: &str) -> Result<f64> {
    raw.parse().map_err(|_| invalid(column, raw))
}
