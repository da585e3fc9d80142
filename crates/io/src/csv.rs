// CSV import/export for the repository dataset

use std::io::{Read, Write};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, SubsecRound};
use dedupe_core::{Column, Field, Record, RecordId, Value, COLUMNS, DATE_FORMAT};

const DATETIME_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Spreadsheet exports are often Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            log::warn!("{} is not valid UTF-8, decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

/// Parse a timestamp cell. Empty cells are `Ok(None)`.
///
/// Fractional seconds are dropped so the value survives a save.
pub fn parse_datetime(raw: &str) -> Result<Option<NaiveDateTime>, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }
    for fmt in DATETIME_INPUT_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Some(dt.trunc_subsecs(0)));
        }
    }
    for fmt in DATE_INPUT_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.and_hms_opt(0, 0, 0));
        }
    }
    Err(format!("cannot parse date-time '{raw}'"))
}

/// Map each header position to its schema column.
///
/// Every schema column must appear exactly once; order is free.
fn header_layout(headers: &csv::StringRecord) -> Result<Vec<Column>, String> {
    let mut layout = Vec::with_capacity(headers.len());
    for (i, name) in headers.iter().enumerate() {
        // Strip a UTF-8 BOM from the first header
        let name = if i == 0 { name.trim_start_matches('\u{feff}') } else { name };
        let column = Column::all()
            .find(|c| c.name() == name)
            .ok_or_else(|| format!("unexpected column '{name}'"))?;
        if layout.contains(&column) {
            return Err(format!("column '{name}' appears more than once"));
        }
        layout.push(column);
    }

    let missing: Vec<&str> = COLUMNS
        .iter()
        .copied()
        .filter(|name| !layout.iter().any(|c| c.name() == *name))
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing column(s): {}", missing.join(", ")));
    }
    Ok(layout)
}

/// Parse CSV text into records, in file order.
pub fn parse_records(content: &str) -> Result<Vec<Record>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(|e| format!("CSV parse error: {e}"))?.clone();
    if headers.is_empty() {
        return Err("no header row".to_string());
    }
    let layout = header_layout(&headers)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        // Header is file line 1
        let line = row + 2;
        let row_data = result.map_err(|e| format!("CSV parse error: {e}"))?;

        let mut id = None;
        let mut values: Vec<(Field, Value)> = Vec::with_capacity(Field::COUNT);
        for (column, cell) in layout.iter().zip(row_data.iter()) {
            match column {
                Column::Id => {
                    let parsed: RecordId = cell
                        .parse()
                        .map_err(|_| format!("line {line}: invalid id '{cell}'"))?;
                    id = Some(parsed);
                }
                Column::Field(f) if f.is_timestamp() => {
                    let value = parse_datetime(cell)
                        .map_err(|e| format!("line {line}, column {f}: {e}"))?
                        .map(Value::DateTime)
                        .unwrap_or_default();
                    values.push((*f, value));
                }
                Column::Field(f) => values.push((*f, Value::text(cell))),
            }
        }

        let id = id.ok_or_else(|| format!("line {line}: missing id"))?;
        let mut record = Record::new(id);
        for (field, value) in values {
            record.set(field, value);
        }
        records.push(record);
    }

    Ok(records)
}

/// Write records in the canonical column order with CRLF line endings.
pub fn write_records<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a Record>,
) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    writer.write_record(COLUMNS)?;
    for record in records {
        let mut row: Vec<String> = Vec::with_capacity(COLUMNS.len());
        row.push(record.id().to_string());
        for (_, value) in record.values() {
            row.push(match value {
                Value::DateTime(dt) => dt.format(DATE_FORMAT).to_string(),
                other => other.to_string(),
            });
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
