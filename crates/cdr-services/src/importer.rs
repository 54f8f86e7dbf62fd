//! Bulk CSV import of call detail records
//!
//! Each line is decoded into a candidate record, validated, and persisted on
//! its own. A bad line is recorded in the [`ImportSummary`] and the import
//! moves on; earlier records are never rolled back.
//!
//! Expected columns, in order:
//!
//! ```text
//! call_id,calling_number,called_number,start_time,end_time,duration,call_status,call_type
//! A1,+11234567890,+10987654321,2023-11-20 22:00:00,2023-11-20 22:10:00,600,SUCCESS,OUTGOING
//! ```

use cdr_core::{
    config::HeaderMode,
    models::CallRecord,
    traits::CallRecordStore,
    validation::{
        self, CandidateRecord, FieldValue, CALLED_NUMBER, CALLING_NUMBER, CALL_ID, CALL_STATUS,
        CALL_TYPE, DURATION, END_TIME, START_TIME,
    },
};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Timestamp layout of the `start_time`/`end_time` columns, read as UTC
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column order of an import file
pub const CSV_COLUMNS: [&str; 8] = [
    CALL_ID,
    CALLING_NUMBER,
    CALLED_NUMBER,
    START_TIME,
    END_TIME,
    DURATION,
    CALL_STATUS,
    CALL_TYPE,
];

/// Why a line was not imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ImportFailureKind {
    #[error("malformed row")]
    MalformedRow,
    #[error("unparseable timestamp")]
    TimestampParse,
    #[error("unparseable duration")]
    DurationParse,
    #[error("validation failed")]
    Validation,
    #[error("could not be stored")]
    Persistence,
}

/// One rejected line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFailure {
    /// 1-based line number in the uploaded file
    pub line: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub kind: ImportFailureKind,
    pub errors: Vec<String>,
}

/// Outcome of one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Data rows seen, header excluded
    pub total_rows: u64,
    pub imported: u64,
    pub failed: u64,
    pub header_skipped: bool,
    pub failures: Vec<LineFailure>,
}

impl ImportSummary {
    fn record_failure(&mut self, failure: LineFailure) {
        warn!(
            line = failure.line,
            call_id = failure.call_id.as_deref().unwrap_or(""),
            kind = %failure.kind,
            errors = ?failure.errors,
            "Skipping CDR line"
        );
        self.failed += 1;
        self.failures.push(failure);
    }
}

/// Imports CSV streams into a [`CallRecordStore`]
#[derive(Clone)]
pub struct CdrImporter {
    store: Arc<dyn CallRecordStore>,
}

impl CdrImporter {
    pub fn new(store: Arc<dyn CallRecordStore>) -> Self {
        Self { store }
    }

    /// Import every line of `input`
    ///
    /// Never fails as a whole: per-line problems, including read errors, end
    /// up in [`ImportSummary::failures`].
    #[instrument(skip(self, input))]
    pub async fn import<R: Read + Send>(&self, input: R, header_mode: HeaderMode) -> ImportSummary {
        import_csv(self.store.as_ref(), input, header_mode).await
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Drop a leading UTF-8 byte order mark
///
/// A read error here is left for the CSV reader to report on its first read.
fn skip_bom<R: Read>(input: R) -> BufReader<R> {
    let mut input = BufReader::new(input);
    if input
        .fill_buf()
        .is_ok_and(|buf| buf.starts_with(UTF8_BOM))
    {
        input.consume(UTF8_BOM.len());
    }
    input
}

/// Import `input` line by line into `store`
///
/// Cells are taken verbatim. `call_id`, the phone numbers, the timestamps and
/// the duration tolerate surrounding whitespace; status and type do not.
pub async fn import_csv<R: Read + Send>(
    store: &dyn CallRecordStore,
    input: R,
    header_mode: HeaderMode,
) -> ImportSummary {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(skip_bom(input));

    let mut summary = ImportSummary::default();
    let mut first_row = true;
    let mut record = StringRecord::new();

    loop {
        let line = reader.position().line();
        let read = reader.read_record(&mut record);
        let is_first = std::mem::take(&mut first_row);

        match read {
            Ok(false) => break,
            Ok(true) => {
                let line = record.position().map_or(line, |p| p.line());

                if is_first && skip_header(&record, header_mode) {
                    debug!(line, "Skipping header row");
                    summary.header_skipped = true;
                    continue;
                }

                summary.total_rows += 1;
                match import_row(store, &record).await {
                    Ok(()) => summary.imported += 1,
                    Err((kind, errors)) => summary.record_failure(LineFailure {
                        line,
                        call_id: row_call_id(&record),
                        kind,
                        errors,
                    }),
                }
            }
            Err(e) => {
                let line = e.position().map_or(line, |p| p.line());
                let fatal = e.is_io_error();

                if is_first && header_mode == HeaderMode::Present {
                    summary.header_skipped = true;
                } else {
                    summary.total_rows += 1;
                    summary.record_failure(LineFailure {
                        line,
                        call_id: None,
                        kind: ImportFailureKind::MalformedRow,
                        errors: vec![e.to_string()],
                    });
                }

                if fatal {
                    break;
                }
            }
        }
    }

    info!(
        total_rows = summary.total_rows,
        imported = summary.imported,
        failed = summary.failed,
        header_skipped = summary.header_skipped,
        "CDR import finished"
    );

    summary
}

async fn import_row(
    store: &dyn CallRecordStore,
    row: &StringRecord,
) -> Result<(), (ImportFailureKind, Vec<String>)> {
    let candidate = decode_row(row)?;

    let record = validation::validate(&candidate).map_err(|e| {
        (
            ImportFailureKind::Validation,
            e.errors.iter().map(ToString::to_string).collect(),
        )
    })?;

    store
        .create(&record)
        .await
        .map(|_| ())
        .map_err(|e| (ImportFailureKind::Persistence, vec![e.to_string()]))
}

/// Decode one positional row into a typed candidate
fn decode_row(row: &StringRecord) -> Result<CandidateRecord, (ImportFailureKind, Vec<String>)> {
    if row.len() != CSV_COLUMNS.len() {
        return Err((
            ImportFailureKind::MalformedRow,
            vec![format!(
                "Expected {} fields, found {}",
                CSV_COLUMNS.len(),
                row.len()
            )],
        ));
    }

    let cell = |i: usize| row.get(i).unwrap_or_default();

    let start_time = parse_csv_timestamp(START_TIME, cell(3).trim());
    let end_time = parse_csv_timestamp(END_TIME, cell(4).trim());
    let (start_time, end_time) = match (start_time, end_time) {
        (Ok(start), Ok(end)) => (start, end),
        (start, end) => {
            let errors = [start.err(), end.err()].into_iter().flatten().collect();
            return Err((ImportFailureKind::TimestampParse, errors));
        }
    };

    let duration = cell(5).trim().parse::<i64>().map_err(|e| {
        (
            ImportFailureKind::DurationParse,
            vec![format!("{}: '{}' is not an integer ({})", DURATION, cell(5), e)],
        )
    })?;

    Ok(CandidateRecord {
        call_id: Some(cell(0).into()),
        calling_number: Some(cell(1).into()),
        called_number: Some(cell(2).into()),
        start_time: Some(FieldValue::Timestamp(start_time)),
        end_time: Some(FieldValue::Timestamp(end_time)),
        duration: Some(FieldValue::Integer(duration)),
        call_status: Some(cell(6).into()),
        call_type: Some(cell(7).into()),
    })
}

fn parse_csv_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, String> {
    NaiveDateTime::parse_from_str(raw, CSV_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            format!(
                "{}: '{}' does not match {} ({})",
                field, raw, CSV_TIMESTAMP_FORMAT, e
            )
        })
}

/// Decide whether the first row is column names
fn skip_header(row: &StringRecord, mode: HeaderMode) -> bool {
    match mode {
        HeaderMode::Present => true,
        HeaderMode::Absent => false,
        HeaderMode::Auto => {
            let names_a_column = row.iter().any(|cell| {
                CSV_COLUMNS
                    .iter()
                    .any(|column| cell.trim().eq_ignore_ascii_case(column))
            });
            let has_timestamp = row.iter().any(|cell| {
                NaiveDateTime::parse_from_str(cell.trim(), CSV_TIMESTAMP_FORMAT).is_ok()
            });

            names_a_column && !has_timestamp
        }
    }
}

fn row_call_id(row: &StringRecord) -> Option<String> {
    row.get(0)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
}

/// Render a record as the eight import columns
pub fn csv_row(record: &CallRecord) -> [String; 8] {
    [
        record.call_id.clone(),
        record.calling_number.to_string(),
        record.called_number.to_string(),
        record.start_time.format(CSV_TIMESTAMP_FORMAT).to_string(),
        record.end_time.format(CSV_TIMESTAMP_FORMAT).to_string(),
        record.duration.to_string(),
        record.call_status.to_string(),
        record.call_type.to_string(),
    ]
}
