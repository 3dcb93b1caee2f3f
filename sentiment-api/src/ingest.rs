//! Review extraction from uploaded CSV and XLSX files.

use std::io::Cursor;

use calamine::{Reader, Xlsx, XlsxError, open_workbook_from_rs};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid file format: {0}. Please upload an XLSX or CSV file")]
    UnsupportedFormat(String),

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not read XLSX: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("File contains no reviews")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xlsx,
}

impl FileKind {
    pub fn from_file_name(name: &str) -> Result<Self, IngestError> {
        let lowered = name.to_lowercase();
        if lowered.ends_with(".csv") {
            Ok(Self::Csv)
        } else if lowered.ends_with(".xlsx") {
            Ok(Self::Xlsx)
        } else {
            Err(IngestError::UnsupportedFormat(name.to_string()))
        }
    }
}

/// Reads the first column of the upload as review text.
///
/// A leading `review` header cell is dropped and blank cells are skipped.
pub fn read_reviews(kind: FileKind, bytes: &[u8]) -> Result<Vec<String>, IngestError> {
    let cells = match kind {
        FileKind::Csv => first_column_csv(bytes)?,
        FileKind::Xlsx => first_column_xlsx(bytes)?,
    };

    let reviews = clean(cells);
    if reviews.is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(reviews)
}

fn first_column_csv(bytes: &[u8]) -> Result<Vec<String>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record?;
        cells.push(record.get(0).unwrap_or_default().to_string());
    }
    Ok(cells)
}

fn first_column_xlsx(bytes: &[u8]) -> Result<Vec<String>, IngestError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::NoWorksheet)??;

    Ok(range
        .rows()
        .map(|row| row.first().map(ToString::to_string).unwrap_or_default())
        .collect())
}

fn clean(cells: Vec<String>) -> Vec<String> {
    let mut cells = cells.into_iter().peekable();
    if cells
        .peek()
        .is_some_and(|first| first.trim().eq_ignore_ascii_case("review"))
    {
        cells.next();
    }

    cells
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect()
}
