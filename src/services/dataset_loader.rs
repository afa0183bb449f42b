use std::io::Cursor;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use crate::error::AppError;
use crate::models::{is_na_token, Dataset, Value};
use super::utils::{clean_column_name, decode_text, dedupe_column_names, load_file_from_url};

/// Where the dataset is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Path(PathBuf),
    Url(String),
}

impl DatasetSource {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DatasetSource::Url(trimmed.to_string())
        } else {
            DatasetSource::Path(PathBuf::from(trimmed))
        }
    }

    fn is_xlsx(&self) -> bool {
        let name = match self {
            DatasetSource::Path(path) => path.to_string_lossy().to_lowercase(),
            DatasetSource::Url(url) => url.split(['?', '#']).next().unwrap_or_default().to_lowercase(),
        };
        name.ends_with(".xlsx")
    }
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetSource::Path(path) => write!(f, "{}", path.display()),
            DatasetSource::Url(url) => f.write_str(url),
        }
    }
}

pub async fn load_dataset(source: &DatasetSource) -> Result<Dataset, AppError> {
    let start = std::time::Instant::now();
    tracing::info!("Loading dataset from {}", source);

    let bytes = match source {
        DatasetSource::Path(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| AppError::DatasetLoad(format!("Failed to read {}: {}", path.display(), e)))?,
        DatasetSource::Url(url) => load_file_from_url(url).await?,
    };

    let dataset = if source.is_xlsx() {
        parse_xlsx(bytes)?
    } else {
        parse_csv(&bytes)?
    };

    tracing::info!(
        "Dataset loaded in {:?}: {} rows x {} columns",
        start.elapsed(),
        dataset.len(),
        dataset.columns().len()
    );
    tracing::info!("Columns: {:?}", dataset.columns());

    Ok(dataset)
}

/// Parses delimited text with a header row, cleaning column names and dropping blank rows.
///
/// Short records are padded with missing values; a record longer than the header is an error.
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset, AppError> {
    let text = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = dedupe_column_names(
        reader
            .headers()?
            .iter()
            .map(clean_column_name)
            .collect(),
    );
    let width = columns.len();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| match e.position() {
            Some(pos) => AppError::MalformedDataset(format!("line {}: {}", pos.line(), e)),
            None => AppError::from(e),
        })?;

        if record.len() > width {
            let line = record.position().map_or(0, |pos| pos.line());
            return Err(AppError::MalformedDataset(format!(
                "line {}: expected {} fields, saw {}",
                line,
                width,
                record.len()
            )));
        }

        let mut row: Vec<Value> = record.iter().map(Value::from_cell).collect();
        row.resize(width, Value::Missing);
        rows.push(row);
    }

    build_dataset(columns, rows)
}

/// Reads the first worksheet; its first row is the header.
pub fn parse_xlsx(bytes: Bytes) -> Result<Dataset, AppError> {
    let cursor = Cursor::new(bytes);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| AppError::DatasetLoad(format!("Failed to open Excel file: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::MalformedDataset("No sheets found in workbook".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AppError::DatasetLoad(format!("Failed to read worksheet {}: {}", sheet_name, e)))?;

    let mut rows = range.rows();
    let columns: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|cell| clean_column_name(&cell.to_string())).collect())
        .ok_or_else(|| AppError::MalformedDataset(format!("Sheet {} is empty", sheet_name)))?;
    let columns = dedupe_column_names(columns);

    let rows = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    build_dataset(columns, rows)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Missing,
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) if is_na_token(s) => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn build_dataset(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Dataset, AppError> {
    let total = rows.len();
    let rows: Vec<Vec<Value>> = rows
        .into_iter()
        .filter(|row| !row.iter().all(Value::is_missing))
        .collect();

    if rows.len() < total {
        tracing::debug!("Dropped {} blank rows", total - rows.len());
    }

    Dataset::new(columns, rows)
}

/// Writes the dataset back out as CSV; missing values become empty cells.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<(), AppError> {
    let io_err = |e: csv::Error| AppError::IoError(e.into());
    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;
    writer.write_record(dataset.columns()).map_err(io_err)?;

    for row in dataset.rows() {
        writer.write_record(row.iter().map(|value| match value {
            Value::Missing => String::new(),
            other => other.to_string(),
        })).map_err(io_err)?;
    }

    writer.flush()?;
    Ok(())
}
