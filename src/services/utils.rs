use std::borrow::Cow;
use std::collections::HashSet;
use bytes::Bytes;
use encoding_rs::WINDOWS_1252;
use reqwest::Client;
use crate::error::AppError;

/// Strips embedded line breaks and surrounding whitespace from a header cell.
pub fn clean_column_name(name: &str) -> String {
    name.replace(['\r', '\n'], "").trim().to_string()
}

/// Renames repeated header names to `name.1`, `name.2`, ... skipping suffixes already taken.
pub fn dedupe_column_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut seen = HashSet::new();

    names
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let renamed = (1..)
                .map(|n| format!("{}.{}", name, n))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_default();
            tracing::debug!("Renamed duplicate column {} to {}", name, renamed);
            taken.insert(renamed.clone());
            seen.insert(renamed.clone());
            renamed
        })
        .collect()
}

/// Decodes file bytes as UTF-8 when valid, otherwise as latin-1 (Windows-1252). Never fails.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
        Err(_) => {
            tracing::info!("Input is not valid UTF-8, decoding as latin-1");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}

/// Runs CPU-bound work on the blocking pool so request workers stay free.
pub async fn run_blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Internal(format!("Background task failed: {}", e)))
}

pub async fn load_file_from_url(url: &str) -> Result<Bytes, AppError> {
    let client = Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::DatasetLoad(format!("Failed to fetch {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AppError::DatasetLoad(
            format!("Failed to fetch {}. Status: {}", url, response.status())
        ));
    }

    response
        .bytes()
        .await
        .map_err(|e| AppError::DatasetLoad(format!("Failed to read response bytes: {}", e)))
}

/// Renders a right-aligned text grid with a left-aligned index column.
///
/// With no rows the output names the columns and an empty index instead.
pub fn render_table(header: &[String], index: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return format!("Empty DataFrame\nColumns: [{}]\nIndex: []", header.join(", "));
    }

    let index_width = index.iter().map(|i| i.chars().count()).max().unwrap_or(0);
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(col, name)| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);

    let mut line = " ".repeat(index_width);
    for (name, width) in header.iter().zip(&widths) {
        line.push_str(&format!("  {:>width$}", name, width = width));
    }
    lines.push(line);

    for (label, row) in index.iter().zip(rows) {
        let mut line = format!("{:<width$}", label, width = index_width);
        for (cell, width) in row.iter().zip(&widths) {
            line.push_str(&format!("  {:>width$}", cell, width = width));
        }
        lines.push(line);
    }

    lines.join("\n")
}
