use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::AppError;
use crate::services::utils::render_table;

/// Cell texts read as missing, matching the common spreadsheet and pandas NA spellings.
pub const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single cell of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

impl Value {
    /// Types a raw CSV cell: empty or an NA token is missing, a finite float is a number,
    /// anything else stays text.
    pub fn from_cell(raw: &str) -> Self {
        if is_na_token(raw) {
            return Value::Missing;
        }
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Value::Missing => None,
        }
    }
}

/// Exact match only; `" NA"` stays text.
pub fn is_na_token(raw: &str) -> bool {
    raw.is_empty() || NA_TOKENS.contains(&raw)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str("nan"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Missing => serializer.serialize_none(),
        }
    }
}

/// Rows of named, ordered columns. Every row has exactly one value per column.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, AppError> {
        if columns.is_empty() {
            return Err(AppError::MalformedDataset("dataset has no columns".to_string()));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(AppError::MalformedDataset(format!("duplicate column name '{}'", dup)));
        }

        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(AppError::MalformedDataset(format!(
                "row {} has {} values, expected {}",
                idx + 1,
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Builds a dataset from raw text cells, typing each one with [`Value::from_cell`].
    pub fn from_cells<S: AsRef<str>>(columns: &[S], rows: &[Vec<S>]) -> Result<Self, AppError> {
        let columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| Value::from_cell(cell.as_ref())).collect())
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Keeps the rows for which `keep` returns true, preserving order and columns.
    pub fn filter_rows<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&[Value]) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| keep(row.as_slice())).cloned().collect(),
        }
    }

    /// Plain-text grid of the first `limit` rows with a positional index column.
    pub fn head_table(&self, limit: usize) -> String {
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .take(limit)
            .map(|row| row.iter().map(Value::to_string).collect())
            .collect();
        let index: Vec<String> = (0..rows.len()).map(|i| i.to_string()).collect();
        render_table(&self.columns, &index, &rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Chat history owned by the caller and passed in explicitly with each request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) {
        self.turns.push(ChatTurn { role, content: content.into() });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    #[default]
    Standard,
    Predictive,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Standard => f.write_str("Standard Analysis"),
            AnalysisMode::Predictive => f.write_str("Predictive Modeling"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_typed_on_load() {
        assert_eq!(Value::from_cell(""), Value::Missing);
        assert_eq!(Value::from_cell("2019"), Value::Number(2019.0));
        assert_eq!(Value::from_cell(" gujarat "), Value::Text(" gujarat ".to_string()));
        assert_eq!(Value::from_cell("nan"), Value::Missing);
    }

    #[test]
    fn na_tokens_are_missing_only_on_exact_match() {
        for token in ["NA", "N/A", "#N/A", "null", "NULL", "None", "NaN", "<NA>"] {
            assert_eq!(Value::from_cell(token), Value::Missing, "{}", token);
        }
        assert_eq!(Value::from_cell(" NA"), Value::Text(" NA".to_string()));
        assert_eq!(Value::from_cell("Nagpur"), Value::Text("Nagpur".to_string()));
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Value::Number(2019.0).to_string(), "2019");
        assert_eq!(Value::Number(7.25).to_string(), "7.25");
        assert_eq!(Value::Missing.to_string(), "nan");
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Dataset::from_cells(&["a", "b"], &[vec!["1", "2"], vec!["3"]]).unwrap_err();
        assert!(matches!(err, AppError::MalformedDataset(_)));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = Dataset::from_cells(&["a", "a"], &[vec!["1", "2"]]).unwrap_err();
        assert!(err.to_string().contains("duplicate column name 'a'"));
    }

    #[test]
    fn head_table_aligns_columns() {
        let ds = Dataset::from_cells(&["DISTRICT", "pH"], &[vec!["Surat", "7.5"], vec!["Rajkot", "8"]]).unwrap();
        let expected = "   DISTRICT   pH\n0     Surat  7.5\n1    Rajkot    8";
        assert_eq!(ds.head_table(3), expected);
    }

    #[test]
    fn transcript_serializes_as_plain_list() {
        let mut transcript = Transcript::new();
        transcript.push(ChatRole::User, "hi");
        let json = serde_json::to_value(&transcript).unwrap();
        assert_eq!(json, serde_json::json!([{"role": "user", "content": "hi"}]));
    }
}
