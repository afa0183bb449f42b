//! Heuristic dataset summary used as LLM prompt context.
//!
//! Columns are mapped to semantic roles by case-insensitive substring match on
//! their names. The first matching column in declaration order wins each role.
//! A role with no matching column degrades its aggregate to zero or
//! [`YearRange::Unavailable`] rather than failing.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::models::{Dataset, Value};

pub const STATE_FRAGMENTS: &[&str] = &["state", "stn_name"];
pub const DISTRICT_FRAGMENTS: &[&str] = &["district", "location"];
pub const YEAR_FRAGMENTS: &[&str] = &["year", "date", "yr"];

pub const SAMPLE_ROWS: usize = 3;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnRole {
    State,
    District,
    Year,
    Unmapped,
}

impl ColumnRole {
    pub fn fragments(self) -> &'static [&'static str] {
        match self {
            ColumnRole::State => STATE_FRAGMENTS,
            ColumnRole::District => DISTRICT_FRAGMENTS,
            ColumnRole::Year => YEAR_FRAGMENTS,
            ColumnRole::Unmapped => &[],
        }
    }
}

/// Columns resolved for each role, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleColumns {
    pub state: Option<String>,
    pub district: Option<String>,
    pub year: Option<String>,
}

impl RoleColumns {
    pub fn detect(columns: &[String]) -> Self {
        Self {
            state: detect_column(columns, ColumnRole::State.fragments()).map(str::to_string),
            district: detect_column(columns, ColumnRole::District.fragments()).map(str::to_string),
            year: detect_column(columns, ColumnRole::Year.fragments()).map(str::to_string),
        }
    }

    /// Role of a column. A column that resolves to several roles reports the first of State, District, Year.
    pub fn role_of(&self, column: &str) -> ColumnRole {
        let is = |slot: &Option<String>| slot.as_deref() == Some(column);
        if is(&self.state) {
            ColumnRole::State
        } else if is(&self.district) {
            ColumnRole::District
        } else if is(&self.year) {
            ColumnRole::Year
        } else {
            ColumnRole::Unmapped
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearRange {
    Available { min: i64, max: i64 },
    Unavailable,
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearRange::Available { min, max } => write!(f, "{}-{}", min, max),
            YearRange::Unavailable => f.write_str("N/A-N/A"),
        }
    }
}

impl Serialize for YearRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            YearRange::Available { min, max } => [min, max].serialize(serializer),
            YearRange::Unavailable => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub row_count: usize,
    pub column_names: Vec<String>,
    pub state_count: usize,
    pub district_count: usize,
    pub year_range: YearRange,
    pub sample_rows: String,
    pub roles: RoleColumns,
}

impl Summary {
    /// The fixed-format summary block handed to the model.
    pub fn render(&self) -> String {
        format!(
            r#"
    Loaded groundwater quality dataset with {} samples.

    Columns: {}

    Coverage:
    - States: {}
    - Districts: {}
    - Years: {}

    Sample data:
    {}
    "#,
            self.row_count,
            self.column_names.join(", "),
            self.state_count,
            self.district_count,
            self.year_range,
            self.sample_rows
        )
    }
}

/// First column (in order) whose lowercased name contains any of `fragments`.
pub fn detect_column<'a>(columns: &'a [String], fragments: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .find(|name| {
            let lower = name.to_lowercase();
            fragments.iter().any(|fragment| lower.contains(fragment))
        })
        .map(String::as_str)
}

/// Trims, collapses whitespace runs to one space and title-cases each value. Missing renders as "nan" first.
pub fn normalize_text<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Value>,
{
    values
        .into_iter()
        .map(|value| normalize_one(&value.to_string()))
        .collect()
}

fn normalize_one(raw: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(raw.trim(), " ");
    title_case(&collapsed)
}

/// Uppercases a letter that follows a non-letter and lowercases every other letter.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

/// Parses each value as a number; anything that fails becomes `None`.
pub fn normalize_year<'a, I>(values: I) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = &'a Value>,
{
    values.into_iter().map(Value::as_f64).collect()
}

pub fn year_range(years: &[Option<f64>]) -> YearRange {
    let mut parsed = years.iter().flatten().copied();
    match parsed.next() {
        None => YearRange::Unavailable,
        Some(first) => {
            let (min, max) = parsed.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
            YearRange::Available { min: min as i64, max: max as i64 }
        }
    }
}

fn distinct_normalized(dataset: &Dataset, column: Option<&str>) -> usize {
    column
        .and_then(|name| dataset.column_values(name))
        .map(|values| normalize_text(values).into_iter().collect::<HashSet<_>>().len())
        .unwrap_or(0)
}

pub fn summarize(dataset: &Dataset) -> Summary {
    let roles = RoleColumns::detect(dataset.columns());
    tracing::debug!("Detected column roles: {:?}", roles);

    let state_count = distinct_normalized(dataset, roles.state.as_deref());
    let district_count = distinct_normalized(dataset, roles.district.as_deref());

    let years = roles
        .year
        .as_deref()
        .and_then(|name| dataset.column_values(name))
        .map(|values| year_range(&normalize_year(values)))
        .unwrap_or(YearRange::Unavailable);

    Summary {
        row_count: dataset.len(),
        column_names: dataset.columns().to_vec(),
        state_count,
        district_count,
        year_range: years,
        sample_rows: dataset.head_table(SAMPLE_ROWS),
        roles,
    }
}

/// First whitespace-delimited token of `user_text` that equals a known district, ignoring case.
///
/// Matching is per token, so a district whose name contains a space is never found.
pub fn find_mentioned_district<S: AsRef<str>>(user_text: &str, districts: &[S]) -> Option<String> {
    let known: HashSet<String> = districts
        .iter()
        .map(|d| d.as_ref().to_lowercase())
        .collect();

    user_text
        .split_whitespace()
        .find(|token| known.contains(&token.to_lowercase()))
        .map(str::to_string)
}

/// Distinct raw values of the detected district column, in first-seen order.
pub fn district_names(dataset: &Dataset, roles: &RoleColumns) -> Vec<String> {
    let Some(values) = roles.district.as_deref().and_then(|name| dataset.column_values(name)) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(Value::to_string)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
