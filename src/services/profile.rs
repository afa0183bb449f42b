use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use smallvec::SmallVec;

use crate::error::AppError;
use crate::models::{Dataset, Value};
use super::summarizer::{ColumnRole, RoleColumns};
use super::utils::{render_table, run_blocking};

pub const SAMPLE_SIZE: usize = 3;
pub const SCATTER_LIMIT: usize = 1000;

const NOT_APPLICABLE: &str = "NaN";

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub role: ColumnRole,
    pub data_type: &'static str,
    pub count: usize,
    pub missing: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
}

pub fn profile_column(name: &str, role: ColumnRole, values: &[&Value]) -> ColumnProfile {
    let mut sample_values = SmallVec::<[String; SAMPLE_SIZE]>::new();
    values
        .iter()
        .take(SAMPLE_SIZE)
        .for_each(|value| sample_values.push(value.to_string()));

    // value -> (occurrences, first position), so ties on `top` go to the earliest value
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut missing = 0;
    let mut numbers = Vec::new();
    let mut all_numeric = true;

    for (pos, value) in values.iter().enumerate() {
        match value {
            Value::Missing => {
                missing += 1;
                continue;
            }
            Value::Number(n) => numbers.push(*n),
            Value::Text(_) => all_numeric = false,
        }
        counts.entry(value.to_string()).or_insert((0, pos)).0 += 1;
    }

    let count = values.len() - missing;
    let top = counts
        .iter()
        .max_by(|(_, a), (_, b)| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(value, (freq, _))| (value.clone(), *freq));

    let (mean, min, max) = if numbers.is_empty() {
        (None, None, None)
    } else {
        let sum: f64 = numbers.iter().sum();
        (
            Some(sum / numbers.len() as f64),
            numbers.iter().copied().reduce(f64::min),
            numbers.iter().copied().reduce(f64::max),
        )
    };

    let data_type = if count == 0 {
        "empty"
    } else if all_numeric {
        "numeric"
    } else {
        "text"
    };

    ColumnProfile {
        name: name.to_string(),
        role,
        data_type,
        count,
        missing,
        unique: counts.len(),
        freq: top.as_ref().map_or(0, |(_, freq)| *freq),
        top: top.map(|(value, _)| value),
        mean,
        min,
        max,
        sample_values,
    }
}

/// Profiles every column in parallel, keeping column order.
pub fn describe(dataset: &Dataset) -> Vec<ColumnProfile> {
    let roles = RoleColumns::detect(dataset.columns());
    dataset
        .columns()
        .par_iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<&Value> = dataset.rows().iter().map(|row| &row[idx]).collect();
            profile_column(name, roles.role_of(name), &values)
        })
        .collect()
}

/// [`describe`] on the blocking pool, for use from request handlers.
pub async fn describe_shared(dataset: Arc<Dataset>) -> Result<Vec<ColumnProfile>, AppError> {
    run_blocking(move || describe(&dataset)).await
}

/// Statistics as rows, columns as columns.
pub fn render_describe(profiles: &[ColumnProfile]) -> String {
    let header: Vec<String> = profiles.iter().map(|p| p.name.clone()).collect();
    let stat = |v: Option<f64>| v.map_or_else(|| NOT_APPLICABLE.to_string(), |n| Value::Number(n).to_string());

    let rows: Vec<(&str, Vec<String>)> = vec![
        ("count", profiles.iter().map(|p| p.count.to_string()).collect()),
        ("unique", profiles.iter().map(|p| p.unique.to_string()).collect()),
        ("top", profiles.iter().map(|p| p.top.clone().unwrap_or_else(|| NOT_APPLICABLE.to_string())).collect()),
        ("freq", profiles.iter().map(|p| if p.top.is_some() { p.freq.to_string() } else { NOT_APPLICABLE.to_string() }).collect()),
        ("mean", profiles.iter().map(|p| stat(p.mean)).collect()),
        ("min", profiles.iter().map(|p| stat(p.min)).collect()),
        ("max", profiles.iter().map(|p| stat(p.max)).collect()),
    ];

    let index: Vec<String> = rows.iter().map(|(label, _)| label.to_string()).collect();
    let cells: Vec<Vec<String>> = rows.into_iter().map(|(_, cells)| cells).collect();
    render_table(&header, &index, &cells)
}

/// Columns whose non-missing values are all numbers, with at least one present.
pub fn numeric_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            let mut present = dataset.rows().iter().map(|row| &row[*idx]).filter(|v| !v.is_missing()).peekable();
            present.peek().is_some() && present.all(|v| matches!(v, Value::Number(_)))
        })
        .map(|(_, name)| name.clone())
        .collect()
}

/// Rows whose raw value in `column` equals `district`, ignoring case. Missing values never match.
pub fn filter_by_district(dataset: &Dataset, column: &str, district: &str) -> Dataset {
    let Some(idx) = dataset.column_index(column) else {
        return dataset.filter_rows(|_| false);
    };
    let wanted = district.to_lowercase();
    dataset.filter_rows(|row| !row[idx].is_missing() && row[idx].to_string().to_lowercase() == wanted)
}

#[derive(Debug, Clone, Serialize)]
pub struct Scatter {
    pub x_column: String,
    pub y_column: String,
    pub points: Vec<[f64; 2]>,
}

/// Headline dashboard metrics, optionally narrowed to one district.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub selected_district: Option<String>,
    pub data_points: usize,
    pub districts: usize,
    pub coverage_pct: u32,
    pub numeric_columns: Vec<String>,
    pub scatter: Option<Scatter>,
}

pub fn overview(dataset: &Dataset, district: Option<&str>) -> Overview {
    let roles = RoleColumns::detect(dataset.columns());
    let district_col = roles.district.as_deref();

    // A filter only applies when there is a district column to filter on.
    let selected = district_col.zip(district.map(str::trim).filter(|d| !d.is_empty()));
    let filtered = match selected {
        Some((column, name)) => filter_by_district(dataset, column, name),
        None => dataset.clone(),
    };

    let districts = match (district_col, selected) {
        (Some(column), None) => dataset
            .column_values(column)
            .map(|values| {
                values
                    .into_iter()
                    .filter(|v| !v.is_missing())
                    .map(Value::to_string)
                    .collect::<HashSet<_>>()
                    .len()
            })
            .unwrap_or(0),
        _ => 1,
    };

    let coverage_pct = if dataset.is_empty() {
        0
    } else {
        ((filtered.len() * 100 / dataset.len()).min(100)) as u32
    };

    let numeric = numeric_columns(&filtered);
    let scatter = match numeric.as_slice() {
        [x, y, ..] => Some(scatter_points(&filtered, x, y)),
        _ => None,
    };

    Overview {
        selected_district: selected.map(|(_, name)| name.to_string()),
        data_points: filtered.len(),
        districts,
        coverage_pct,
        numeric_columns: numeric,
        scatter,
    }
}

fn scatter_points(dataset: &Dataset, x: &str, y: &str) -> Scatter {
    let points = match (dataset.column_index(x), dataset.column_index(y)) {
        (Some(xi), Some(yi)) => dataset
            .rows()
            .iter()
            .take(SCATTER_LIMIT)
            .filter_map(|row| Some([row[xi].as_f64()?, row[yi].as_f64()?]))
            .collect(),
        _ => Vec::new(),
    };

    Scatter {
        x_column: x.to_string(),
        y_column: y.to_string(),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wells() -> Dataset {
        Dataset::from_cells(
            &["STATE", "DISTRICT", "pH", "TDS"],
            &[
                vec!["Gujarat", "Surat", "7.5", "410"],
                vec!["Gujarat", "surat", "8.1", ""],
                vec!["Gujarat", "Rajkot", "7.9", "980"],
                vec!["Gujarat", "", "8.3", "620"],
            ],
        )
        .unwrap()
    }

    #[test]
    fn profile_counts_and_numeric_stats() {
        let profiles = describe(&wells());
        let tds = &profiles[3];
        assert_eq!(tds.name, "TDS");
        assert_eq!(tds.data_type, "numeric");
        assert_eq!(tds.count, 3);
        assert_eq!(tds.missing, 1);
        assert_eq!(tds.min, Some(410.0));
        assert_eq!(tds.max, Some(980.0));
        assert_eq!(tds.mean, Some(670.0));

        let state = &profiles[0];
        assert_eq!(state.role, ColumnRole::State);
        assert_eq!(state.data_type, "text");
        assert_eq!(state.top.as_deref(), Some("Gujarat"));
        assert_eq!(state.freq, 4);
        assert_eq!(state.mean, None);
    }

    #[test]
    fn top_ties_go_to_first_seen() {
        let values = [Value::Text("b".into()), Value::Text("a".into()), Value::Text("a".into()), Value::Text("b".into())];
        let refs: Vec<&Value> = values.iter().collect();
        let profile = profile_column("x", ColumnRole::Unmapped, &refs);
        assert_eq!(profile.top.as_deref(), Some("b"));
        assert_eq!(profile.freq, 2);
        assert_eq!(profile.sample_values.as_slice(), ["b", "a", "a"]);
    }

    #[test]
    fn describe_table_lists_stats_as_rows() {
        let table = render_describe(&describe(&wells()));
        let labels: Vec<&str> = table.lines().skip(1).map(|l| l.split_whitespace().next().unwrap_or("")).collect();
        assert_eq!(labels, ["count", "unique", "top", "freq", "mean", "min", "max"]);
    }

    #[test]
    fn overview_without_filter_counts_distinct_raw_districts() {
        let o = overview(&wells(), None);
        assert_eq!(o.data_points, 4);
        assert_eq!(o.districts, 3);
        assert_eq!(o.coverage_pct, 100);
        assert_eq!(o.numeric_columns, ["pH", "TDS"]);
        let scatter = o.scatter.unwrap();
        assert_eq!(scatter.points, [[7.5, 410.0], [7.9, 980.0], [8.3, 620.0]]);
    }

    #[test]
    fn district_filter_is_case_insensitive() {
        let o = overview(&wells(), Some("SURAT"));
        assert_eq!(o.selected_district.as_deref(), Some("SURAT"));
        assert_eq!(o.data_points, 2);
        assert_eq!(o.districts, 1);
        assert_eq!(o.coverage_pct, 50);
    }

    #[test]
    fn filter_is_ignored_without_district_column() {
        let ds = Dataset::from_cells(&["pH"], &[vec!["7"], vec!["8"]]).unwrap();
        let o = overview(&ds, Some("Surat"));
        assert_eq!(o.selected_district, None);
        assert_eq!(o.data_points, 2);
        assert_eq!(o.districts, 1);
        assert!(o.scatter.is_none());
    }

    #[test]
    fn empty_dataset_has_zero_coverage() {
        let ds = Dataset::from_cells::<&str>(&["DISTRICT"], &[]).unwrap();
        let o = overview(&ds, None);
        assert_eq!(o.coverage_pct, 0);
        assert_eq!(o.districts, 0);
    }
}
