// Loads tidy rows into DuckDB: one fact table keyed by (series_id, date),
// one dimension table keyed by series_id.

use std::collections::{HashMap, HashSet};

use duckdb::{params, Connection};
use log::info;

use crate::errors::EtlError;
use crate::transform::{Observation, SeriesDim};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DimStats {
    pub inserted: usize,
    pub unchanged: usize,
}

/// Provision both tables if absent.  Safe to call on every run.
pub fn ensure_schema(conn: &Connection) -> Result<(), EtlError> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS fact_economic_observations (
    series_id   TEXT NOT NULL,
    series_name TEXT NOT NULL,
    date        DATE NOT NULL,
    value       DOUBLE,
    source      TEXT NOT NULL,
    PRIMARY KEY (series_id, date)
);

CREATE TABLE IF NOT EXISTS dim_series (
    series_id   TEXT PRIMARY KEY,
    series_name TEXT NOT NULL,
    source      TEXT NOT NULL
);
"#,
    )?;
    Ok(())
}

/// Two nulls compare equal; a null never equals a defined number.  Defined
/// numbers tolerate floating-point representation noise.
fn values_equal(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => (x - y).abs() < 1e-9,
        _ => false,
    }
}

/// Merge fact rows into `fact_economic_observations` by primary key.
///
/// Existing `(series_id, date, value)` keys are loaded into memory once;
/// each incoming row is classified as insert (key absent), unchanged (key
/// present, value equal), or update (key present, value differs).  Only new
/// rows are inserted and only changed rows are updated, so unrelated fields
/// of untouched rows are never clobbered.
pub fn upsert_observations(
    conn: &Connection,
    rows: &[Observation],
) -> Result<UpsertStats, EtlError> {
    let mut existing: HashMap<(String, String), Option<f64>> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT series_id, CAST(date AS VARCHAR), value FROM fact_economic_observations",
        )?;
        let entries = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<f64>>(2)?,
            ))
        })?;
        for entry in entries {
            let (series_id, date, value) = entry?;
            existing.insert((series_id, date), value);
        }
    }

    let mut stats = UpsertStats::default();
    let mut to_insert: Vec<&Observation> = Vec::new();
    let mut to_update: Vec<&Observation> = Vec::new();
    for row in rows {
        match existing.get(&(row.series_id.clone(), row.date.to_string())) {
            None => {
                stats.inserted += 1;
                to_insert.push(row);
            }
            Some(current) if values_equal(row.value, *current) => stats.unchanged += 1,
            Some(_) => {
                stats.updated += 1;
                to_update.push(row);
            }
        }
    }

    if !to_insert.is_empty() {
        let mut insert = conn.prepare(
            r#"
INSERT INTO fact_economic_observations (series_id, series_name, date, value, source)
VALUES (?, ?, CAST(? AS DATE), ?, ?)
"#,
        )?;
        for row in &to_insert {
            insert.execute(params![
                row.series_id,
                row.series_name,
                row.date.to_string(),
                row.value,
                row.source.as_str(),
            ])?;
        }
    }

    if !to_update.is_empty() {
        let mut update = conn.prepare(
            r#"
UPDATE fact_economic_observations
SET value = ?, series_name = ?, source = ?
WHERE series_id = ? AND date = CAST(? AS DATE)
"#,
        )?;
        for row in &to_update {
            update.execute(params![
                row.value,
                row.series_name,
                row.source.as_str(),
                row.series_id,
                row.date.to_string(),
            ])?;
        }
    }

    info!(
        "fact_economic_observations: {} inserted, {} updated, {} unchanged",
        stats.inserted, stats.updated, stats.unchanged
    );
    Ok(stats)
}

/// Merge dimension rows into `dim_series`.  First write wins: a series_id
/// already present is never modified, whatever name the new row carries.
pub fn upsert_dim_series(conn: &Connection, rows: &[SeriesDim]) -> Result<DimStats, EtlError> {
    let mut existing: HashSet<String> = HashSet::new();
    {
        let mut stmt = conn.prepare("SELECT series_id FROM dim_series")?;
        let ids = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for id in ids {
            existing.insert(id?);
        }
    }

    let mut stats = DimStats::default();
    let mut insert =
        conn.prepare("INSERT INTO dim_series (series_id, series_name, source) VALUES (?, ?, ?)")?;
    for row in rows {
        if existing.contains(&row.series_id) {
            stats.unchanged += 1;
            continue;
        }
        insert.execute(params![row.series_id, row.series_name, row.source.as_str()])?;
        stats.inserted += 1;
    }

    info!(
        "dim_series: {} inserted, {} unchanged",
        stats.inserted, stats.unchanged
    );
    Ok(stats)
}
