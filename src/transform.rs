// Raw API payloads -> tidy rows, one common shape for both sources:
// (series_id, series_name, date, value, source).

use std::fmt;

use jiff::civil::Date;
use serde_json::Value;

use crate::errors::EtlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Fred,
    Bls,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Fred => "FRED",
            Source::Bls => "BLS",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One fact row.  `(series_id, date)` identifies the row; a missing value is
/// `None` and stays a true null all the way into storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub series_id: String,
    pub series_name: String,
    pub date: Date,
    pub value: Option<f64>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDim {
    pub series_id: String,
    pub series_name: String,
    pub source: Source,
}

/// Project a raw FRED response into tidy rows.
///
/// Only `date`/`value` are taken from each observation; envelope fields
/// (realtime_start, limit, ...) are ignored.  FRED encodes a missing value
/// as the string `"."`, which becomes `None`.
pub fn parse_fred_observations(
    payload: &Value,
    series_id: &str,
    series_name: &str,
) -> Result<Vec<Observation>, EtlError> {
    let observations = payload
        .get("observations")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            EtlError::Validation(format!(
                "malformed FRED response for {}: missing 'observations'",
                series_id
            ))
        })?;

    let mut rows = Vec::with_capacity(observations.len());
    for obs in observations {
        let date_str = obs.get("date").and_then(Value::as_str).ok_or_else(|| {
            EtlError::Validation(format!("FRED observation without 'date' for {}", series_id))
        })?;
        let date: Date = date_str.parse().map_err(|_| {
            EtlError::Validation(format!("bad FRED observation date '{}'", date_str))
        })?;
        let raw = obs.get("value").and_then(Value::as_str).ok_or_else(|| {
            EtlError::Validation(format!(
                "FRED observation without 'value' for {}",
                series_id
            ))
        })?;
        let value = if raw == "." {
            None
        } else {
            Some(raw.parse::<f64>().map_err(|_| {
                EtlError::Validation(format!("bad FRED observation value '{}'", raw))
            })?)
        };
        rows.push(Observation {
            series_id: series_id.to_string(),
            series_name: series_name.to_string(),
            date,
            value,
            source: Source::Fred,
        });
    }
    Ok(rows)
}

/// Flatten a raw BLS batch response into tidy rows.
///
/// Each observation's `period` (`M01`..`M12`) is combined with `year` into a
/// first-of-month date.  Series names come from reverse lookup of the
/// technical id in `series_map`, falling back to the id itself.  BLS returns
/// data most-recent-first per series; the output is globally re-sorted
/// oldest-first.
pub fn parse_bls_batch(
    payload: &Value,
    series_map: &[(String, String)],
) -> Result<Vec<Observation>, EtlError> {
    let series = payload
        .pointer("/Results/series")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            EtlError::Validation("malformed BLS response: missing 'Results.series'".to_string())
        })?;

    let mut rows = Vec::new();
    for entry in series {
        let series_id = entry
            .get("seriesID")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EtlError::Validation("BLS series without 'seriesID'".to_string())
            })?;
        let series_name = series_map
            .iter()
            .find(|(_, id)| id == series_id)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| series_id.to_string());
        let data = entry.get("data").and_then(Value::as_array).ok_or_else(|| {
            EtlError::Validation(format!("BLS series {} without 'data'", series_id))
        })?;
        for obs in data {
            rows.push(Observation {
                series_id: series_id.to_string(),
                series_name: series_name.clone(),
                date: bls_observation_date(obs, series_id)?,
                value: Some(bls_observation_value(obs, series_id)?),
                source: Source::Bls,
            });
        }
    }

    rows.sort_by_key(|row| row.date);
    Ok(rows)
}

fn bls_observation_date(obs: &Value, series_id: &str) -> Result<Date, EtlError> {
    let year: i16 = obs
        .get("year")
        .and_then(Value::as_str)
        .and_then(|y| y.parse().ok())
        .ok_or_else(|| {
            EtlError::Validation(format!("bad BLS observation year for {}", series_id))
        })?;
    let period = obs
        .get("period")
        .and_then(Value::as_str)
        .unwrap_or_default();
    // monthly periods only; M13 annual averages and Q/S codes are rejected
    let month: i8 = period
        .strip_prefix('M')
        .and_then(|m| m.parse().ok())
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| {
            EtlError::Validation(format!(
                "unsupported BLS period '{}' for {}",
                period, series_id
            ))
        })?;
    Date::new(year, month, 1)
        .map_err(|_| EtlError::Validation(format!("bad BLS date {}-{:02}", year, month)))
}

fn bls_observation_value(obs: &Value, series_id: &str) -> Result<f64, EtlError> {
    match obs.get("value") {
        Some(Value::String(s)) => s.parse().map_err(|_| {
            EtlError::Validation(format!("bad BLS observation value '{}' for {}", s, series_id))
        }),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            EtlError::Validation(format!("bad BLS observation value for {}", series_id))
        }),
        _ => Err(EtlError::Validation(format!(
            "BLS observation without 'value' for {}",
            series_id
        ))),
    }
}

/// One dimension row per configured series, map iteration order preserved,
/// FRED rows before BLS rows.
pub fn build_dim_series(
    fred_series: &[(String, String)],
    bls_series: &[(String, String)],
) -> Vec<SeriesDim> {
    let tag = |series: &[(String, String)], source: Source| {
        series
            .iter()
            .map(|(name, id)| SeriesDim {
                series_id: id.clone(),
                series_name: name.clone(),
                source,
            })
            .collect::<Vec<_>>()
    };
    let mut rows = tag(fred_series, Source::Fred);
    rows.extend(tag(bls_series, Source::Bls));
    rows
}

/// Union all per-series FRED tables with the BLS table and sort ascending by
/// date.  The sort is stable, so rows with equal dates keep concatenation
/// order.
pub fn combine_fact_tables(
    fred_tables: Vec<Vec<Observation>>,
    bls_table: Vec<Observation>,
) -> Vec<Observation> {
    let mut rows: Vec<Observation> = fred_tables
        .into_iter()
        .flatten()
        .chain(bls_table)
        .collect();
    rows.sort_by_key(|row| row.date);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use serde_json::json;

    fn raw_fred() -> Value {
        json!({
            "realtime_start": "2024-03-01",
            "realtime_end": "2024-03-01",
            "output_type": 1,
            "limit": 100000,
            "observations": [
                {"realtime_start": "2024-03-01", "date": "2024-01-01", "value": "5.0"},
                {"realtime_start": "2024-03-01", "date": "2024-02-01", "value": "."},
                {"realtime_start": "2024-03-01", "date": "2024-03-01", "value": "5.1"},
            ],
        })
    }

    // two series, three observations each, most-recent-first per series
    fn raw_bls() -> Value {
        json!({
            "status": "REQUEST_SUCCEEDED",
            "Results": {
                "series": [
                    {"seriesID": "CUUR0000SA0", "data": [
                        {"year": "2024", "period": "M03", "value": "312.3"},
                        {"year": "2024", "period": "M02", "value": "311.1"},
                        {"year": "2024", "period": "M01", "value": "309.7"},
                    ]},
                    {"seriesID": "CES0500000003", "data": [
                        {"year": "2024", "period": "M03", "value": "34.7"},
                        {"year": "2024", "period": "M02", "value": "34.6"},
                        {"year": "2024", "period": "M01", "value": "34.5"},
                    ]},
                ],
            },
        })
    }

    fn bls_series_map() -> Vec<(String, String)> {
        vec![
            ("CPI_URBAN".to_string(), "CUUR0000SA0".to_string()),
            ("AVG_WAGES".to_string(), "CES0500000003".to_string()),
        ]
    }

    #[test]
    fn fred_one_row_per_observation() -> Result<(), EtlError> {
        let rows = parse_fred_observations(&raw_fred(), "UNRATE", "UNRATE")?;
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.series_id == "UNRATE"));
        assert!(rows.iter().all(|r| r.source == Source::Fred));
        Ok(())
    }

    #[test]
    fn fred_missing_value_dot_becomes_none() -> Result<(), EtlError> {
        let rows = parse_fred_observations(&raw_fred(), "UNRATE", "UNRATE")?;
        let feb = rows.iter().find(|r| r.date == date(2024, 2, 1)).unwrap();
        assert_eq!(feb.value, None);
        let jan = rows.iter().find(|r| r.date == date(2024, 1, 1)).unwrap();
        assert_eq!(jan.value, Some(5.0));
        Ok(())
    }

    #[test]
    fn fred_display_name_attached_to_every_row() -> Result<(), EtlError> {
        let rows = parse_fred_observations(&raw_fred(), "PCEC", "PCE_NOMINAL")?;
        assert!(rows.iter().all(|r| r.series_name == "PCE_NOMINAL"));
        Ok(())
    }

    #[test]
    fn fred_missing_observations_is_validation_error() {
        let result = parse_fred_observations(&json!({"error": "x"}), "UNRATE", "UNRATE");
        assert!(matches!(result, Err(EtlError::Validation(_))));
    }

    #[test]
    fn bls_flattens_both_series() -> Result<(), EtlError> {
        let rows = parse_bls_batch(&raw_bls(), &bls_series_map())?;
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.source == Source::Bls));
        Ok(())
    }

    #[test]
    fn bls_date_built_from_year_and_period() -> Result<(), EtlError> {
        let rows = parse_bls_batch(&raw_bls(), &bls_series_map())?;
        let jan = rows
            .iter()
            .filter(|r| r.series_id == "CUUR0000SA0")
            .min_by_key(|r| r.date)
            .unwrap();
        assert_eq!(jan.date, date(2024, 1, 1));
        Ok(())
    }

    #[test]
    fn bls_name_from_reverse_lookup_with_id_fallback() -> Result<(), EtlError> {
        let rows = parse_bls_batch(&raw_bls(), &bls_series_map())?;
        assert!(rows
            .iter()
            .filter(|r| r.series_id == "CUUR0000SA0")
            .all(|r| r.series_name == "CPI_URBAN"));

        let unmapped = parse_bls_batch(&raw_bls(), &[])?;
        assert!(unmapped
            .iter()
            .filter(|r| r.series_id == "CUUR0000SA0")
            .all(|r| r.series_name == "CUUR0000SA0"));
        Ok(())
    }

    #[test]
    fn bls_output_globally_sorted_oldest_first() -> Result<(), EtlError> {
        let rows = parse_bls_batch(&raw_bls(), &bls_series_map())?;
        let dates: Vec<Date> = rows.iter().map(|r| r.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        Ok(())
    }

    #[test]
    fn bls_annual_average_period_is_rejected() {
        let payload = json!({
            "status": "REQUEST_SUCCEEDED",
            "Results": {"series": [
                {"seriesID": "CUUR0000SA0", "data": [
                    {"year": "2024", "period": "M13", "value": "311.0"},
                ]},
            ]},
        });
        let result = parse_bls_batch(&payload, &bls_series_map());
        assert!(matches!(result, Err(EtlError::Validation(_))));
    }

    #[test]
    fn dim_series_fred_rows_before_bls_rows() {
        let fred = vec![
            ("UNRATE".to_string(), "UNRATE".to_string()),
            ("PCE_NOMINAL".to_string(), "PCEC".to_string()),
        ];
        let rows = build_dim_series(&fred, &bls_series_map());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].series_id, "UNRATE");
        assert_eq!(rows[1].series_name, "PCE_NOMINAL");
        assert_eq!(rows[1].source, Source::Fred);
        assert_eq!(rows[2].series_id, "CUUR0000SA0");
        assert_eq!(rows[3].source, Source::Bls);
    }

    #[test]
    fn combine_unions_and_sorts_ascending() -> Result<(), EtlError> {
        let fred = parse_fred_observations(&raw_fred(), "UNRATE", "UNRATE")?;
        let bls = parse_bls_batch(&raw_bls(), &bls_series_map())?;
        let n = fred.len() + bls.len();

        let combined = combine_fact_tables(vec![fred], bls);
        assert_eq!(combined.len(), n);
        let dates: Vec<Date> = combined.iter().map(|r| r.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        Ok(())
    }

    #[test]
    fn combine_accepts_multiple_fred_tables_and_empty_bls() -> Result<(), EtlError> {
        let t1 = parse_fred_observations(&raw_fred(), "UNRATE", "UNRATE")?;
        let t2 = parse_fred_observations(&raw_fred(), "FEDFUNDS", "MONEY_COST")?;
        let n = t1.len() + t2.len();
        let combined = combine_fact_tables(vec![t1, t2], Vec::new());
        assert_eq!(combined.len(), n);
        Ok(())
    }

    #[test]
    fn combine_is_stable_for_equal_dates() {
        let row = |id: &str| Observation {
            series_id: id.to_string(),
            series_name: id.to_string(),
            date: date(2024, 1, 1),
            value: Some(1.0),
            source: Source::Fred,
        };
        let combined = combine_fact_tables(vec![vec![row("A")], vec![row("B")]], Vec::new());
        assert_eq!(combined[0].series_id, "A");
        assert_eq!(combined[1].series_id, "B");
    }
}
