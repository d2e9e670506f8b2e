// Observations for a single FRED series.
// https://fred.stlouisfed.org/docs/api/fred/series_observations.html

use std::fs::{self, File};
use std::path::Path;

use jiff::civil::Date;
use jiff::{Timestamp, Zoned};
use log::info;
use reqwest::{blocking::Client, StatusCode};
use serde_json::Value;

use crate::db::metadata::{read_metadata, write_metadata, SeriesMetadata};
use crate::db::FetchOutcome;
use crate::errors::EtlError;
use crate::fingerprint::fingerprint;
use crate::retry::with_retry;

const FRED_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

#[derive(Clone)]
pub struct FredObservationsArchive {
    pub api_key: Option<String>,
    pub base_dir: String,
}

impl FredObservationsArchive {
    /// Return the json snapshot filename for the day.  Does not check if the
    /// file exists.  Attempts on the same calendar day overwrite the same
    /// file, so revisions are picked up at most once per day.
    pub fn filename(&self, series_id: &str, day: &Date) -> String {
        self.base_dir.to_owned()
            + "/Raw/FRED_"
            + series_id
            + "_"
            + &day.strftime("%Y_%m_%d").to_string()
            + ".json"
    }

    pub fn metadata_filename(&self, series_id: &str) -> String {
        self.base_dir.to_owned() + "/Meta/FRED_" + series_id + "_metadata.json"
    }

    /// Pull one series from the FRED API and record it.
    ///
    /// When prior metadata exists the request is scoped with
    /// `observation_start` to only ask for observations from the last known
    /// date forward.  That is an optimization only; the fingerprint check in
    /// [`record`](Self::record) still guards against redundant writes.
    pub fn fetch(&self, series_id: &str) -> Result<FetchOutcome, EtlError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EtlError::Configuration("FRED_API_KEY not set".to_string()))?;

        let prior = read_metadata(Path::new(&self.metadata_filename(series_id)))?;
        let mut params: Vec<(&str, String)> = vec![
            ("series_id", series_id.to_string()),
            ("api_key", api_key.to_string()),
            ("file_type", "json".to_string()),
        ];
        if let Some(start) = prior.and_then(|m| m.last_observation_date) {
            params.push(("observation_start", start.to_string()));
        }

        let client = Client::new();
        let payload = with_retry("fetch_fred_data", || {
            let response = client.get(FRED_URL).query(&params).send()?;
            if response.status() != StatusCode::OK {
                return Err(EtlError::Transient(format!(
                    "FRED returned HTTP {} for {}",
                    response.status(),
                    series_id
                )));
            }
            response
                .json::<Value>()
                .map_err(|e| EtlError::Validation(format!("invalid FRED response body: {}", e)))
        })?;

        self.record(series_id, payload)
    }

    /// Compare a fetched payload against the stored fingerprint and, on
    /// change, write today's snapshot and updated metadata.
    ///
    /// The fingerprint covers only the `observations` portion, so envelope
    /// fields echoing request parameters (realtime_start, limit, ...) cannot
    /// trigger spurious writes.  A payload with zero observations never
    /// regresses the stored `last_observation_date`.
    pub fn record(&self, series_id: &str, payload: Value) -> Result<FetchOutcome, EtlError> {
        let meta_path = self.metadata_filename(series_id);
        let prior = read_metadata(Path::new(&meta_path))?;

        let mut last_date = prior.as_ref().and_then(|m| m.last_observation_date);
        let digest = {
            let observations = payload
                .get("observations")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    EtlError::Validation(format!(
                        "malformed FRED response for {}: missing 'observations'",
                        series_id
                    ))
                })?;
            for obs in observations {
                let date_str = obs.get("date").and_then(Value::as_str).ok_or_else(|| {
                    EtlError::Validation(format!(
                        "FRED observation without 'date' for {}",
                        series_id
                    ))
                })?;
                let date: Date = date_str.parse().map_err(|_| {
                    EtlError::Validation(format!("bad FRED observation date '{}'", date_str))
                })?;
                if last_date.map_or(true, |current| date > current) {
                    last_date = Some(date);
                }
            }
            fingerprint(&payload["observations"])
        };

        if prior.is_some_and(|m| m.last_hash == digest) {
            info!("no change for FRED {}, skipping write", series_id);
            return Ok(FetchOutcome {
                payload,
                changed: false,
            });
        }

        let snapshot = self.filename(series_id, &Zoned::now().date());
        if let Some(dir) = Path::new(&snapshot).parent() {
            fs::create_dir_all(dir)?;
        }
        serde_json::to_writer(File::create(&snapshot)?, &payload)?;

        write_metadata(
            Path::new(&meta_path),
            &SeriesMetadata {
                last_observation_date: last_date,
                last_hash: digest,
                last_updated: Timestamp::now(),
            },
        )?;
        info!("extracted FRED {}", series_id);

        Ok(FetchOutcome {
            payload,
            changed: true,
        })
    }
}
