// Batch pull of BLS timeseries data, all configured series in one call.
// https://www.bls.gov/developers/api_signature_v2.htm

use std::fs::{self, File};
use std::path::Path;

use jiff::civil::Date;
use jiff::{Timestamp, Zoned};
use log::info;
use reqwest::{blocking::Client, StatusCode};
use serde_json::{json, Value};

use crate::db::metadata::{read_metadata, write_metadata, SeriesMetadata};
use crate::db::FetchOutcome;
use crate::errors::EtlError;
use crate::fingerprint::fingerprint;
use crate::retry::with_retry;

const BLS_URL: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";

/// All series in the batch share one snapshot/metadata entry under this
/// identifier.  Tracking revisions per individual series within the batch
/// would be stronger; kept as a single entry to match the daily-batch call.
const BATCH_ID: &str = "batch_pull";

#[derive(Clone)]
pub struct BlsTimeseriesArchive {
    pub api_key: Option<String>,
    pub base_dir: String,
}

impl BlsTimeseriesArchive {
    /// Return the json snapshot filename for the day.  Does not check if the
    /// file exists.
    pub fn filename(&self, day: &Date) -> String {
        self.base_dir.to_owned()
            + "/Raw/BLS_"
            + BATCH_ID
            + "_"
            + &day.strftime("%Y_%m_%d").to_string()
            + ".json"
    }

    pub fn metadata_filename(&self) -> String {
        self.base_dir.to_owned() + "/Meta/BLS_" + BATCH_ID + "_metadata.json"
    }

    /// Pull every configured series in one remote call and record the batch.
    /// `series_map` associates human-readable names to BLS series ids.
    pub fn fetch(
        &self,
        series_map: &[(String, String)],
        start_year: i16,
        end_year: i16,
    ) -> Result<FetchOutcome, EtlError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EtlError::Configuration("BLS_API_KEY not set".to_string()))?;

        let series_ids: Vec<&str> = series_map.iter().map(|(_, id)| id.as_str()).collect();
        let body = json!({
            "seriesid": series_ids,
            "startyear": start_year.to_string(),
            "endyear": end_year.to_string(),
            "registrationkey": api_key,
        });

        let client = Client::new();
        let payload = with_retry("fetch_bls_data", || {
            let response = client.post(BLS_URL).json(&body).send()?;
            if response.status() != StatusCode::OK {
                return Err(EtlError::Transient(format!(
                    "BLS returned HTTP {}",
                    response.status()
                )));
            }
            response
                .json::<Value>()
                .map_err(|e| EtlError::Validation(format!("invalid BLS response body: {}", e)))
        })?;

        self.record(payload)
    }

    /// Compare a fetched batch against the stored fingerprint and, on change,
    /// write today's snapshot and refreshed metadata.  A response whose
    /// `status` reports an application-level failure propagates the upstream
    /// message and writes nothing.
    pub fn record(&self, payload: Value) -> Result<FetchOutcome, EtlError> {
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if status != "REQUEST_SUCCEEDED" {
            let message = payload
                .get("message")
                .and_then(Value::as_array)
                .map(|msgs| {
                    msgs.iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.to_string());
            return Err(EtlError::Application {
                api: "BLS",
                message,
            });
        }

        let meta_path = self.metadata_filename();
        let prior = read_metadata(Path::new(&meta_path))?;
        let digest = fingerprint(&payload);
        if prior.as_ref().is_some_and(|m| m.last_hash == digest) {
            info!("no change for BLS {}, skipping write", BATCH_ID);
            return Ok(FetchOutcome {
                payload,
                changed: false,
            });
        }

        let snapshot = self.filename(&Zoned::now().date());
        if let Some(dir) = Path::new(&snapshot).parent() {
            fs::create_dir_all(dir)?;
        }
        serde_json::to_writer(File::create(&snapshot)?, &payload)?;

        write_metadata(
            Path::new(&meta_path),
            &SeriesMetadata {
                last_observation_date: prior.and_then(|m| m.last_observation_date),
                last_hash: digest,
                last_updated: Timestamp::now(),
            },
        )?;
        info!("extracted BLS {}", BATCH_ID);

        Ok(FetchOutcome {
            payload,
            changed: true,
        })
    }
}
