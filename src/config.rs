// Runtime configuration, built once from the environment at process start
// and passed into each component.  Core logic never reads ambient globals.

use std::env;

use jiff::Zoned;

use crate::db::bls::timeseries_archive::BlsTimeseriesArchive;
use crate::db::fred::observations_archive::FredObservationsArchive;

/// Tracked series per source, as (display name, technical id) pairs.  Vec
/// keeps the configured order, which the dimension table preserves.
pub type SeriesMap = Vec<(String, String)>;

pub struct Settings {
    pub fred_api_key: Option<String>,
    pub bls_api_key: Option<String>,
    pub fred_dir: String,
    pub bls_dir: String,
    pub duckdb_path: String,
    pub fred_series: SeriesMap,
    pub bls_series: SeriesMap,
    pub bls_start_year: i16,
    pub bls_end_year: i16,
}

impl Settings {
    /// Credentials and paths come from the environment (`FRED_API_KEY`,
    /// `BLS_API_KEY`, `ETL_BASE_DIR`, `ETL_DUCKDB_PATH`); the tracked series
    /// are compiled-in defaults.
    pub fn from_env() -> Settings {
        let base_dir = env::var("ETL_BASE_DIR").unwrap_or_else(|_| "data".to_string());
        let this_year = Zoned::now().date().year();
        Settings {
            fred_api_key: env::var("FRED_API_KEY").ok(),
            bls_api_key: env::var("BLS_API_KEY").ok(),
            fred_dir: format!("{}/fred", base_dir),
            bls_dir: format!("{}/bls", base_dir),
            duckdb_path: env::var("ETL_DUCKDB_PATH")
                .unwrap_or_else(|_| format!("{}/economic_series.duckdb", base_dir)),
            fred_series: vec![
                ("UNRATE".to_string(), "UNRATE".to_string()),
                ("CPIAUCSL".to_string(), "CPIAUCSL".to_string()),
                ("GDP".to_string(), "GDP".to_string()),
            ],
            bls_series: vec![
                ("CPI_URBAN".to_string(), "CUUR0000SA0".to_string()),
                ("AVG_WAGES".to_string(), "CES0500000003".to_string()),
            ],
            bls_start_year: this_year,
            bls_end_year: this_year,
        }
    }

    pub fn fred_archive(&self) -> FredObservationsArchive {
        FredObservationsArchive {
            api_key: self.fred_api_key.clone(),
            base_dir: self.fred_dir.clone(),
        }
    }

    pub fn bls_archive(&self) -> BlsTimeseriesArchive {
        BlsTimeseriesArchive {
            api_key: self.bls_api_key.clone(),
            base_dir: self.bls_dir.clone(),
        }
    }
}
