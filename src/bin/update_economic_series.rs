use std::error::Error;
use std::fs;
use std::path::Path;

use duckdb::Connection;
use log::{error, info};
use serde_json::Value;

use econarc::config::Settings;
use econarc::db::warehouse::{ensure_schema, upsert_dim_series, upsert_observations};
use econarc::errors::EtlError;
use econarc::transform::{
    build_dim_series, combine_fact_tables, parse_bls_batch, parse_fred_observations, Observation,
    SeriesDim,
};

/// Extract -> Transform -> Load, sequentially.  A failure in one phase is
/// logged and aborts the remainder of the run without failing the process,
/// so a scheduler sees a clean exit.  Within Extract, one failing series is
/// skipped and the survivors continue through the pipeline.
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();

    info!("starting economic series update");

    // Extract
    let fred_archive = settings.fred_archive();
    let mut fred_payloads: Vec<(String, String, Value)> = Vec::new();
    for (name, id) in &settings.fred_series {
        match fred_archive.fetch(id) {
            Ok(outcome) => fred_payloads.push((id.clone(), name.clone(), outcome.payload)),
            Err(e) => error!("extract failed for FRED {}: {}", id, e),
        }
    }
    let bls_payload = match settings.bls_archive().fetch(
        &settings.bls_series,
        settings.bls_start_year,
        settings.bls_end_year,
    ) {
        Ok(outcome) => Some(outcome.payload),
        Err(e) => {
            error!("extract failed for BLS batch: {}", e);
            None
        }
    };
    if fred_payloads.is_empty() && bls_payload.is_none() {
        error!("extract phase produced no data, aborting run");
        return Ok(());
    }

    // Transform
    let mut fred_tables = Vec::new();
    for (id, name, payload) in &fred_payloads {
        match parse_fred_observations(payload, id, name) {
            Ok(table) => fred_tables.push(table),
            Err(e) => error!("transform failed for FRED {}: {}", id, e),
        }
    }
    let bls_table = match &bls_payload {
        Some(payload) => match parse_bls_batch(payload, &settings.bls_series) {
            Ok(table) => table,
            Err(e) => {
                error!("transform failed for BLS batch: {}", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    let facts = combine_fact_tables(fred_tables, bls_table);
    let dims = build_dim_series(&settings.fred_series, &settings.bls_series);
    info!("transformed {} fact rows, {} series", facts.len(), dims.len());

    // Load
    if let Err(e) = load(&settings, &facts, &dims) {
        error!("load phase failed: {}", e);
        return Ok(());
    }

    info!("done");
    Ok(())
}

fn load(settings: &Settings, facts: &[Observation], dims: &[SeriesDim]) -> Result<(), EtlError> {
    if let Some(dir) = Path::new(&settings.duckdb_path).parent() {
        fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(&settings.duckdb_path)?;
    ensure_schema(&conn)?;
    upsert_observations(&conn, facts)?;
    upsert_dim_series(&conn, dims)?;
    Ok(())
}
