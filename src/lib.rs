pub mod config;
pub mod db;
pub mod errors;
pub mod fingerprint;
pub mod retry;
pub mod transform;
