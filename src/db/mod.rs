pub mod bls;
pub mod fred;
pub mod metadata;
pub mod warehouse;

use serde_json::Value;

/// Result of one extraction attempt.  The payload is always the body the
/// remote API returned on this call; `changed` says whether it differed from
/// the last recorded fingerprint (and therefore whether a snapshot and
/// metadata write happened).
#[derive(Debug)]
pub struct FetchOutcome {
    pub payload: Value,
    pub changed: bool,
}
