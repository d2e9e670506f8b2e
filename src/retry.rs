use std::thread;
use std::time::Duration;

use log::warn;

use crate::errors::EtlError;

const MAX_ATTEMPTS: u32 = 3;

/// Run a remote-call operation with bounded retry and exponential backoff.
///
/// At most 3 total attempts; after attempt `n` (0-based) fails transiently,
/// sleep `2^n` seconds before trying again.  Non-transient errors (missing
/// credential, malformed response, upstream refusal) propagate immediately
/// without consuming a retry.  After the final attempt the original error
/// propagates unchanged.  `op_name` identifies the operation in the logs.
pub fn with_retry<T, F>(op_name: &str, op: F) -> Result<T, EtlError>
where
    F: FnMut() -> Result<T, EtlError>,
{
    retry_with_sleep(op_name, op, thread::sleep)
}

fn retry_with_sleep<T, F, S>(op_name: &str, mut op: F, mut sleep: S) -> Result<T, EtlError>
where
    F: FnMut() -> Result<T, EtlError>,
    S: FnMut(Duration),
{
    let mut attempt: u32 = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                warn!(
                    "attempt {}/{} of {} failed: {}",
                    attempt + 1,
                    MAX_ATTEMPTS,
                    op_name,
                    e
                );
                sleep(Duration::from_secs(1u64 << attempt));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
