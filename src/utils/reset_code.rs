use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use subtle::ConstantTimeEq;

pub const RESET_CODE_TTL_MINUTES: i64 = 3;

const CODE_MIN: u32 = 100_000;
const CODE_SPAN: u32 = 900_000;

/// A six digit code in `100000..=999999` drawn from the OS RNG.
pub fn generate_reset_code() -> Result<String> {
    let mut buf = [0u8; 4];
    getrandom::getrandom(&mut buf)
        .map_err(|e| anyhow::anyhow!("Failed to read OS randomness: {}", e))?;
    Ok(code_from_random(u32::from_le_bytes(buf)).to_string())
}

fn code_from_random(value: u32) -> u32 {
    CODE_MIN + value % CODE_SPAN
}

pub fn reset_code_expiry(now: NaiveDateTime) -> NaiveDateTime {
    now + Duration::minutes(RESET_CODE_TTL_MINUTES)
}

/// Compare a stored code with a submitted one in constant time.
pub fn codes_match(stored: &str, submitted: &str) -> bool {
    stored.as_bytes().ct_eq(submitted.as_bytes()).into()
}
