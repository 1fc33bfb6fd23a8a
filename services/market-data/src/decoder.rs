//! Vendor quote envelope decoder
//!
//! Extracts the daily-quote fields from the vendor's JSON envelope without
//! building a DOM: the body is scanned once per field over borrowed slices.
//! Values may be bare JSON numbers or quoted numeric strings; whitespace and
//! unknown sibling keys are tolerated.
//!
//! The vendor serves a daily quote, not an L1 book, so `best_bid = low` and
//! `best_ask = high`. This is an approximation kept for compatibility with
//! the consumers of these snapshots.

use thiserror::Error;

use types::symbol::Symbol;

use crate::clock;

const ENVELOPE_KEY: &str = "\"Global Quote\"";
const KEY_OPEN: &str = "02. open";
const KEY_HIGH: &str = "03. high";
const KEY_LOW: &str = "04. low";
const KEY_PRICE: &str = "05. price";
const KEY_VOLUME: &str = "06. volume";

/// Decode failure kinds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("envelope header absent")]
    EnvelopeMissing,

    #[error("field missing: {0}")]
    FieldMissing(&'static str),

    #[error("field unparseable: {0}")]
    BadNumber(&'static str),

    #[error("non-positive last price: {0}")]
    NonPositivePrice(f64),

    #[error("negative volume: {0}")]
    NegativeVolume(i64),
}

/// A decoded vendor quote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub symbol: Symbol,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub last_price: f64,
    pub volume: i64,
    pub best_bid: f64,
    pub best_ask: f64,
    /// Nanoseconds since the process monotonic epoch, stamped at decode
    pub timestamp: u64,
}

/// Decode a vendor response body for one symbol
pub fn decode_quote(symbol: Symbol, body: &str) -> Result<Quote, DecodeError> {
    let start = body.find(ENVELOPE_KEY).ok_or(DecodeError::EnvelopeMissing)?;
    let envelope = &body[start + ENVELOPE_KEY.len()..];

    let open = extract_f64(envelope, KEY_OPEN)?;
    let high = extract_f64(envelope, KEY_HIGH)?;
    let low = extract_f64(envelope, KEY_LOW)?;
    let last_price = extract_f64(envelope, KEY_PRICE)?;
    let volume = extract_i64(envelope, KEY_VOLUME)?;

    if last_price <= 0.0 {
        return Err(DecodeError::NonPositivePrice(last_price));
    }
    if volume < 0 {
        return Err(DecodeError::NegativeVolume(volume));
    }

    Ok(Quote {
        symbol,
        open,
        high,
        low,
        last_price,
        volume,
        best_bid: low,
        best_ask: high,
        timestamp: clock::now_ns(),
    })
}

/// Locate a key's raw value slice within the envelope
///
/// Returns the value with any surrounding quotes stripped. Borrows from
/// the input; nothing is copied.
fn raw_value<'a>(json: &'a str, key: &'static str) -> Result<&'a str, DecodeError> {
    // Keys are matched quoted to avoid hitting a value that happens to
    // contain the key text
    let needle_start = find_quoted_key(json, key).ok_or(DecodeError::FieldMissing(key))?;
    let after_key = &json[needle_start..];

    let colon = after_key.find(':').ok_or(DecodeError::FieldMissing(key))?;
    let value = after_key[colon + 1..].trim_start();

    if let Some(rest) = value.strip_prefix('"') {
        let end = rest.find('"').ok_or(DecodeError::BadNumber(key))?;
        Ok(&rest[..end])
    } else {
        let end = value
            .find(|c| c == ',' || c == '}' || c == ']')
            .unwrap_or(value.len());
        Ok(value[..end].trim_end())
    }
}

fn find_quoted_key(json: &str, key: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = json[from..].find(key) {
        let abs = from + pos;
        let preceded = abs > 0 && json.as_bytes()[abs - 1] == b'"';
        let followed = json.as_bytes().get(abs + key.len()) == Some(&b'"');
        if preceded && followed {
            return Some(abs + key.len() + 1);
        }
        from = abs + key.len();
    }
    None
}

fn extract_f64(json: &str, key: &'static str) -> Result<f64, DecodeError> {
    let raw = raw_value(json, key)?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(DecodeError::BadNumber(key))
}

fn extract_i64(json: &str, key: &'static str) -> Result<i64, DecodeError> {
    let raw = raw_value(json, key)?;
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    // Some feeds serve volume with a fractional suffix; truncate it
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v as i64)
        .ok_or(DecodeError::BadNumber(key))
}
