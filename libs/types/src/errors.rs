//! Error taxonomy for the sidecar
//!
//! Internal components speak these types; the façade boundary converts them
//! to boolean/sentinel returns and never lets them propagate outward.

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("startup failure: {0}")]
    Startup(String),
}

/// Order rejection kinds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("order id is empty")]
    EmptyOrderId,

    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("invalid price: {0}")]
    InvalidPrice(f64),

    #[error("duplicate order id: {0}")]
    DuplicateOrderId(String),

    #[error("order not found: {0}")]
    NotFound(String),

    #[error("order symbol does not match book symbol: {0}")]
    SymbolMismatch(String),

    #[error("trading halted")]
    Halted,
}

/// Market-data feed failure kinds
///
/// All of these are recovered locally inside the ingestion sweep: the
/// failure counter is bumped and the snapshot slot is left untouched.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("decode failure: {0}")]
    Decode(String),

    #[error("symbol table full")]
    CapacityExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_display() {
        let err = OrderError::InvalidQuantity(-3);
        assert_eq!(err.to_string(), "invalid quantity: -3");
    }

    #[test]
    fn test_engine_error_from_order_error() {
        let engine_err: EngineError = OrderError::Halted.into();
        assert!(matches!(engine_err, EngineError::Order(_)));
    }

    #[test]
    fn test_feed_error_display() {
        let err = FeedError::Transport("timeout".to_string());
        assert!(err.to_string().contains("timeout"));
    }
}
