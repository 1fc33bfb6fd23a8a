//! Trade execution records
//!
//! A trade records the taker's identity and side together with the maker's
//! execution price. Total value is derived at construction.

use crate::ids::TradeId;
use crate::numeric::Price;
use crate::order::Side;
use crate::symbol::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub taker_order_id: String,
    pub taker_user_id: String,
    pub symbol: Symbol,
    pub taker_side: Side,
    pub quantity: i64,
    /// Execution price (the maker's resting price)
    pub price: Price,
    /// quantity × price
    pub total_value: Decimal,
    /// Unix nanos
    pub executed_at: i64,
}

impl Trade {
    /// Create a new trade record
    pub fn new(
        taker_order_id: impl Into<String>,
        taker_user_id: impl Into<String>,
        symbol: Symbol,
        taker_side: Side,
        quantity: i64,
        price: Price,
        executed_at: i64,
    ) -> Self {
        let total_value = Decimal::from(quantity) * price.as_decimal();
        Self {
            trade_id: TradeId::new(),
            taker_order_id: taker_order_id.into(),
            taker_user_id: taker_user_id.into(),
            symbol,
            taker_side,
            quantity,
            price,
            total_value,
            executed_at,
        }
    }
}
