//! Trade execution
//!
//! Builds validated trade records during matching. Every emitted trade has
//! strictly positive quantity and carries the maker's resting price.

use types::numeric::Price;
use types::order::Side;
use types::symbol::Symbol;
use types::trade::Trade;

/// Errors from trade construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// A zero or negative fill quantity reached the executor
    InvalidQuantity(i64),
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::InvalidQuantity(q) => write!(f, "invalid fill quantity: {q}"),
        }
    }
}

/// Builds trades during the match loop
#[derive(Debug, Default)]
pub struct TradeExecutor {
    trades_executed: u64,
}

impl TradeExecutor {
    pub fn new() -> Self {
        Self { trades_executed: 0 }
    }

    /// Execute one fill at the maker's price
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &mut self,
        symbol: Symbol,
        taker_order_id: &str,
        taker_user_id: &str,
        taker_side: Side,
        maker_price: Price,
        quantity: i64,
        executed_at: i64,
    ) -> Result<Trade, MatchError> {
        if quantity <= 0 {
            return Err(MatchError::InvalidQuantity(quantity));
        }

        self.trades_executed += 1;
        Ok(Trade::new(
            taker_order_id,
            taker_user_id,
            symbol,
            taker_side,
            quantity,
            maker_price,
            executed_at,
        ))
    }

    /// Trades executed since construction
    pub fn trades_executed(&self) -> u64 {
        self.trades_executed
    }
}
