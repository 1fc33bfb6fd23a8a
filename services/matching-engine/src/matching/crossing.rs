//! Price crossing check
//!
//! A buy crosses a sell when the buyer is willing to pay at least the
//! seller's ask. Equality trades.

use types::numeric::Price;

/// Whether a bid at `buy` can match an ask at `sell`
pub fn crosses(buy: Price, sell: Price) -> bool {
    buy >= sell
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crosses_when_buy_above_sell() {
        assert!(crosses(Price::from_u64(101), Price::from_u64(100)));
    }

    #[test]
    fn test_crosses_at_equal_price() {
        assert!(crosses(Price::from_u64(100), Price::from_u64(100)));
    }

    #[test]
    fn test_no_cross_when_buy_below_sell() {
        assert!(!crosses(Price::from_u64(99), Price::from_u64(100)));
    }
}
