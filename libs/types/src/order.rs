//! Order lifecycle types
//!
//! An order is admitted with a host-supplied id, lives on one side of the
//! book, and is removed on full fill or cancellation.

use crate::errors::OrderError;
use crate::numeric::Price;
use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }

    /// Parse from the wire strings the host passes across the boundary
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Side::BUY),
            "SELL" => Some(Side::SELL),
            _ => None,
        }
    }
}

/// A limit order
///
/// `order_id` is unique within a book's lifetime; duplicates are rejected
/// at admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: i64,
    pub price: Price,
    /// Unix nanos at admission
    pub created_at: i64,
    pub active: bool,
}

impl Order {
    /// Create a validated order
    ///
    /// Rejects empty ids, non-positive quantities, and non-positive prices.
    pub fn new(
        order_id: impl Into<String>,
        user_id: impl Into<String>,
        symbol: Symbol,
        side: Side,
        quantity: i64,
        price: f64,
        created_at: i64,
    ) -> Result<Self, OrderError> {
        let order_id = order_id.into();
        if order_id.is_empty() {
            return Err(OrderError::EmptyOrderId);
        }
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity(quantity));
        }
        let price = Price::from_f64(price).ok_or(OrderError::InvalidPrice(price))?;

        Ok(Self {
            order_id,
            user_id: user_id.into(),
            symbol,
            side,
            quantity,
            price,
            created_at,
            active: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym() -> Symbol {
        Symbol::parse("AAPL").unwrap()
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::BUY.opposite(), Side::SELL);
        assert_eq!(Side::SELL.opposite(), Side::BUY);
    }

    #[test]
    fn test_side_parse() {
        assert_eq!(Side::parse("BUY"), Some(Side::BUY));
        assert_eq!(Side::parse("SELL"), Some(Side::SELL));
        assert_eq!(Side::parse("buy"), None);
        assert_eq!(Side::parse(""), None);
    }

    #[test]
    fn test_order_creation() {
        let order = Order::new("ord-1", "user-1", sym(), Side::BUY, 100, 10.0, 1).unwrap();
        assert_eq!(order.order_id, "ord-1");
        assert_eq!(order.quantity, 100);
        assert!(order.active);
    }

    #[test]
    fn test_order_rejects_bad_quantity() {
        assert!(matches!(
            Order::new("ord-1", "u", sym(), Side::BUY, 0, 10.0, 1),
            Err(OrderError::InvalidQuantity(0))
        ));
        assert!(matches!(
            Order::new("ord-1", "u", sym(), Side::BUY, -5, 10.0, 1),
            Err(OrderError::InvalidQuantity(-5))
        ));
    }

    #[test]
    fn test_order_rejects_bad_price() {
        assert!(Order::new("ord-1", "u", sym(), Side::SELL, 10, 0.0, 1).is_err());
        assert!(Order::new("ord-1", "u", sym(), Side::SELL, 10, -1.0, 1).is_err());
        assert!(Order::new("ord-1", "u", sym(), Side::SELL, 10, f64::NAN, 1).is_err());
    }

    #[test]
    fn test_order_rejects_empty_id() {
        assert!(matches!(
            Order::new("", "u", sym(), Side::BUY, 10, 1.0, 1),
            Err(OrderError::EmptyOrderId)
        ));
    }

    #[test]
    fn test_order_serialization() {
        let order = Order::new("ord-1", "user-1", sym(), Side::SELL, 50, 99.5, 7).unwrap();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
