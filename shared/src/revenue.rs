//! Revenue calculation for line items.

use crate::error::DomainError;
use crate::types::item::LineItem;
use rust_decimal::Decimal;

/// Monetary contribution of a single item: `unit_price * quantity`.
///
/// Exact fixed-point arithmetic; no binary float rounding accumulates
/// across many small contributions. Negative prices or quantities are
/// domain errors, as is a product outside the representable range. Zero
/// quantity is valid and contributes zero.
pub fn contribution(item: &LineItem) -> Result<Decimal, DomainError> {
    if item.unit_price < Decimal::ZERO {
        return Err(DomainError::NegativePrice {
            price: item.unit_price,
        });
    }
    if item.quantity < 0 {
        return Err(DomainError::NegativeQuantity {
            quantity: item.quantity,
        });
    }
    item.unit_price
        .checked_mul(Decimal::from(item.quantity))
        .ok_or(DomainError::ContributionOverflow {
            price: item.unit_price,
            quantity: item.quantity,
        })
}
