//! # Pricing Rules
//!
//! Pure pricing logic shared by stock-in and the posting pipeline:
//!
//! - the stock-in margin rule (suggested sale price when purchase cost rises)
//! - line subtotal and grand-total computation
//! - the anti-tampering total tolerance check
//! - payment status derivation from total vs. paid
//!
//! The pipeline NEVER trusts a client-supplied price: it re-derives prices
//! from the variant master and only compares the declared grand total at the
//! end, within [`TOTAL_TOLERANCE`].

use crate::money::Money;
use crate::types::PaymentStatus;
use crate::{DEFAULT_MARGIN, PRICE_ROUNDING_STEP, TOTAL_TOLERANCE};

// =============================================================================
// Margin Rule
// =============================================================================

/// Suggested sale price for a purchase cost:
/// `cost × (1 + margin)`, rounded **up** to the nearest 500 rupiah.
///
/// `margin` is the product's category margin; `None` falls back to
/// [`DEFAULT_MARGIN`] (20%).
///
/// ## Example
/// ```rust
/// use lumbung_core::money::Money;
/// use lumbung_core::pricing::suggest_price;
///
/// // 10_000 * 1.2 = 12_000, already on the 500 grid
/// assert_eq!(suggest_price(Money::new(10_000), None).amount(), 12_000);
///
/// // 10_400 * 1.2 = 12_480 -> rounds up to 12_500
/// assert_eq!(suggest_price(Money::new(10_400), None).amount(), 12_500);
/// ```
pub fn suggest_price(cost: Money, margin: Option<f64>) -> Money {
    let margin = margin.unwrap_or(DEFAULT_MARGIN);
    // The only float in the money path; immediately forced back onto the
    // integer grid by the ceiling + rounding step.
    let raw = (cost.amount() as f64 * (1.0 + margin)).ceil() as i64;
    Money::new(raw).round_up_to(PRICE_ROUNDING_STEP)
}

// =============================================================================
// Line & Total Computation
// =============================================================================

/// Subtotal for one line: `price × qty − discount`.
#[inline]
pub fn line_subtotal(unit_price: Money, qty: i64, discount: Money) -> Money {
    unit_price * qty - discount
}

/// Whether a client-declared total agrees with the server-computed one
/// within the rounding tolerance.
#[inline]
pub fn totals_match(computed: Money, declared: Money) -> bool {
    (computed.amount() - declared.amount()).abs() <= TOTAL_TOLERANCE
}

// =============================================================================
// Payment Status
// =============================================================================

/// Derives the payment status and the stored balance due from the server
/// total and the amount paid.
///
/// - balance ≤ 0  → PAID (stored balance clamps to 0)
/// - paid > 0     → PARTIAL
/// - otherwise    → UNPAID
pub fn derive_payment_status(total: Money, paid: Money) -> (PaymentStatus, Money) {
    let balance = total - paid;
    if !balance.is_positive() {
        (PaymentStatus::Paid, Money::zero())
    } else if paid.is_positive() {
        (PaymentStatus::Partial, balance)
    } else {
        (PaymentStatus::Unpaid, balance)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_price_default_margin() {
        assert_eq!(suggest_price(Money::new(10_000), None).amount(), 12_000);
        assert_eq!(suggest_price(Money::new(10_400), None).amount(), 12_500);
        assert_eq!(suggest_price(Money::zero(), None).amount(), 0);
    }

    #[test]
    fn test_suggest_price_category_margin() {
        // 8_000 * 1.35 = 10_800 -> 11_000
        assert_eq!(
            suggest_price(Money::new(8_000), Some(0.35)).amount(),
            11_000
        );
    }

    #[test]
    fn test_line_subtotal() {
        let sub = line_subtotal(Money::new(2_500), 4, Money::new(1_000));
        assert_eq!(sub.amount(), 9_000);
    }

    #[test]
    fn test_totals_match_tolerance() {
        assert!(totals_match(Money::new(10_000), Money::new(10_000)));
        assert!(totals_match(Money::new(10_000), Money::new(10_002)));
        assert!(totals_match(Money::new(10_000), Money::new(9_998)));
        assert!(!totals_match(Money::new(9_500), Money::new(10_000)));
    }

    #[test]
    fn test_payment_status_paid() {
        let (status, balance) = derive_payment_status(Money::new(10_000), Money::new(10_000));
        assert_eq!(status, PaymentStatus::Paid);
        assert!(balance.is_zero());

        // Overpayment still PAID with zero balance
        let (status, balance) = derive_payment_status(Money::new(10_000), Money::new(15_000));
        assert_eq!(status, PaymentStatus::Paid);
        assert!(balance.is_zero());
    }

    #[test]
    fn test_payment_status_partial_and_unpaid() {
        let (status, balance) = derive_payment_status(Money::new(10_000), Money::new(4_000));
        assert_eq!(status, PaymentStatus::Partial);
        assert_eq!(balance.amount(), 6_000);

        let (status, balance) = derive_payment_status(Money::new(10_000), Money::zero());
        assert_eq!(status, PaymentStatus::Unpaid);
        assert_eq!(balance.amount(), 10_000);
    }
}
