//! The payment-stage safety check. The wallet has no overdraft, so an order
//! never goes through without a positive total that the balance covers.

use bisleri_client::extract::parse_inr_amount;
use rust_decimal::Decimal;

use crate::CheckoutError;

/// Amounts read off the payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTotals {
    pub total_raw: String,
    pub total: Decimal,
    /// `None` when the page showed no readable balance.
    pub balance_raw: Option<String>,
}

/// Checks the scraped total and balance.
///
/// A balance that is missing or unreadable does not block the order; a
/// readable one must cover the total.
///
/// # Errors
///
/// [`CheckoutError::TotalMissing`], [`CheckoutError::TotalUnparseable`],
/// [`CheckoutError::InvalidTotal`] for a total of zero, or
/// [`CheckoutError::InsufficientBalance`].
pub fn check_totals(
    total_raw: Option<&str>,
    balance_raw: Option<&str>,
) -> Result<PaymentTotals, CheckoutError> {
    let total_raw = total_raw.ok_or(CheckoutError::TotalMissing)?;
    let total = parse_inr_amount(total_raw).map_err(|_| CheckoutError::TotalUnparseable {
        raw: total_raw.to_string(),
    })?;
    if total <= Decimal::ZERO {
        return Err(CheckoutError::InvalidTotal {
            raw: total_raw.to_string(),
        });
    }

    let balance_raw = match balance_raw.map(|raw| (raw, parse_inr_amount(raw))) {
        Some((raw, Ok(balance))) => {
            if balance < total {
                return Err(CheckoutError::InsufficientBalance {
                    balance: raw.to_string(),
                    total: total_raw.to_string(),
                });
            }
            Some(raw.to_string())
        }
        Some((raw, Err(err))) => {
            tracing::warn!(balance = raw, error = %err, "wallet balance unreadable; not checked");
            None
        }
        None => None,
    };

    Ok(PaymentTotals {
        total_raw: total_raw.to_string(),
        total,
        balance_raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covered_total_passes() {
        let totals = check_totals(Some("₹180.00"), Some("₹1,250.50")).unwrap();
        assert_eq!(totals.total, Decimal::new(180, 0));
        assert_eq!(totals.balance_raw.as_deref(), Some("₹1,250.50"));
    }

    #[test]
    fn exact_balance_is_enough() {
        assert!(check_totals(Some("₹100"), Some("₹100")).is_ok());
    }

    #[test]
    fn short_balance_blocks_payment() {
        let err = check_totals(Some("₹250"), Some("₹100")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "insufficient wallet balance (₹100) for order total (₹250)"
        );
    }

    #[test]
    fn missing_total_blocks_payment() {
        assert!(matches!(
            check_totals(None, Some("₹500")),
            Err(CheckoutError::TotalMissing)
        ));
    }

    #[test]
    fn zero_total_blocks_payment() {
        assert!(matches!(
            check_totals(Some("₹0.00"), Some("₹500")),
            Err(CheckoutError::InvalidTotal { .. })
        ));
    }

    #[test]
    fn garbage_total_is_reported_not_zeroed() {
        assert!(matches!(
            check_totals(Some("₹--"), None),
            Err(CheckoutError::TotalUnparseable { ref raw }) if raw == "₹--"
        ));
    }

    #[test]
    fn undetected_balance_is_tolerated() {
        let totals = check_totals(Some("₹180"), None).unwrap();
        assert!(totals.balance_raw.is_none());
        let totals = check_totals(Some("₹180"), Some("₹n/a")).unwrap();
        assert!(totals.balance_raw.is_none());
    }
}
