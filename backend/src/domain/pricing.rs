//! Price calculation for subscription purchases.
//!
//! A quote multiplies the monthly price by the number of months, applies the
//! 15% annual discount when exactly twelve months are bought, then applies a
//! coupon on top of the already-discounted value.

use serde::Serialize;
use utoipa::ToSchema;

use super::{Error, Money, Plan, PlanDetails};

/// Shortest purchasable period.
pub const MIN_MONTHS: u32 = 1;
/// Longest purchasable period.
pub const MAX_MONTHS: u32 = 36;
/// Months that qualify for the annual discount.
pub const ANNUAL_MONTHS: u32 = 12;
/// Annual discount percentage.
pub const ANNUAL_DISCOUNT_PERCENT: u8 = 15;

/// Promotional coupons and their discount percentage.
const COUPONS: [(&str, u8); 3] = [
    ("STREAMFLIX20", 20),
    ("PRIMEIROUSER", 50),
    ("VOLTEBRASIL", 30),
];

/// Look up a coupon code, ignoring case and surrounding whitespace.
#[must_use]
pub fn coupon_percent(code: &str) -> Option<u8> {
    let normalised = code.trim().to_ascii_uppercase();
    COUPONS
        .iter()
        .find(|(name, _)| *name == normalised)
        .map(|(_, percent)| *percent)
}

/// Validate a purchase period.
pub fn validate_months(months: u32) -> Result<(), Error> {
    if (MIN_MONTHS..=MAX_MONTHS).contains(&months) {
        Ok(())
    } else {
        Err(Error::invalid_request(format!(
            "months must be between {MIN_MONTHS} and {MAX_MONTHS}"
        ))
        .with_details(serde_json::json!({ "field": "months", "value": months })))
    }
}

/// Result of pricing a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub plan: Plan,
    pub months: u32,
    /// Monthly price times months, before any discount.
    #[schema(value_type = i64)]
    pub original_price: Money,
    /// Total discount applied.
    #[schema(value_type = i64)]
    pub discount: Money,
    /// Amount charged.
    #[schema(value_type = i64)]
    pub final_amount: Money,
    pub annual_discount_applied: bool,
    /// Normalised coupon code when a known coupon was applied.
    pub coupon_applied: Option<String>,
    pub features: PlanDetails,
}

/// Price a purchase of `plan` for `months`, optionally with a coupon.
///
/// Unknown coupons are ignored and reported as not applied.
///
/// # Examples
/// ```
/// use streamflix::domain::{Money, Plan, pricing::quote};
///
/// let q = quote(Plan::Premium, 12, Some("streamflix20")).expect("valid period");
/// assert_eq!(q.original_price, Money::from_centavos(35_880));
/// assert_eq!(q.final_amount, Money::from_centavos(24_398));
/// ```
pub fn quote(plan: Plan, months: u32, coupon: Option<&str>) -> Result<Quote, Error> {
    validate_months(months)?;
    let original_price = plan.monthly_price().times(months);
    let mut amount = original_price;

    let annual_discount_applied = months == ANNUAL_MONTHS;
    if annual_discount_applied {
        amount = amount.saturating_sub(amount.percentage(ANNUAL_DISCOUNT_PERCENT));
    }

    let coupon_applied = coupon.and_then(|code| {
        coupon_percent(code).map(|percent| (code.trim().to_ascii_uppercase(), percent))
    });
    if let Some((_, percent)) = &coupon_applied {
        amount = amount.saturating_sub(amount.percentage(*percent));
    }

    Ok(Quote {
        plan,
        months,
        original_price,
        discount: original_price.saturating_sub(amount),
        final_amount: amount,
        annual_discount_applied,
        coupon_applied: coupon_applied.map(|(code, _)| code),
        features: plan.details(),
    })
}

/// Amount charged for a boleto purchase.
///
/// Boletos are only offered for periods of at least twelve months and always
/// carry the annual discount.
pub fn boleto_amount(plan: Plan, months: u32) -> Result<Money, Error> {
    validate_months(months)?;
    if months < ANNUAL_MONTHS {
        return Err(Error::invalid_request(format!(
            "boleto payments require at least {ANNUAL_MONTHS} months"
        ))
        .with_details(serde_json::json!({ "field": "months", "value": months })));
    }
    let total = plan.monthly_price().times(months);
    Ok(total.saturating_sub(total.percentage(ANNUAL_DISCOUNT_PERCENT)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(Plan::Basic, 1, None, 1490, 1490)]
    #[case(Plan::Standard, 3, None, 6870, 6870)]
    #[case(Plan::Basic, 12, None, 17_880, 15_198)]
    #[case(Plan::Premium, 12, Some("STREAMFLIX20"), 35_880, 24_398)]
    #[case(Plan::Family, 1, Some("primeirouser"), 3990, 1995)]
    #[case(Plan::Premium, 6, Some("VOLTEBRASIL"), 17_940, 12_558)]
    #[case(Plan::Basic, 1, Some("NOPE"), 1490, 1490)]
    fn quotes_apply_discounts_in_order(
        #[case] plan: Plan,
        #[case] months: u32,
        #[case] coupon: Option<&str>,
        #[case] original: i64,
        #[case] expected: i64,
    ) {
        let quote = quote(plan, months, coupon).expect("valid quote");
        assert_eq!(quote.original_price, Money::from_centavos(original));
        assert_eq!(quote.final_amount, Money::from_centavos(expected));
        assert_eq!(
            quote.discount,
            Money::from_centavos(original - expected),
            "discount is the difference between original and final"
        );
    }

    #[rstest]
    fn unknown_coupon_is_reported_as_not_applied() {
        let quote = quote(Plan::Basic, 1, Some("DESCONTO99")).expect("valid quote");
        assert!(quote.coupon_applied.is_none());
        let applied = super::quote(Plan::Basic, 1, Some(" streamflix20 ")).expect("valid quote");
        assert_eq!(applied.coupon_applied.as_deref(), Some("STREAMFLIX20"));
    }

    #[rstest]
    #[case(0)]
    #[case(37)]
    fn rejects_out_of_range_months(#[case] months: u32) {
        let err = quote(Plan::Basic, months, None).expect_err("out of range");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn free_plan_quotes_zero() {
        let quote = quote(Plan::Free, 12, Some("STREAMFLIX20")).expect("valid quote");
        assert_eq!(quote.final_amount, Money::ZERO);
    }

    #[rstest]
    fn boleto_requires_a_year_and_discounts() {
        assert!(boleto_amount(Plan::Premium, 6).is_err());
        assert_eq!(
            boleto_amount(Plan::Premium, 12).expect("annual boleto"),
            Money::from_centavos(30_498)
        );
        assert_eq!(
            boleto_amount(Plan::Basic, 24).expect("two-year boleto"),
            Money::from_centavos(30_396)
        );
    }
}
