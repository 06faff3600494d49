//! Payment history records and gateway reference types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AccountId, Money, Plan};

/// How a payment history entry was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Pix,
    CreditCard,
    DebitCard,
    Boleto,
    MercadoPago,
    /// Zero-value marker written when a subscription is cancelled.
    Cancellation,
}

impl PaymentMethod {
    /// Classify a gateway `payment_method_id`.
    ///
    /// # Examples
    /// ```
    /// use streamflix::domain::PaymentMethod;
    ///
    /// assert_eq!(PaymentMethod::from_gateway_method_id("pix"), PaymentMethod::Pix);
    /// assert_eq!(PaymentMethod::from_gateway_method_id("visa"), PaymentMethod::CreditCard);
    /// ```
    #[must_use]
    pub fn from_gateway_method_id(method_id: &str) -> Self {
        match method_id {
            "pix" => Self::Pix,
            "bolbradesco" | "pec" | "boleto" => Self::Boleto,
            "debvisa" | "debmaster" | "debelo" => Self::DebitCard,
            "visa" | "master" | "mastercard" | "amex" | "elo" | "hipercard" | "diners"
            | "discover" => Self::CreditCard,
            _ => Self::MercadoPago,
        }
    }
}

/// Settlement state of a payment history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Approved,
    Pending,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    /// Map a gateway status string onto the history status.
    ///
    /// Unrecognised statuses (`in_process`, `authorized`, ...) are pending.
    ///
    /// # Examples
    /// ```
    /// use streamflix::domain::PaymentStatus;
    ///
    /// assert_eq!(PaymentStatus::from_gateway("approved"), PaymentStatus::Approved);
    /// assert_eq!(PaymentStatus::from_gateway("in_process"), PaymentStatus::Pending);
    /// ```
    #[must_use]
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "cancelled" | "refunded" | "charged_back" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

/// One line of a subscription's payment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    pub date: DateTime<Utc>,
    #[schema(value_type = i64)]
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_payment_id: Option<String>,
}

/// Correlates a gateway payment with the account and plan it pays for.
///
/// Rendered as `<account id>_<PLAN>_<issued millis>`.
///
/// # Examples
/// ```
/// use streamflix::domain::{AccountId, ExternalReference, Plan};
///
/// let account = AccountId::random();
/// let reference = ExternalReference::new(account, Plan::Premium, 1_700_000_000_000);
/// let parsed: ExternalReference = reference.to_string().parse().expect("round trip");
/// assert_eq!(parsed, reference);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    pub account_id: AccountId,
    pub plan: Plan,
    pub issued_at_millis: i64,
}

impl ExternalReference {
    #[must_use]
    pub fn new(account_id: AccountId, plan: Plan, issued_at_millis: i64) -> Self {
        Self {
            account_id,
            plan,
            issued_at_millis,
        }
    }

    #[must_use]
    pub fn issued_now(account_id: AccountId, plan: Plan, now: DateTime<Utc>) -> Self {
        Self::new(account_id, plan, now.timestamp_millis())
    }
}

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.account_id, self.plan, self.issued_at_millis
        )
    }
}

/// Error parsing an [`ExternalReference`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed external reference: {0}")]
pub struct MalformedReference(pub String);

impl FromStr for ExternalReference {
    type Err = MalformedReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedReference(s.to_owned());
        let mut parts = s.rsplitn(3, '_');
        let millis = parts.next().ok_or_else(malformed)?;
        let plan = parts.next().ok_or_else(malformed)?;
        let account = parts.next().ok_or_else(malformed)?;
        Ok(Self {
            account_id: account.parse().map_err(|_| malformed())?,
            plan: plan.parse().map_err(|_| malformed())?,
            issued_at_millis: millis.parse().map_err(|_| malformed())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("approved", PaymentStatus::Approved)]
    #[case("rejected", PaymentStatus::Rejected)]
    #[case("cancelled", PaymentStatus::Cancelled)]
    #[case("refunded", PaymentStatus::Cancelled)]
    #[case("pending", PaymentStatus::Pending)]
    #[case("in_process", PaymentStatus::Pending)]
    fn maps_gateway_statuses(#[case] raw: &str, #[case] expected: PaymentStatus) {
        assert_eq!(PaymentStatus::from_gateway(raw), expected);
    }

    #[rstest]
    fn parses_reference_with_portuguese_plan() {
        let account = AccountId::random();
        let raw = format!("{account}_FAMILIA_1700000000000");
        let parsed: ExternalReference = raw.parse().expect("valid reference");
        assert_eq!(parsed.account_id, account);
        assert_eq!(parsed.plan, Plan::Family);
        assert_eq!(parsed.issued_at_millis, 1_700_000_000_000);
    }

    #[rstest]
    #[case("")]
    #[case("not-a-uuid_PREMIUM_1")]
    #[case("00000000-0000-0000-0000-000000000000_GOLD_1")]
    #[case("00000000-0000-0000-0000-000000000000_PREMIUM_soon")]
    #[case("PREMIUM_1")]
    fn rejects_malformed_references(#[case] raw: &str) {
        assert!(raw.parse::<ExternalReference>().is_err());
    }
}
