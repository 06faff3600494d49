//! Subscription state machine.
//!
//! A subscription moves between statuses as payments land and customers
//! cancel:
//!
//! ```text
//! TRIAL/INACTIVE --activate--> ACTIVE --cancel--> CANCELLED
//!                               ^                    |
//!                               +----reactivate------+  (only before due date)
//! ```
//!
//! Activation always succeeds and may be applied from any status, because a
//! confirmed payment is authoritative. Access is granted while the status is
//! ACTIVE or CANCELLED and the due date lies in the future.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::pricing::MAX_MONTHS;
use super::{Money, PaymentEntry, PaymentMethod, PaymentStatus, Plan};

/// Days credited per purchased month.
pub const DAYS_PER_MONTH: i64 = 30;

/// Lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
    Suspended,
    Trial,
}

/// Payment instrument currently backing the subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodInfo {
    pub kind: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_four: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl PaymentMethodInfo {
    #[must_use]
    pub fn of_kind(kind: PaymentMethod) -> Self {
        Self {
            kind,
            last_four: None,
            brand: None,
        }
    }
}

/// Identifiers held by the payment gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRefs {
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Recurring (pre-approval) subscription id, cancelled with the
    /// subscription.
    #[serde(default)]
    pub subscription_id: Option<String>,
    /// Checkout preference awaiting payment.
    #[serde(default)]
    pub preference_id: Option<String>,
}

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("no active subscription found")]
    NotActive,
    #[error("subscription is not cancelled")]
    NotCancelled,
    #[error("subscription period has expired; a new payment is required")]
    PeriodExpired,
}

impl SubscriptionError {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotActive => "not_active",
            Self::NotCancelled => "not_cancelled",
            Self::PeriodExpired => "period_expired",
        }
    }
}

/// Limits granted by the plan in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entitlements {
    pub plan: Plan,
    pub profiles: u8,
    pub screens: u8,
}

/// What [`Subscription::reconcile`] did to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No entry carried the gateway id; one was appended.
    Appended,
    /// The matching entry changed status.
    Updated { previous: PaymentStatus },
    /// The matching entry already had this status.
    Unchanged,
}

impl ReconcileOutcome {
    /// Whether this reconciliation newly moved a payment to approved.
    #[must_use]
    pub fn newly_approved(self, status: PaymentStatus) -> bool {
        status == PaymentStatus::Approved
            && matches!(
                self,
                Self::Appended
                    | Self::Updated {
                        previous: PaymentStatus::Pending | PaymentStatus::Rejected,
                    }
            )
    }
}

/// Subscription sub-document of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[schema(value_type = i64)]
    pub price: Money,
    pub currency: String,
    #[serde(default)]
    pub payment_method: Option<PaymentMethodInfo>,
    #[serde(default)]
    pub gateway: GatewayRefs,
    #[serde(default)]
    pub history: Vec<PaymentEntry>,
    #[serde(default)]
    pub payment_attempts: u32,
    pub auto_renew: bool,
}

impl Subscription {
    /// Free trial subscription assigned on registration.
    #[must_use]
    pub fn trial(now: DateTime<Utc>) -> Self {
        Self {
            plan: Plan::Free,
            status: SubscriptionStatus::Trial,
            started_at: now,
            due_date: None,
            price: Money::ZERO,
            currency: "BRL".to_owned(),
            payment_method: None,
            gateway: GatewayRefs::default(),
            history: Vec::new(),
            payment_attempts: 0,
            auto_renew: true,
        }
    }

    fn due_after(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| due > now)
    }

    /// ACTIVE with an unexpired due date.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.due_after(now)
    }

    /// Paid content is available: ACTIVE or CANCELLED before the due date.
    #[must_use]
    pub fn has_access(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Cancelled
        ) && self.due_after(now)
    }

    /// Start a paid period of `months` from `now`.
    ///
    /// Replaces any remaining period; the pending checkout preference is
    /// cleared.
    pub fn activate(
        &mut self,
        plan: Plan,
        months: u32,
        method: PaymentMethodInfo,
        now: DateTime<Utc>,
    ) {
        let months = months.clamp(1, MAX_MONTHS);
        self.plan = plan;
        self.status = SubscriptionStatus::Active;
        self.started_at = now;
        self.due_date = Some(now + Duration::days(DAYS_PER_MONTH * i64::from(months)));
        self.price = plan.monthly_price();
        self.payment_method = Some(method);
        self.gateway.preference_id = None;
        self.auto_renew = true;
    }

    /// Cancel an active subscription, keeping access until the due date.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), SubscriptionError> {
        if !self.is_active(now) {
            return Err(SubscriptionError::NotActive);
        }
        self.status = SubscriptionStatus::Cancelled;
        self.auto_renew = false;
        self.history.push(PaymentEntry {
            date: now,
            amount: Money::ZERO,
            method: PaymentMethod::Cancellation,
            status: PaymentStatus::Approved,
            transaction_id: format!("cancel_{}", now.timestamp_millis()),
            gateway_payment_id: None,
        });
        Ok(())
    }

    /// Undo a cancellation while the paid period is still running.
    pub fn reactivate(&mut self, now: DateTime<Utc>) -> Result<(), SubscriptionError> {
        if self.status != SubscriptionStatus::Cancelled {
            return Err(SubscriptionError::NotCancelled);
        }
        if !self.due_after(now) {
            return Err(SubscriptionError::PeriodExpired);
        }
        self.status = SubscriptionStatus::Active;
        self.auto_renew = true;
        Ok(())
    }

    /// Append a history entry and count the attempt.
    pub fn record_payment(&mut self, entry: PaymentEntry) {
        self.payment_attempts = self.payment_attempts.saturating_add(1);
        self.history.push(entry);
    }

    /// Apply a gateway status to the entry carrying `gateway_payment_id`.
    ///
    /// When no entry matches, `fallback` is appended with `status`.
    pub fn reconcile(
        &mut self,
        gateway_payment_id: &str,
        status: PaymentStatus,
        fallback: impl FnOnce() -> PaymentEntry,
    ) -> ReconcileOutcome {
        let existing = self
            .history
            .iter_mut()
            .find(|entry| entry.gateway_payment_id.as_deref() == Some(gateway_payment_id));
        match existing {
            Some(entry) if entry.status == status => ReconcileOutcome::Unchanged,
            Some(entry) => {
                let previous = entry.status;
                entry.status = status;
                ReconcileOutcome::Updated { previous }
            }
            None => {
                let mut entry = fallback();
                entry.status = status;
                entry.gateway_payment_id = Some(gateway_payment_id.to_owned());
                self.record_payment(entry);
                ReconcileOutcome::Appended
            }
        }
    }

    /// Limits in force at `now`; without access the FREE plan applies.
    #[must_use]
    pub fn entitlements(&self, now: DateTime<Utc>) -> Entitlements {
        let plan = if self.has_access(now) {
            self.plan
        } else {
            Plan::Free
        };
        let details = plan.details();
        Entitlements {
            plan,
            profiles: details.profiles,
            screens: details.screens,
        }
    }

    /// History entries, newest first.
    #[must_use]
    pub fn history_newest_first(&self) -> Vec<PaymentEntry> {
        let mut entries = self.history.clone();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
