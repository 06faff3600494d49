//! Subscription plan catalogue.
//!
//! Plans are a closed set. Each carries the monthly price and the
//! entitlements (screens, profiles, video quality, ads) that activation
//! grants to an account.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Money;

/// Subscription plan identifier.
///
/// Serialises as `FREE`, `BASIC`, `STANDARD`, `PREMIUM` or `FAMILY`. The
/// Portuguese identifiers used by existing clients (`GRATUITO`, `BASICO`,
/// `PADRAO`, `FAMILIA`) are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    #[serde(alias = "GRATUITO")]
    Free,
    #[serde(alias = "BASICO")]
    Basic,
    #[serde(alias = "PADRAO")]
    Standard,
    Premium,
    #[serde(alias = "FAMILIA")]
    Family,
}

/// Maximum video quality a plan streams at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum VideoQuality {
    #[serde(rename = "AUTO")]
    Auto,
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "HD")]
    Hd,
    #[serde(rename = "FHD")]
    Fhd,
    #[serde(rename = "4K")]
    Uhd4k,
}

/// Price and entitlements of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetails {
    pub plan: Plan,
    /// Monthly price in centavos.
    #[schema(value_type = i64)]
    pub monthly_price: Money,
    pub screens: u8,
    pub quality: VideoQuality,
    pub ads: bool,
    pub profiles: u8,
}

/// Error returned when parsing an unknown plan identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan: {0}")]
pub struct UnknownPlan(pub String);

impl Plan {
    /// Every plan, cheapest first.
    pub const ALL: [Plan; 5] = [
        Plan::Free,
        Plan::Basic,
        Plan::Standard,
        Plan::Premium,
        Plan::Family,
    ];

    /// Canonical identifier used in external references and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "FREE",
            Plan::Basic => "BASIC",
            Plan::Standard => "STANDARD",
            Plan::Premium => "PREMIUM",
            Plan::Family => "FAMILY",
        }
    }

    /// Human-facing plan name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Plan::Free => "Gratuito",
            Plan::Basic => "Básico",
            Plan::Standard => "Padrão",
            Plan::Premium => "Premium",
            Plan::Family => "Família",
        }
    }

    #[must_use]
    pub const fn details(self) -> PlanDetails {
        let (centavos, screens, quality, ads, profiles) = match self {
            Plan::Free => (0, 1, VideoQuality::Sd, true, 1),
            Plan::Basic => (1490, 1, VideoQuality::Hd, false, 1),
            Plan::Standard => (2290, 2, VideoQuality::Fhd, false, 1),
            Plan::Premium => (2990, 4, VideoQuality::Uhd4k, false, 1),
            Plan::Family => (3990, 5, VideoQuality::Uhd4k, false, 5),
        };
        PlanDetails {
            plan: self,
            monthly_price: Money::from_centavos(centavos),
            screens,
            quality,
            ads,
            profiles,
        }
    }

    #[must_use]
    pub const fn monthly_price(self) -> Money {
        self.details().monthly_price
    }

    /// Plans that require payment.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        !matches!(self, Plan::Free)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" | "GRATUITO" => Ok(Plan::Free),
            "BASIC" | "BASICO" => Ok(Plan::Basic),
            "STANDARD" | "PADRAO" => Ok(Plan::Standard),
            "PREMIUM" => Ok(Plan::Premium),
            "FAMILY" | "FAMILIA" => Ok(Plan::Family),
            _ => Err(UnknownPlan(s.to_owned())),
        }
    }
}
