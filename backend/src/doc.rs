//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: payments, accounts and health endpoints from the inbound layer
//! - **Schemas**: the error envelope wrappers ([`ErrorSchema`],
//!   [`ErrorCodeSchema`]) plus request bodies and domain views
//! - **Security**: Session cookie authentication scheme
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::domain::ports::{
    AccountSummary, BoletoSlip, CancellationReceipt, CardPaymentOutcome, PaymentHistory,
    PaymentStatusView, PixCheckout, SubscriptionSummary,
};
use crate::domain::{PlanDetails, Quote};
use crate::inbound::http::accounts::{AddProfileBody, LoginBody, RegisterDeviceBody};
use crate::inbound::http::payments::{
    CancelBody, CardBody, CardPurchaseBody, NotificationBody, PurchaseBody, QuoteBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/contas/login or registration.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "StreamFlix API",
        description = "Accounts, subscriptions and Mercado Pago payments for StreamFlix Brasil."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::payments::create_pix,
        crate::inbound::http::payments::create_card,
        crate::inbound::http::payments::create_boleto,
        crate::inbound::http::payments::webhook,
        crate::inbound::http::payments::payment_status,
        crate::inbound::http::payments::list_plans,
        crate::inbound::http::payments::quote_price,
        crate::inbound::http::payments::cancel_subscription,
        crate::inbound::http::payments::reactivate_subscription,
        crate::inbound::http::payments::payment_history,
        crate::inbound::http::accounts::register,
        crate::inbound::http::accounts::login,
        crate::inbound::http::accounts::current_account,
        crate::inbound::http::accounts::add_profile,
        crate::inbound::http::accounts::register_device,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        PurchaseBody,
        CardBody,
        CardPurchaseBody,
        QuoteBody,
        CancelBody,
        NotificationBody,
        LoginBody,
        AddProfileBody,
        RegisterDeviceBody,
        AccountSummary,
        SubscriptionSummary,
        PixCheckout,
        CardPaymentOutcome,
        BoletoSlip,
        PaymentStatusView,
        CancellationReceipt,
        PaymentHistory,
        PlanDetails,
        Quote,
    )),
    tags(
        (name = "payments", description = "Plans, checkout and subscription lifecycle"),
        (name = "accounts", description = "Registration, login, profiles and devices"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
