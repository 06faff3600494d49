//! Account handlers.
//!
//! ```text
//! POST /api/contas {"firstName":"Maria",...}
//! POST /api/contas/login {"email":"maria@example.com","password":"..."}
//! GET  /api/contas/me
//! POST /api/contas/me/perfis {"name":"Kids","ageRating":"10"}
//! POST /api/contas/me/dispositivos {"deviceId":"tv-1","name":"Sala","kind":"SMART_TV"}
//! ```

use actix_web::{HttpRequest, HttpResponse, Scope, get, post, web};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::br::RegistrationInput;
use crate::domain::ports::{AccountSummary, AddProfileRequest, LoginRequest, RegisterDeviceRequest};
use crate::domain::{AgeRating, Device, DeviceKind, Profile};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error};

/// Login request body for `POST /api/contas/login`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "senha")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddProfileBody {
    #[serde(default, alias = "nome")]
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Defaults to `FREE` (all audiences).
    #[serde(default, alias = "classificacao")]
    pub age_rating: Option<AgeRating>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceBody {
    #[serde(default, alias = "dispositivoId")]
    pub device_id: String,
    #[serde(default, alias = "nome")]
    pub name: String,
    #[serde(alias = "tipo")]
    pub kind: DeviceKind,
}

fn require_text(value: String, field: &'static str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(missing_field_error(FieldName::new(field)));
    }
    Ok(trimmed.to_owned())
}

/// Register an account and log it in.
#[utoipa::path(
    post,
    path = "/api/contas",
    request_body = RegistrationInput,
    responses(
        (status = 201, description = "Account created", body = AccountSummary,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Registration form has problems", body = ErrorSchema),
        (status = 409, description = "E-mail or CPF already registered", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "registerAccount",
    security([])
)]
#[post("")]
pub async fn register(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegistrationInput>,
) -> ApiResult<HttpResponse> {
    let summary = state.accounts.register(payload.into_inner()).await?;
    session.persist_account(&summary.id)?;
    Ok(HttpResponse::Created().json(summary))
}

/// Authenticate and establish a session.
#[utoipa::path(
    post,
    path = "/api/contas/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Login success", body = AccountSummary,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 403, description = "Account locked or disabled", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginBody>,
) -> ApiResult<web::Json<AccountSummary>> {
    let body = payload.into_inner();
    if body.password.is_empty() {
        return Err(missing_field_error(FieldName::new("password")));
    }
    let request = LoginRequest {
        email: require_text(body.email, "email")?,
        password: body.password,
    };
    let account_id = state.accounts.authenticate(request).await?;
    session.persist_account(&account_id)?;
    info!(%account_id, "account logged in");
    let summary = state.accounts_query.profile(&account_id).await?;
    Ok(web::Json(summary))
}

/// The logged-in account.
#[utoipa::path(
    get,
    path = "/api/contas/me",
    responses(
        (status = 200, description = "Account", body = AccountSummary),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "currentAccount"
)]
#[get("/me")]
pub async fn current_account(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<AccountSummary>> {
    let account_id = session.require_account_id()?;
    let summary = state.accounts_query.profile(&account_id).await?;
    Ok(web::Json(summary))
}

/// Add a viewer profile within the plan's profile limit.
#[utoipa::path(
    post,
    path = "/api/contas/me/perfis",
    request_body = AddProfileBody,
    responses(
        (status = 201, description = "Profile created", body = Profile),
        (status = 400, description = "Invalid profile or limit reached", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "addProfile"
)]
#[post("/me/perfis")]
pub async fn add_profile(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<AddProfileBody>,
) -> ApiResult<HttpResponse> {
    let account_id = session.require_account_id()?;
    let body = payload.into_inner();
    let request = AddProfileRequest {
        account_id,
        name: require_text(body.name, "name")?,
        avatar: body.avatar.filter(|avatar| !avatar.trim().is_empty()),
        age_rating: body.age_rating.unwrap_or_default(),
    };
    let profile = state.accounts.add_profile(request).await?;
    Ok(HttpResponse::Created().json(profile))
}

/// Register the calling device, refreshing it when already known.
#[utoipa::path(
    post,
    path = "/api/contas/me/dispositivos",
    request_body = RegisterDeviceBody,
    responses(
        (status = 201, description = "Device registered", body = Device),
        (status = 400, description = "Invalid device or screen limit reached", body = ErrorSchema),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "registerDevice"
)]
#[post("/me/dispositivos")]
pub async fn register_device(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    payload: web::Json<RegisterDeviceBody>,
) -> ApiResult<HttpResponse> {
    let account_id = session.require_account_id()?;
    let body = payload.into_inner();
    let ip = request
        .connection_info()
        .realip_remote_addr()
        .map(str::to_owned);
    let device = state
        .accounts
        .register_device(RegisterDeviceRequest {
            account_id,
            device_id: require_text(body.device_id, "deviceId")?,
            name: require_text(body.name, "name")?,
            kind: body.kind,
            ip,
        })
        .await?;
    Ok(HttpResponse::Created().json(device))
}

/// Register every account route on `scope`.
pub fn configure(scope: Scope) -> Scope {
    scope
        .service(register)
        .service(login)
        .service(current_account)
        .service(add_profile)
        .service(register_device)
}

#[cfg(test)]
mod tests;
