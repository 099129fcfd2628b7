//! REST backend client.
//!
//! Implements [`AuthProvider`] and [`StoreProvider`] against the backend's
//! JSON API. Authentication endpoints answer with an envelope
//! `{ success, message, user?, requiresConfirmation? }`; store endpoints
//! return their records directly.
//!
//! Every answer is turned into the engine's error taxonomy here, so the flow
//! never sees HTTP status codes.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use url::Url;

use tienda_core::{Email, Identity, Store, StoreId, StoreListing, StoreSettings, UserId};

use crate::config::AccessConfig;
use crate::error::{AuthError, StoreError};
use crate::provider::{AuthProvider, Registration, RegistrationOutcome, Reply, StoreProvider};

const UNAVAILABLE_MESSAGE: &str = "No se pudo conectar con el servidor.";
const BAD_RESPONSE_MESSAGE: &str = "Respuesta inválida del servidor.";
const NOT_SAVED_MESSAGE: &str = "No se pudo guardar el cambio. Inténtalo de nuevo.";

/// Backend API client.
#[derive(Clone)]
pub struct ApiClient {
    /// HTTP client.
    client: Client,
    /// API base URL, ending in `/`.
    base: Url,
    /// Optional bearer token.
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// Authentication response envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<Identity>,
    #[serde(default)]
    requires_confirmation: bool,
}

/// Status and body of a completed request.
struct Raw {
    status: StatusCode,
    body: String,
}

/// Which authentication endpoint answered; decides how rejections map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthCall {
    Login,
    Register,
    Verify,
    Federated,
}

impl AuthCall {
    const fn default_rejection(self) -> &'static str {
        match self {
            Self::Login | Self::Federated => "Credenciales inválidas.",
            Self::Register => "Error en el registro.",
            Self::Verify => "Código de verificación inválido.",
        }
    }

    const fn default_success(self) -> &'static str {
        match self {
            Self::Login | Self::Federated => "Inicio de sesión exitoso.",
            Self::Register => "Registro exitoso.",
            Self::Verify => "Cuenta verificada. Ya puedes iniciar sesión.",
        }
    }

    fn rejection(self, message: String) -> AuthError {
        match self {
            Self::Login | Self::Federated => AuthError::InvalidCredentials(message),
            Self::Register => AuthError::DuplicateRegistration(message),
            Self::Verify => AuthError::InvalidVerificationCode(message),
        }
    }
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(config: &AccessConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            base: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }

    fn search_url(&self, term: &str) -> Result<Url, url::ParseError> {
        let mut url = self.endpoint("tiendas/search")?;
        url.query_pairs_mut().append_pair("q", term);
        Ok(url)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<Raw, reqwest::Error> {
        let mut request = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, "Backend responded");
        Ok(Raw { status, body })
    }

    async fn auth_call(
        &self,
        call: AuthCall,
        path: &str,
        body: Value,
    ) -> Result<Reply<Envelope>, AuthError> {
        let url = self.endpoint(path).map_err(|e| {
            warn!(error = %e, path, "Invalid backend endpoint");
            AuthError::ProviderUnavailable(UNAVAILABLE_MESSAGE.to_string())
        })?;
        let raw = self.execute(Method::POST, url, Some(body)).await.map_err(|e| {
            warn!(error = %e, path, "Backend request failed");
            AuthError::ProviderUnavailable(UNAVAILABLE_MESSAGE.to_string())
        })?;
        interpret_auth(call, raw.status, &raw.body)
    }

    async fn store_request(
        &self,
        method: Method,
        url: Result<Url, url::ParseError>,
        body: Option<Value>,
    ) -> Result<Raw, StoreError> {
        let url = url.map_err(|e| {
            warn!(error = %e, "Invalid backend endpoint");
            StoreError::Unavailable(UNAVAILABLE_MESSAGE.to_string())
        })?;
        self.execute(method, url, body).await.map_err(|e| {
            warn!(error = %e, "Backend request failed");
            StoreError::Unavailable(UNAVAILABLE_MESSAGE.to_string())
        })
    }

    async fn store_call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Result<Url, url::ParseError>,
        body: Option<Value>,
    ) -> Result<T, StoreError> {
        let raw = self.store_request(method, url, body).await?;
        decode_store(raw.status, &raw.body)
    }

    /// `PUT` an owner-only change and check the backend acknowledged it.
    async fn admin_update(
        &self,
        url: Result<Url, url::ParseError>,
        body: Value,
    ) -> Result<(), StoreError> {
        let raw = self.store_request(Method::PUT, url, Some(body)).await?;
        if matches!(raw.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(StoreError::Forbidden);
        }
        acknowledged(decode_store(raw.status, &raw.body)?)
    }
}

#[async_trait]
impl AuthProvider for ApiClient {
    #[instrument(skip_all)]
    async fn check_credentials(
        &self,
        contact: &str,
        password: &SecretString,
    ) -> Result<Reply<Identity>, AuthError> {
        let body = json!({ "contact": contact, "password": password.expose_secret() });
        let reply = self.auth_call(AuthCall::Login, "login", body).await?;
        signed_in(reply)
    }

    #[instrument(skip_all, fields(role = %registration.role))]
    async fn register(
        &self,
        registration: &Registration,
    ) -> Result<Reply<RegistrationOutcome>, AuthError> {
        let body = json!({
            "name": registration.name,
            "phone": registration.phone,
            "email": registration.email,
            "password": registration.password.expose_secret(),
            "role": registration.role,
        });
        let reply = self.auth_call(AuthCall::Register, "register", body).await?;
        Ok(Reply::new(reply.message, registration_outcome(reply.value)))
    }

    #[instrument(skip_all)]
    async fn verify(&self, email: &Email, code: &str) -> Result<Reply<()>, AuthError> {
        let body = json!({ "email": email, "code": code });
        let reply = self.auth_call(AuthCall::Verify, "verify-email", body).await?;
        Ok(Reply::new(reply.message, ()))
    }

    #[instrument(skip_all)]
    async fn federated_exchange(&self, token: &SecretString) -> Result<Reply<Identity>, AuthError> {
        let body = json!({ "credential": token.expose_secret() });
        let reply = self.auth_call(AuthCall::Federated, "auth/google", body).await?;
        signed_in(reply)
    }
}

#[async_trait]
impl StoreProvider for ApiClient {
    #[instrument(skip(self))]
    async fn search_stores(&self, term: &str) -> Result<Vec<StoreListing>, StoreError> {
        self.store_call(Method::GET, self.search_url(term), None).await
    }

    #[instrument(skip(self))]
    async fn store(&self, store_id: StoreId) -> Result<Store, StoreError> {
        self.store_call(Method::GET, self.endpoint(&format!("tiendas/{store_id}")), None)
            .await
    }

    #[instrument(skip(self, pin))]
    async fn verify_pin(&self, store_id: StoreId, pin: &SecretString) -> Result<bool, StoreError> {
        #[derive(Deserialize)]
        struct PinCheck {
            #[serde(default)]
            success: bool,
        }

        let url = self.endpoint(&format!("tiendas/{store_id}/verify-pin"));
        let body = json!({ "pin": pin.expose_secret() });
        let raw = self.store_request(Method::POST, url, Some(body)).await?;

        // The backend answers a wrong PIN with 401.
        if matches!(raw.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(false);
        }
        decode_store::<PinCheck>(raw.status, &raw.body).map(|check| check.success)
    }

    #[instrument(skip(self))]
    async fn assign_store(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Identity, StoreError> {
        let url = self.endpoint(&format!("users/{user_id}/assign-tienda"));
        let envelope: Envelope = self
            .store_call(Method::POST, url, Some(json!({ "tiendaId": store_id })))
            .await?;
        match envelope.user {
            Some(identity) if envelope.success => Ok(identity),
            _ => Err(StoreError::Unavailable(
                envelope
                    .message
                    .unwrap_or_else(|| BAD_RESPONSE_MESSAGE.to_string()),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn create_store(&self, name: &str) -> Result<Store, StoreError> {
        self.store_call(Method::POST, self.endpoint("tiendas"), Some(json!({ "name": name })))
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_identity(&self, user_id: UserId) -> Result<Identity, StoreError> {
        self.store_call(Method::GET, self.endpoint(&format!("users/{user_id}")), None)
            .await
    }

    #[instrument(skip(self, pin))]
    async fn update_pin(&self, store_id: StoreId, pin: &SecretString) -> Result<(), StoreError> {
        let url = self.endpoint(&format!("tiendas/{store_id}/pin"));
        self.admin_update(url, json!({ "pin": pin.expose_secret() })).await
    }

    #[instrument(skip(self, settings))]
    async fn update_settings(
        &self,
        store_id: StoreId,
        settings: &StoreSettings,
    ) -> Result<(), StoreError> {
        let url = self.endpoint(&format!("tiendas/{store_id}/settings"));
        self.admin_update(url, json!(settings)).await
    }

    #[instrument(skip(self))]
    async fn store_staff(&self, store_id: StoreId) -> Result<Vec<Identity>, StoreError> {
        self.store_call(Method::GET, self.endpoint(&format!("tiendas/{store_id}/users")), None)
            .await
    }
}

/// Map an authentication endpoint's answer onto the error taxonomy.
fn interpret_auth(
    call: AuthCall,
    status: StatusCode,
    body: &str,
) -> Result<Reply<Envelope>, AuthError> {
    let parsed = serde_json::from_str::<Envelope>(body);
    let message = parsed
        .as_ref()
        .ok()
        .and_then(|e| e.message.clone())
        .filter(|m| !m.trim().is_empty());

    if status.is_server_error() {
        return Err(AuthError::ProviderUnavailable(
            message.unwrap_or_else(|| UNAVAILABLE_MESSAGE.to_string()),
        ));
    }

    match parsed {
        Ok(envelope) if status.is_success() && envelope.success => Ok(Reply::new(
            message.unwrap_or_else(|| call.default_success().to_string()),
            envelope,
        )),
        Err(_) if status.is_success() => Err(AuthError::ProviderUnavailable(
            BAD_RESPONSE_MESSAGE.to_string(),
        )),
        _ => Err(call.rejection(message.unwrap_or_else(|| call.default_rejection().to_string()))),
    }
}

fn signed_in(reply: Reply<Envelope>) -> Result<Reply<Identity>, AuthError> {
    let identity = reply
        .value
        .user
        .ok_or_else(|| AuthError::ProviderUnavailable(BAD_RESPONSE_MESSAGE.to_string()))?;
    Ok(Reply::new(reply.message, identity))
}

/// Confirmation wins over an included user; a bare success leaves the user
/// to sign in.
fn registration_outcome(envelope: Envelope) -> RegistrationOutcome {
    match (envelope.requires_confirmation, envelope.user) {
        (true, _) => RegistrationOutcome::ConfirmationRequired,
        (false, Some(identity)) => RegistrationOutcome::SignedIn(identity),
        (false, None) => RegistrationOutcome::Registered,
    }
}

fn acknowledged(envelope: Envelope) -> Result<(), StoreError> {
    if envelope.success {
        Ok(())
    } else {
        Err(StoreError::Unavailable(
            envelope
                .message
                .unwrap_or_else(|| NOT_SAVED_MESSAGE.to_string()),
        ))
    }
}

/// Map a store endpoint's answer onto `StoreError`.
fn decode_store<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, StoreError> {
    match status {
        StatusCode::NOT_FOUND => return Err(StoreError::NotFound),
        s if !s.is_success() => {
            let message = serde_json::from_str::<Envelope>(body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| UNAVAILABLE_MESSAGE.to_string());
            return Err(StoreError::Unavailable(message));
        }
        _ => {}
    }

    serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Unexpected store response");
        StoreError::Unavailable(BAD_RESPONSE_MESSAGE.to_string())
    })
}
