//! Authentication flow: login, registration, email verification and
//! federated sign-in, driven to a consistent landing destination.
//!
//! # States
//!
//! ```text
//!  LoginForm <------ toggle_view ------> RegisterForm
//!  RegisterForm ---- submit_register --> PendingVerification   code emailed
//!  RegisterForm ---- submit_register --> LoginForm             registered, sign in next
//!  PendingVerification -- submit_code --> Verified -- 2s --> LoginForm
//!  PendingVerification -- toggle_view --> LoginForm             ticket abandoned
//!  Verified ------------- toggle_view --> requested form
//!  LoginForm / RegisterForm -- submit_login / submit_federated / submit_register --> Done
//! ```
//!
//! Provider failures never move the state machine: the message is surfaced
//! through [`AuthFlow::feedback`] and the user can retry. Only one submission
//! may be in flight at a time; a second one, or a form toggle, is rejected
//! with [`FlowError::Busy`] without reaching the provider.
//!
//! Delayed actions (the post-login redirect and the return to the login form
//! after verification) are guarded: they only fire if nothing changed in the
//! meantime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use tienda_core::{Destination, Email, Identity, Role};

use crate::error::{AuthError, FlowError};
use crate::in_flight::InFlight;
use crate::navigation::Navigator;
use crate::policy;
use crate::provider::{AuthProvider, Registration, RegistrationOutcome, Reply};
use crate::session::SessionStore;

/// Delay before navigating away after a successful sign-in.
pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_secs(1);

/// Delay before returning to the login form after verification.
pub const VERIFICATION_RETURN_DELAY: Duration = Duration::from_secs(2);

/// Which form the flow starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthView {
    /// Login form.
    #[default]
    Login,
    /// Registration form.
    Register,
}

impl AuthView {
    /// Read the `view` query parameter: `register` selects the registration
    /// form, anything else the login form.
    #[must_use]
    pub fn from_query(view: Option<&str>) -> Self {
        match view.map(str::trim) {
            Some("register") => Self::Register,
            _ => Self::Login,
        }
    }

    const fn state(self) -> FlowState {
        match self {
            Self::Login => FlowState::LoginForm,
            Self::Register => FlowState::RegisterForm,
        }
    }
}

/// Registration waiting for its emailed code. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationTicket {
    /// Address the code was sent to.
    pub email: Email,
    /// When the registration succeeded.
    pub issued_at: DateTime<Utc>,
}

/// State of the authentication flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// Waiting for contact and password, or a federated token.
    LoginForm,
    /// Waiting for registration details.
    RegisterForm,
    /// Waiting for the emailed verification code.
    PendingVerification(VerificationTicket),
    /// Code accepted; the login form comes back after the verification delay.
    Verified,
    /// Signed in; navigation to the landing destination is scheduled.
    Done,
}

impl FlowState {
    const fn describe(&self) -> &'static str {
        match self {
            Self::LoginForm => "on the login form",
            Self::RegisterForm => "on the registration form",
            Self::PendingVerification(_) => "verification is pending",
            Self::Verified => "verification succeeded",
            Self::Done => "signed in",
        }
    }
}

/// Messages for the presentation layer to display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    /// Last failure message.
    pub error: Option<String>,
    /// Last success message.
    pub success: Option<String>,
}

/// Delays applied after successful submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTimings {
    /// Wait before navigating to the landing destination.
    pub login_redirect: Duration,
    /// Wait before returning to the login form after verification.
    pub verification_return: Duration,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            login_redirect: LOGIN_REDIRECT_DELAY,
            verification_return: VERIFICATION_RETURN_DELAY,
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Signed in; navigation to `landing` is scheduled.
    SignedIn {
        /// Where the user will land.
        landing: Destination,
    },
    /// Registered without confirmation or sign-in; back on the login form.
    Registered,
    /// Registered; a code was sent to `email`.
    VerificationPending {
        /// Address the code was sent to.
        email: Email,
    },
    /// Verified; the login form comes back after the verification delay.
    Verified,
}

/// Drives the authentication forms to a signed-in session.
///
/// Cloning is cheap and clones share the same state.
#[derive(Clone)]
pub struct AuthFlow {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn AuthProvider>,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    timings: FlowTimings,
    state: Mutex<FlowState>,
    feedback: Mutex<Feedback>,
    epoch: AtomicU64,
    in_flight: AtomicBool,
    scheduled: Mutex<Option<JoinHandle<()>>>,
}

impl AuthFlow {
    /// Create a flow starting on `view`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        view: AuthView,
        timings: FlowTimings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                session,
                navigator,
                timings,
                state: Mutex::new(view.state()),
                feedback: Mutex::new(Feedback::default()),
                epoch: AtomicU64::new(0),
                in_flight: AtomicBool::new(false),
                scheduled: Mutex::new(None),
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FlowState {
        lock(&self.inner.state).clone()
    }

    /// Messages to display.
    #[must_use]
    pub fn feedback(&self) -> Feedback {
        lock(&self.inner.feedback).clone()
    }

    /// Returns `true` while a submission is waiting on the provider.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Sign in with a contact (email or phone) and password.
    ///
    /// # Errors
    ///
    /// `Busy`, `InvalidState` and `InvalidInput` are returned without
    /// contacting the provider. `Provider` carries the provider's rejection,
    /// which is also surfaced through [`AuthFlow::feedback`].
    #[instrument(skip_all)]
    pub async fn submit_login(
        &self,
        contact: &str,
        password: &SecretString,
    ) -> Result<Transition, FlowError> {
        let _latch = self.begin("submit_login", |s| matches!(s, FlowState::LoginForm))?;

        let contact = contact.trim();
        if contact.is_empty() || password.expose_secret().is_empty() {
            return Err(self.reject_input("Ingresa tu correo o teléfono y tu contraseña."));
        }

        match self.inner.provider.check_credentials(contact, password).await {
            Ok(reply) => Ok(self.sign_in(reply)),
            Err(e) => Err(self.fail("login", e)),
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Same contract as [`AuthFlow::submit_login`].
    #[instrument(skip_all, fields(role = %role))]
    pub async fn submit_register(
        &self,
        name: &str,
        phone: &str,
        email: &str,
        password: SecretString,
        role: Role,
    ) -> Result<Transition, FlowError> {
        let _latch = self.begin("submit_register", |s| matches!(s, FlowState::RegisterForm))?;

        let (name, phone) = (name.trim(), phone.trim());
        if name.is_empty() || phone.is_empty() || password.expose_secret().is_empty() {
            return Err(self.reject_input("Completa todos los campos."));
        }
        let Ok(email) = Email::parse(email) else {
            return Err(self.reject_input("Correo electrónico inválido."));
        };

        let registration = Registration {
            name: name.to_owned(),
            phone: phone.to_owned(),
            email,
            password,
            role,
        };

        let reply = match self.inner.provider.register(&registration).await {
            Ok(reply) => reply,
            Err(e) => return Err(self.fail("registration", e)),
        };

        match reply.value {
            RegistrationOutcome::ConfirmationRequired => {
                let ticket = VerificationTicket {
                    email: registration.email,
                    issued_at: Utc::now(),
                };
                info!(email_domain = ticket.email.domain(), "Registration awaiting verification");
                self.inner.succeed(reply.message);
                let email = ticket.email.clone();
                self.inner.transition(FlowState::PendingVerification(ticket));
                Ok(Transition::VerificationPending { email })
            }
            RegistrationOutcome::Registered => {
                info!(
                    email_domain = registration.email.domain(),
                    "Registered, sign in to continue"
                );
                self.inner.succeed(reply.message);
                self.inner.transition(FlowState::LoginForm);
                Ok(Transition::Registered)
            }
            RegistrationOutcome::SignedIn(identity) => {
                Ok(self.sign_in(Reply::new(reply.message, identity)))
            }
        }
    }

    /// Submit the emailed verification code.
    ///
    /// # Errors
    ///
    /// Same contract as [`AuthFlow::submit_login`]. On failure the ticket is
    /// kept so the user can retry.
    #[instrument(skip_all)]
    pub async fn submit_code(&self, code: &str) -> Result<Transition, FlowError> {
        let _latch = self.begin("submit_code", |s| {
            matches!(s, FlowState::PendingVerification(_))
        })?;

        let FlowState::PendingVerification(ticket) = self.state() else {
            return Err(FlowError::InvalidState {
                action: "submit_code",
                state: self.state().describe(),
            });
        };

        let code = code.trim();
        if code.is_empty() {
            return Err(self.reject_input("Ingresa el código de verificación."));
        }

        match self.inner.provider.verify(&ticket.email, code).await {
            Ok(reply) => {
                info!(email_domain = ticket.email.domain(), "Email verified");
                self.inner.succeed(reply.message);
                self.inner.transition(FlowState::Verified);
                let epoch = self.inner.epoch.load(Ordering::SeqCst);
                self.schedule(self.inner.timings.verification_return, move |inner| {
                    if inner.epoch.load(Ordering::SeqCst) == epoch {
                        inner.transition(FlowState::LoginForm);
                    } else {
                        debug!("Flow moved on before returning to login, skipping");
                    }
                });
                Ok(Transition::Verified)
            }
            Err(e) => Err(self.fail("verification", e)),
        }
    }

    /// Sign in with a token from the federated identity provider.
    ///
    /// Federated callbacks arrive here like any other submission; the button
    /// is offered on both forms.
    ///
    /// # Errors
    ///
    /// Same contract as [`AuthFlow::submit_login`].
    #[instrument(skip_all)]
    pub async fn submit_federated(&self, token: &SecretString) -> Result<Transition, FlowError> {
        let _latch = self.begin("submit_federated", |s| {
            matches!(s, FlowState::LoginForm | FlowState::RegisterForm)
        })?;

        if token.expose_secret().trim().is_empty() {
            return Err(self.reject_input("No se recibió la credencial de Google."));
        }

        match self.inner.provider.federated_exchange(token).await {
            Ok(reply) => Ok(self.sign_in(reply)),
            Err(e) => Err(self.fail("federated sign-in", e)),
        }
    }

    /// Switch between the login and registration forms.
    ///
    /// While verification is pending this abandons the ticket and goes back
    /// to the login form. Messages are cleared either way.
    ///
    /// # Errors
    ///
    /// Returns `Busy` while a submission is in flight and `InvalidState` once
    /// signed in.
    pub fn toggle_view(&self, target: AuthView) -> Result<FlowState, FlowError> {
        let Some(_latch) = InFlight::acquire(&self.inner.in_flight) else {
            debug!("Toggle rejected, a submission is in flight");
            return Err(FlowError::Busy);
        };

        let next = {
            let current = lock(&self.inner.state);
            match &*current {
                FlowState::Done => {
                    return Err(FlowError::InvalidState {
                        action: "toggle_view",
                        state: current.describe(),
                    });
                }
                FlowState::PendingVerification(ticket) => {
                    info!(email_domain = ticket.email.domain(), "Verification abandoned");
                    FlowState::LoginForm
                }
                FlowState::LoginForm | FlowState::RegisterForm | FlowState::Verified => {
                    target.state()
                }
            }
        };

        *lock(&self.inner.feedback) = Feedback::default();
        self.inner.transition(next.clone());
        Ok(next)
    }

    /// Sign out and go back to the login screen.
    pub fn logout(&self) {
        self.inner.session.clear();
        *lock(&self.inner.feedback) = Feedback::default();
        self.inner.transition(FlowState::LoginForm);
        info!("Signed out");
        self.inner.navigator.navigate(Destination::AuthGate);
    }

    /// Wait for the most recently scheduled delayed action to run.
    pub async fn settle(&self) {
        let Some(handle) = lock(&self.inner.scheduled).take() else {
            return;
        };
        if let Err(e) = handle.await {
            warn!(error = %e, "Scheduled transition did not complete");
        }
    }

    fn begin(
        &self,
        action: &'static str,
        allowed: impl FnOnce(&FlowState) -> bool,
    ) -> Result<InFlight<'_>, FlowError> {
        let Some(latch) = InFlight::acquire(&self.inner.in_flight) else {
            debug!(action, "Submission rejected, another is in flight");
            return Err(FlowError::Busy);
        };

        let state = lock(&self.inner.state);
        if !allowed(&state) {
            return Err(FlowError::InvalidState {
                action,
                state: state.describe(),
            });
        }

        Ok(latch)
    }

    fn sign_in(&self, reply: Reply<Identity>) -> Transition {
        let identity = reply.value;
        let landing = policy::landing(Some(&identity));
        info!(
            user_id = %identity.user_id,
            role = %identity.role,
            landing = %landing,
            "Signed in"
        );

        self.inner.session.set(identity);
        self.inner.succeed(reply.message);
        self.inner.transition(FlowState::Done);

        let generation = self.inner.session.generation();
        self.schedule(self.inner.timings.login_redirect, move |inner| {
            if inner.session.generation() == generation {
                inner.navigator.navigate(landing);
            } else {
                debug!(landing = %landing, "Session changed before redirect, skipping");
            }
        });

        Transition::SignedIn { landing }
    }

    fn fail(&self, action: &'static str, error: AuthError) -> FlowError {
        match &error {
            AuthError::ProviderUnavailable(_) => {
                warn!(action, error = %error, "Provider unavailable");
            }
            _ => info!(action, error = %error, "Provider rejected request"),
        }

        *lock(&self.inner.feedback) = Feedback {
            error: Some(error.message()),
            success: None,
        };
        FlowError::Provider(error)
    }

    fn reject_input(&self, message: &str) -> FlowError {
        *lock(&self.inner.feedback) = Feedback {
            error: Some(message.to_owned()),
            success: None,
        };
        FlowError::InvalidInput(message.to_owned())
    }

    fn schedule(&self, delay: Duration, action: impl FnOnce(&Inner) + Send + 'static) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action(&inner);
        });

        // The previous task keeps running detached; its own guard decides
        // whether it still applies.
        let _previous = lock(&self.inner.scheduled).replace(handle);
    }
}

impl Inner {
    fn transition(&self, next: FlowState) {
        *lock(&self.state) = next;
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn succeed(&self, message: String) {
        *lock(&self.feedback) = Feedback {
            error: None,
            success: Some(message),
        };
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tienda_core::{StoreId, UserId};

    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::storage::MemoryStorage;

    /// Provider that signs in one staff member with a store, and otherwise
    /// answers with fixed rejections.
    #[derive(Default)]
    struct StubProvider {
        calls: AtomicUsize,
    }

    fn staff() -> Identity {
        Identity::new(UserId::new(7), Role::Staff, "Luis", Email::parse("luis@x.com").unwrap())
            .with_store(StoreId::new(42))
    }

    #[async_trait]
    impl AuthProvider for StubProvider {
        async fn check_credentials(
            &self,
            contact: &str,
            password: &SecretString,
        ) -> Result<Reply<Identity>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if contact == "luis@x.com" && password.expose_secret() == "pw" {
                Ok(Reply::new("Bienvenido", staff()))
            } else {
                Err(AuthError::InvalidCredentials("Credenciales inválidas.".to_string()))
            }
        }

        async fn register(
            &self,
            _registration: &Registration,
        ) -> Result<Reply<RegistrationOutcome>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::new("Revisa tu correo", RegistrationOutcome::ConfirmationRequired))
        }

        async fn verify(&self, _email: &Email, code: &str) -> Result<Reply<()>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if code == "123456" {
                Ok(Reply::new("Cuenta verificada", ()))
            } else {
                Err(AuthError::InvalidVerificationCode("Código inválido".to_string()))
            }
        }

        async fn federated_exchange(
            &self,
            _token: &SecretString,
        ) -> Result<Reply<Identity>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AuthError::ProviderUnavailable("sin conexión".to_string()))
        }
    }

    type Fixture = (AuthFlow, Arc<StubProvider>, Arc<SessionStore>, Arc<RecordingNavigator>);

    fn flow(view: AuthView) -> Fixture {
        let provider = Arc::new(StubProvider::default());
        let session = Arc::new(SessionStore::restore(Arc::new(MemoryStorage::new())));
        let navigator = Arc::new(RecordingNavigator::new());
        let flow = AuthFlow::new(
            provider.clone(),
            session.clone(),
            navigator.clone(),
            view,
            FlowTimings::default(),
        );
        (flow, provider, session, navigator)
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[test]
    fn test_view_from_query() {
        assert_eq!(AuthView::from_query(Some("register")), AuthView::Register);
        assert_eq!(AuthView::from_query(Some("login")), AuthView::Login);
        assert_eq!(AuthView::from_query(Some("other")), AuthView::Login);
        assert_eq!(AuthView::from_query(None), AuthView::Login);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_success_navigates_after_delay() {
        let (flow, _, session, navigator) = flow(AuthView::Login);

        let transition = flow.submit_login(" luis@x.com ", &secret("pw")).await.unwrap();
        assert_eq!(
            transition,
            Transition::SignedIn {
                landing: Destination::Landing
            }
        );
        assert_eq!(flow.state(), FlowState::Done);
        assert_eq!(flow.feedback().success.as_deref(), Some("Bienvenido"));
        assert!(session.is_signed_in());
        assert!(navigator.visits().is_empty());

        flow.settle().await;
        assert_eq!(navigator.visits(), vec![Destination::Landing]);
    }

    #[tokio::test]
    async fn test_login_failure_keeps_state() {
        let (flow, _, session, _) = flow(AuthView::Login);

        let err = flow.submit_login("luis@x.com", &secret("nope")).await.unwrap_err();
        assert!(matches!(err, FlowError::Provider(AuthError::InvalidCredentials(_))));
        assert_eq!(flow.state(), FlowState::LoginForm);
        assert_eq!(flow.feedback().error.as_deref(), Some("Credenciales inválidas."));
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_blank_input_skips_provider() {
        let (flow, provider, _, _) = flow(AuthView::Login);
        let err = flow.submit_login("  ", &secret("pw")).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_state_skips_provider() {
        let (flow, provider, _, _) = flow(AuthView::Register);
        let err = flow.submit_login("luis@x.com", &secret("pw")).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidState { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_login_is_debounced() {
        let (flow, provider, _, _) = flow(AuthView::Login);
        let password = secret("pw");

        let (first, second) = tokio::join!(
            flow.submit_login("luis@x.com", &password),
            flow.submit_login("luis@x.com", &password),
        );

        assert!(first.is_ok());
        assert_eq!(second, Err(FlowError::Busy));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_returns_to_login() {
        let (flow, _, _, _) = flow(AuthView::Register);

        let transition = flow
            .submit_register("Ana", "555", "ana@x.com", secret("pw"), Role::Owner)
            .await
            .unwrap();
        assert!(matches!(transition, Transition::VerificationPending { .. }));

        assert!(flow.submit_code("000000").await.is_err());
        assert!(matches!(flow.state(), FlowState::PendingVerification(_)));

        assert_eq!(flow.submit_code("123456").await.unwrap(), Transition::Verified);
        assert_eq!(flow.state(), FlowState::Verified);
        flow.settle().await;
        assert_eq!(flow.state(), FlowState::LoginForm);
        assert_eq!(flow.feedback().success.as_deref(), Some("Cuenta verificada"));
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_email() {
        let (flow, provider, _, _) = flow(AuthView::Register);
        let err = flow
            .submit_register("Ana", "555", "ana", secret("pw"), Role::Staff)
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::InvalidInput("Correo electrónico inválido.".to_string()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_federated_unavailable_is_surfaced() {
        let (flow, _, _, _) = flow(AuthView::Register);
        let err = flow.submit_federated(&secret("google-jwt")).await.unwrap_err();
        assert!(matches!(err, FlowError::Provider(AuthError::ProviderUnavailable(_))));
        assert_eq!(flow.state(), FlowState::RegisterForm);
        assert_eq!(flow.feedback().error.as_deref(), Some("sin conexión"));
    }

    #[tokio::test]
    async fn test_toggle_clears_feedback() {
        let (flow, _, _, _) = flow(AuthView::Login);
        let _ = flow.submit_login("luis@x.com", &secret("bad")).await;
        assert!(flow.feedback().error.is_some());

        assert_eq!(flow.toggle_view(AuthView::Register).unwrap(), FlowState::RegisterForm);
        assert_eq!(flow.feedback(), Feedback::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_rejected_when_done_and_logout_resets() {
        let (flow, _, session, navigator) = flow(AuthView::Login);
        flow.submit_login("luis@x.com", &secret("pw")).await.unwrap();
        assert!(flow.toggle_view(AuthView::Register).is_err());

        flow.logout();
        assert_eq!(flow.state(), FlowState::LoginForm);
        assert!(!session.is_signed_in());
        assert_eq!(navigator.last(), Some(Destination::AuthGate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_code_is_not_resubmitted_after_success() {
        let (flow, provider, _, _) = flow(AuthView::Register);
        flow.submit_register("Ana", "555", "ana@x.com", secret("pw"), Role::Owner)
            .await
            .unwrap();
        flow.submit_code("123456").await.unwrap();
        let calls = provider.calls.load(Ordering::SeqCst);

        let err = flow.submit_code("123456").await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidState { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), calls);
        assert_eq!(flow.feedback().success.as_deref(), Some("Cuenta verificada"));
    }

    #[tokio::test]
    async fn test_toggle_is_rejected_while_submission_in_flight() {
        let (flow, _, _, _) = flow(AuthView::Login);
        let password = secret("pw");

        let (login, toggle) = tokio::join!(flow.submit_login("luis@x.com", &password), async {
            flow.toggle_view(AuthView::Register)
        });

        assert_eq!(toggle, Err(FlowError::Busy));
        assert!(login.is_ok());
        assert_eq!(flow.state(), FlowState::Done);
    }
}
