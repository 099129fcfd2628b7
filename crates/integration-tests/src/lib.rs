//! End-to-end tests for the Tienda access engine.
//!
//! The tests under `tests/` wire the real session store, route guard,
//! authentication flow and store onboarding to [`FakeBackend`], an in-memory
//! backend that keeps accounts and stores the way the REST API does.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tienda-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Notify;

use tienda_access::{
    AuthError, AuthFlow, AuthProvider, AuthView, FlowTimings, MemoryStorage, RecordingNavigator,
    Registration, RegistrationOutcome, Reply, RouteGuard, SessionStore, SnapshotStorage,
    StoreError, StoreOnboarding, StoreProvider,
};
use tienda_core::{Email, Identity, Role, Store, StoreId, StoreListing, StoreSettings, UserId};

/// Code the fake backend "emails" on every registration.
pub const VERIFICATION_CODE: &str = "482913";

/// Token prefix the fake backend accepts for federated sign-in.
pub const GOOGLE_TOKEN_PREFIX: &str = "google:";

struct Account {
    identity: Identity,
    password: String,
    verified: bool,
}

struct StoreRecord {
    store: Store,
    pin: String,
}

#[derive(Default)]
struct Records {
    accounts: Vec<Account>,
    stores: Vec<StoreRecord>,
    next_user: i64,
    next_store: i64,
}

/// In-memory backend implementing both provider contracts.
#[derive(Default)]
pub struct FakeBackend {
    records: Mutex<Records>,
    calls: Mutex<HashMap<&'static str, usize>>,
    down: AtomicBool,
    skip_confirmation: AtomicBool,
    login_gate: Mutex<Option<Arc<Notify>>>,
    logins_waiting: AtomicUsize,
}

impl FakeBackend {
    /// Empty backend that emails a verification code on registration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate new accounts immediately instead of emailing a code.
    pub fn skip_confirmation(&self) {
        self.skip_confirmation.store(true, Ordering::SeqCst);
    }

    /// Current staff PIN of `store_id`.
    #[must_use]
    pub fn pin(&self, store_id: StoreId) -> Option<String> {
        lock(&self.records)
            .stores
            .iter()
            .find(|r| r.store.id == store_id)
            .map(|r| r.pin.clone())
    }

    /// Add a verified account and return its identity.
    pub fn add_account(&self, name: &str, email: &str, password: &str, role: Role) -> Identity {
        let mut records = lock(&self.records);
        records.next_user += 1;
        let identity = Identity::new(
            UserId::new(records.next_user),
            role,
            name,
            Email::parse(email).unwrap_or_else(|e| panic!("bad fixture email {email}: {e}")),
        );
        records.accounts.push(Account {
            identity: identity.clone(),
            password: password.to_string(),
            verified: true,
        });
        identity
    }

    /// Add a store with a staff PIN, owned by `owner`.
    pub fn add_store(&self, id: i64, name: &str, owner: UserId, pin: &str) -> Store {
        let store = Store {
            id: StoreId::new(id),
            name: name.to_string(),
            owner_id: owner,
            email: None,
            phone: None,
            image: None,
        };
        let mut records = lock(&self.records);
        records.next_store = records.next_store.max(id);
        if let Some(account) = records
            .accounts
            .iter_mut()
            .find(|a| a.identity.user_id == owner && a.identity.store_id.is_none())
        {
            account.identity.store_id = Some(store.id);
        }
        records.stores.push(StoreRecord {
            store: store.clone(),
            pin: pin.to_string(),
        });
        store
    }

    /// Make every call fail with a transport error.
    pub fn take_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    /// Hold every credential check until [`FakeBackend::open_gate`] is called.
    pub fn close_gate(&self) {
        *lock(&self.login_gate) = Some(Arc::new(Notify::new()));
    }

    /// Release held credential checks.
    pub fn open_gate(&self) {
        if let Some(gate) = lock(&self.login_gate).take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Number of credential checks currently held at the gate.
    #[must_use]
    pub fn logins_waiting(&self) -> usize {
        self.logins_waiting.load(Ordering::SeqCst)
    }

    /// How many times `operation` reached the backend.
    #[must_use]
    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    /// The backend's current view of a user.
    #[must_use]
    pub fn identity(&self, user_id: UserId) -> Option<Identity> {
        lock(&self.records)
            .accounts
            .iter()
            .find(|a| a.identity.user_id == user_id)
            .map(|a| a.identity.clone())
    }

    fn record(&self, operation: &'static str) -> Result<(), ()> {
        *lock(&self.calls).entry(operation).or_default() += 1;
        if self.down.load(Ordering::SeqCst) {
            Err(())
        } else {
            Ok(())
        }
    }
}

fn unavailable() -> AuthError {
    AuthError::ProviderUnavailable("No se pudo conectar con el servidor.".to_string())
}

fn store_unavailable() -> StoreError {
    StoreError::Unavailable("No se pudo conectar con el servidor.".to_string())
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn check_credentials(
        &self,
        contact: &str,
        password: &SecretString,
    ) -> Result<Reply<Identity>, AuthError> {
        self.record("check_credentials").map_err(|()| unavailable())?;

        let gate = lock(&self.login_gate).clone();
        if let Some(gate) = gate {
            self.logins_waiting.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            self.logins_waiting.fetch_sub(1, Ordering::SeqCst);
        }

        let records = lock(&self.records);
        let account = records.accounts.iter().find(|a| {
            a.identity.email.as_str() == contact || a.identity.phone.as_deref() == Some(contact)
        });
        match account {
            Some(a) if a.password == password.expose_secret() && a.verified => Ok(Reply::new(
                format!("Bienvenido, {}", a.identity.name),
                a.identity.clone(),
            )),
            Some(a) if a.password == password.expose_secret() => Err(AuthError::InvalidCredentials(
                "Verifica tu correo antes de iniciar sesión.".to_string(),
            )),
            _ => Err(AuthError::InvalidCredentials("Credenciales inválidas.".to_string())),
        }
    }

    async fn register(
        &self,
        registration: &Registration,
    ) -> Result<Reply<RegistrationOutcome>, AuthError> {
        self.record("register").map_err(|()| unavailable())?;

        let mut records = lock(&self.records);
        if records
            .accounts
            .iter()
            .any(|a| a.identity.email == registration.email)
        {
            return Err(AuthError::DuplicateRegistration(
                "El correo ya está registrado.".to_string(),
            ));
        }

        records.next_user += 1;
        let mut identity = Identity::new(
            UserId::new(records.next_user),
            registration.role,
            registration.name.clone(),
            registration.email.clone(),
        );
        identity.phone = Some(registration.phone.clone());
        let confirm = !self.skip_confirmation.load(Ordering::SeqCst);
        records.accounts.push(Account {
            identity,
            password: registration.password.expose_secret().to_string(),
            verified: !confirm,
        });

        Ok(if confirm {
            Reply::new(
                "Te enviamos un código de verificación.",
                RegistrationOutcome::ConfirmationRequired,
            )
        } else {
            Reply::new("Usuario registrado.", RegistrationOutcome::Registered)
        })
    }

    async fn verify(&self, email: &Email, code: &str) -> Result<Reply<()>, AuthError> {
        self.record("verify").map_err(|()| unavailable())?;

        let mut records = lock(&self.records);
        let account = records
            .accounts
            .iter_mut()
            .find(|a| &a.identity.email == email)
            .filter(|_| code == VERIFICATION_CODE);
        match account {
            Some(account) => {
                account.verified = true;
                Ok(Reply::new("Cuenta verificada.", ()))
            }
            None => Err(AuthError::InvalidVerificationCode(
                "Código inválido o expirado.".to_string(),
            )),
        }
    }

    async fn federated_exchange(&self, token: &SecretString) -> Result<Reply<Identity>, AuthError> {
        self.record("federated_exchange").map_err(|()| unavailable())?;

        let email = token
            .expose_secret()
            .strip_prefix(GOOGLE_TOKEN_PREFIX)
            .ok_or_else(|| AuthError::InvalidCredentials("Token de Google inválido.".to_string()))?;
        let records = lock(&self.records);
        records
            .accounts
            .iter()
            .find(|a| a.identity.email.as_str() == email)
            .map(|a| Reply::new("Sesión iniciada con Google.", a.identity.clone()))
            .ok_or_else(|| {
                AuthError::InvalidCredentials("Cuenta de Google no registrada.".to_string())
            })
    }
}

#[async_trait]
impl StoreProvider for FakeBackend {
    async fn search_stores(&self, term: &str) -> Result<Vec<StoreListing>, StoreError> {
        self.record("search_stores").map_err(|()| store_unavailable())?;

        let records = lock(&self.records);
        let term = term.to_lowercase();
        Ok(records
            .stores
            .iter()
            .filter(|r| r.store.name.to_lowercase().contains(&term))
            .map(|r| StoreListing {
                store: r.store.clone(),
                owner_name: records
                    .accounts
                    .iter()
                    .find(|a| a.identity.user_id == r.store.owner_id)
                    .map(|a| a.identity.name.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn store(&self, store_id: StoreId) -> Result<Store, StoreError> {
        self.record("store").map_err(|()| store_unavailable())?;

        lock(&self.records)
            .stores
            .iter()
            .find(|r| r.store.id == store_id)
            .map(|r| r.store.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn verify_pin(&self, store_id: StoreId, pin: &SecretString) -> Result<bool, StoreError> {
        self.record("verify_pin").map_err(|()| store_unavailable())?;

        lock(&self.records)
            .stores
            .iter()
            .find(|r| r.store.id == store_id)
            .map(|r| r.pin == pin.expose_secret())
            .ok_or(StoreError::NotFound)
    }

    async fn assign_store(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Identity, StoreError> {
        self.record("assign_store").map_err(|()| store_unavailable())?;

        let mut records = lock(&self.records);
        let account = records
            .accounts
            .iter_mut()
            .find(|a| a.identity.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        account.identity.store_id = Some(store_id);
        Ok(account.identity.clone())
    }

    async fn create_store(&self, name: &str) -> Result<Store, StoreError> {
        self.record("create_store").map_err(|()| store_unavailable())?;

        // The backend assigns the store to whoever created it; the fake
        // attributes it to the most recently signed-in owner without a store.
        let mut records = lock(&self.records);
        records.next_store += 1;
        let id = StoreId::new(records.next_store);
        let owner = records
            .accounts
            .iter_mut()
            .rev()
            .find(|a| a.identity.role == Role::Owner && a.identity.store_id.is_none())
            .ok_or(StoreError::NotSignedIn)?;
        owner.identity.store_id = Some(id);
        let store = Store {
            id,
            name: name.to_string(),
            owner_id: owner.identity.user_id,
            email: None,
            phone: None,
            image: None,
        };
        records.stores.push(StoreRecord {
            store: store.clone(),
            pin: "0000".to_string(),
        });
        Ok(store)
    }

    async fn fetch_identity(&self, user_id: UserId) -> Result<Identity, StoreError> {
        self.record("fetch_identity").map_err(|()| store_unavailable())?;
        self.identity(user_id).ok_or(StoreError::NotFound)
    }

    async fn update_pin(&self, store_id: StoreId, pin: &SecretString) -> Result<(), StoreError> {
        self.record("update_pin").map_err(|()| store_unavailable())?;

        let mut records = lock(&self.records);
        let record = records
            .stores
            .iter_mut()
            .find(|r| r.store.id == store_id)
            .ok_or(StoreError::NotFound)?;
        record.pin = pin.expose_secret().to_string();
        Ok(())
    }

    async fn update_settings(
        &self,
        store_id: StoreId,
        settings: &StoreSettings,
    ) -> Result<(), StoreError> {
        self.record("update_settings").map_err(|()| store_unavailable())?;

        let mut records = lock(&self.records);
        let record = records
            .stores
            .iter_mut()
            .find(|r| r.store.id == store_id)
            .ok_or(StoreError::NotFound)?;
        record.store.name.clone_from(&settings.name);
        record.store.email.clone_from(&settings.email);
        record.store.phone.clone_from(&settings.phone);
        record.store.image.clone_from(&settings.image);
        Ok(())
    }

    async fn store_staff(&self, store_id: StoreId) -> Result<Vec<Identity>, StoreError> {
        self.record("store_staff").map_err(|()| store_unavailable())?;

        Ok(lock(&self.records)
            .accounts
            .iter()
            .filter(|a| a.identity.store_id == Some(store_id))
            .map(|a| a.identity.clone())
            .collect())
    }
}

/// Engine components wired to a [`FakeBackend`].
pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub storage: Arc<dyn SnapshotStorage>,
    pub session: Arc<SessionStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    /// Harness with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    /// Harness restoring its session from `storage`.
    #[must_use]
    pub fn with_storage(storage: Arc<dyn SnapshotStorage>) -> Self {
        Self::with_backend(Arc::new(FakeBackend::new()), storage)
    }

    /// Harness over an existing backend, as after a restart.
    #[must_use]
    pub fn with_backend(backend: Arc<FakeBackend>, storage: Arc<dyn SnapshotStorage>) -> Self {
        let session = Arc::new(SessionStore::restore(storage.clone()));
        Self {
            backend,
            storage,
            session,
            navigator: Arc::new(RecordingNavigator::new()),
        }
    }

    /// Authentication flow with the default delays.
    #[must_use]
    pub fn flow(&self, view: AuthView) -> AuthFlow {
        AuthFlow::new(
            self.backend.clone(),
            self.session.clone(),
            self.navigator.clone(),
            view,
            FlowTimings::default(),
        )
    }

    /// Route guard over the harness session.
    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.session.clone(), self.navigator.clone())
    }

    /// Store onboarding over the harness session.
    #[must_use]
    pub fn onboarding(&self) -> StoreOnboarding {
        StoreOnboarding::new(
            self.backend.clone(),
            self.session.clone(),
            self.navigator.clone(),
        )
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a test password.
#[must_use]
pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
