//! Store onboarding: staff join a store with its PIN, owners create one.
//!
//! Both paths end the same way as sign-in: the new snapshot is written to the
//! session store and the destination comes from the access policy.
//!
//! Owners then administer their store: staff PIN, details and staff list.
//! These operations are open to exactly the users the policy lets into the
//! admin panel.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use tienda_core::{Destination, Identity, Store, StoreId, StoreListing, StoreSettings};

use crate::error::StoreError;
use crate::in_flight::InFlight;
use crate::navigation::Navigator;
use crate::policy;
use crate::provider::StoreProvider;
use crate::session::SessionStore;

/// Joins or creates the signed-in user's store.
pub struct StoreOnboarding {
    provider: Arc<dyn StoreProvider>,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    in_flight: AtomicBool,
}

impl StoreOnboarding {
    /// Create an onboarding helper.
    #[must_use]
    pub fn new(
        provider: Arc<dyn StoreProvider>,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            provider,
            session,
            navigator,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Search stores by name. A blank term returns nothing without a request.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the provider cannot be reached.
    pub async fn search(&self, term: &str) -> Result<Vec<StoreListing>, StoreError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        self.provider.search_stores(term).await
    }

    /// Store details for display.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown store.
    pub async fn store(&self, store_id: StoreId) -> Result<Store, StoreError> {
        self.provider.store(store_id).await
    }

    /// Join `store_id` with its staff PIN.
    ///
    /// On success the session holds the new snapshot and the user is sent
    /// where the policy puts them. On a wrong PIN nothing changes.
    ///
    /// # Errors
    ///
    /// `NotSignedIn`, `InvalidInput` and `Busy` are returned without a
    /// request. `InvalidPin` when the PIN does not match.
    #[instrument(skip(self, pin), fields(store_id = %store_id))]
    pub async fn join(
        &self,
        store_id: StoreId,
        pin: &SecretString,
    ) -> Result<Destination, StoreError> {
        let _latch = InFlight::acquire(&self.in_flight).ok_or(StoreError::Busy)?;
        let identity = self.session.current().ok_or(StoreError::NotSignedIn)?;

        if pin.expose_secret().trim().is_empty() {
            return Err(StoreError::InvalidInput("Ingresa el PIN de la tienda.".to_string()));
        }

        if !self.provider.verify_pin(store_id, pin).await? {
            info!(user_id = %identity.user_id, "Store PIN rejected");
            return Err(StoreError::InvalidPin);
        }

        let updated = self.provider.assign_store(identity.user_id, store_id).await?;
        Ok(self.settle(updated, Destination::Landing))
    }

    /// Create a store for the signed-in owner.
    ///
    /// The backend assigns the new store to its creator; the identity is
    /// refreshed afterwards so the session reflects it.
    ///
    /// # Errors
    ///
    /// `NotSignedIn`, `InvalidInput` and `Busy` are returned without a
    /// request; provider failures as `Unavailable`.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<Destination, StoreError> {
        let _latch = InFlight::acquire(&self.in_flight).ok_or(StoreError::Busy)?;
        let identity = self.session.current().ok_or(StoreError::NotSignedIn)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("Ingresa el nombre de la tienda.".to_string()));
        }

        let store = self.provider.create_store(name).await.inspect_err(|e| {
            warn!(error = %e, "Store creation failed");
        })?;
        info!(store_id = %store.id, "Store created");

        let refreshed = self.provider.fetch_identity(identity.user_id).await?;
        Ok(self.settle(refreshed, Destination::AdminPanel))
    }

    /// Replace the staff PIN of the owner's store.
    ///
    /// # Errors
    ///
    /// `NotSignedIn`, `Forbidden`, `InvalidInput` and `Busy` are returned
    /// without a request.
    #[instrument(skip_all)]
    pub async fn update_pin(&self, pin: &SecretString) -> Result<(), StoreError> {
        let _latch = InFlight::acquire(&self.in_flight).ok_or(StoreError::Busy)?;
        let store_id = self.administered_store()?;

        let pin = pin.expose_secret().trim();
        if pin.is_empty() {
            return Err(StoreError::InvalidInput("Ingresa el nuevo PIN.".to_string()));
        }

        self.provider
            .update_pin(store_id, &SecretString::from(pin.to_owned()))
            .await
            .inspect_err(|e| warn!(store_id = %store_id, error = %e, "PIN update failed"))?;
        info!(store_id = %store_id, "Staff PIN updated");
        Ok(())
    }

    /// Replace the name and contact details of the owner's store.
    ///
    /// # Errors
    ///
    /// Same contract as [`StoreOnboarding::update_pin`]; a blank name is
    /// `InvalidInput`.
    #[instrument(skip_all)]
    pub async fn update_settings(&self, settings: StoreSettings) -> Result<(), StoreError> {
        let _latch = InFlight::acquire(&self.in_flight).ok_or(StoreError::Busy)?;
        let store_id = self.administered_store()?;

        let settings = settings.normalized();
        if settings.name.is_empty() {
            return Err(StoreError::InvalidInput("Ingresa el nombre de la tienda.".to_string()));
        }

        self.provider
            .update_settings(store_id, &settings)
            .await
            .inspect_err(|e| warn!(store_id = %store_id, error = %e, "Settings update failed"))?;
        info!(store_id = %store_id, "Store settings updated");
        Ok(())
    }

    /// Users associated with the owner's store.
    ///
    /// # Errors
    ///
    /// `NotSignedIn` and `Forbidden` are returned without a request.
    pub async fn staff(&self) -> Result<Vec<Identity>, StoreError> {
        let store_id = self.administered_store()?;
        self.provider.store_staff(store_id).await
    }

    fn administered_store(&self) -> Result<StoreId, StoreError> {
        let identity = self.session.current().ok_or(StoreError::NotSignedIn)?;
        if !policy::decide(Some(&identity), Destination::AdminPanel).is_allowed() {
            info!(
                user_id = %identity.user_id,
                role = %identity.role,
                "Store administration refused"
            );
            return Err(StoreError::Forbidden);
        }
        identity.store_id.ok_or(StoreError::Forbidden)
    }

    fn settle(&self, identity: Identity, requested: Destination) -> Destination {
        let destination = policy::resolve(Some(&identity), requested);
        info!(
            user_id = %identity.user_id,
            store_id = ?identity.store_id,
            destination = %destination,
            "Store association updated"
        );
        self.session.set(identity);
        self.navigator.navigate(destination);
        destination
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tienda_core::{Email, Role, UserId};

    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::storage::MemoryStorage;

    #[derive(Default)]
    struct StubStores {
        calls: AtomicUsize,
        created: Mutex<Option<StoreId>>,
        updated: Mutex<Vec<(StoreId, String)>>,
    }

    fn store(id: i64) -> Store {
        Store {
            id: StoreId::new(id),
            name: "Abarrotes Lupita".to_string(),
            owner_id: UserId::new(1),
            email: None,
            phone: None,
            image: None,
        }
    }

    fn person(role: Role) -> Identity {
        Identity::new(UserId::new(1), role, "Lupita", Email::parse("lupita@x.com").unwrap())
    }

    #[async_trait]
    impl StoreProvider for StubStores {
        async fn search_stores(&self, _term: &str) -> Result<Vec<StoreListing>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![StoreListing {
                store: store(4),
                owner_name: "Lupita".to_string(),
            }])
        }

        async fn store(&self, store_id: StoreId) -> Result<Store, StoreError> {
            Ok(store(store_id.as_i64()))
        }

        async fn verify_pin(
            &self,
            _store_id: StoreId,
            pin: &SecretString,
        ) -> Result<bool, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(pin.expose_secret() == "1234")
        }

        async fn assign_store(
            &self,
            _user_id: UserId,
            store_id: StoreId,
        ) -> Result<Identity, StoreError> {
            Ok(person(Role::Staff).with_store(store_id))
        }

        async fn create_store(&self, _name: &str) -> Result<Store, StoreError> {
            *self.created.lock().unwrap() = Some(StoreId::new(9));
            Ok(store(9))
        }

        async fn fetch_identity(&self, _user_id: UserId) -> Result<Identity, StoreError> {
            let created = *self.created.lock().unwrap();
            let owner = person(Role::Owner);
            Ok(match created {
                Some(id) => owner.with_store(id),
                None => owner,
            })
        }

        async fn update_pin(
            &self,
            store_id: StoreId,
            pin: &SecretString,
        ) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.updated
                .lock()
                .unwrap()
                .push((store_id, pin.expose_secret().to_string()));
            Ok(())
        }

        async fn update_settings(
            &self,
            store_id: StoreId,
            settings: &StoreSettings,
        ) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.updated.lock().unwrap().push((store_id, settings.name.clone()));
            Ok(())
        }

        async fn store_staff(&self, store_id: StoreId) -> Result<Vec<Identity>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![person(Role::Staff).with_store(store_id)])
        }
    }

    type Fixture = (StoreOnboarding, Arc<StubStores>, Arc<SessionStore>, Arc<RecordingNavigator>);

    fn onboarding(signed_in: Option<Identity>) -> Fixture {
        let provider = Arc::new(StubStores::default());
        let session = Arc::new(SessionStore::restore(Arc::new(MemoryStorage::new())));
        if let Some(identity) = signed_in {
            session.set(identity);
        }
        let navigator = Arc::new(RecordingNavigator::new());
        let onboarding = StoreOnboarding::new(provider.clone(), session.clone(), navigator.clone());
        (onboarding, provider, session, navigator)
    }

    #[tokio::test]
    async fn test_blank_search_makes_no_request() {
        let (onboarding, provider, _, _) = onboarding(None);
        assert!(onboarding.search("   ").await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(onboarding.search("lupita").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_join_with_pin() {
        let (onboarding, _, session, navigator) = onboarding(Some(person(Role::Staff)));
        let destination = onboarding
            .join(StoreId::new(4), &SecretString::from("1234".to_string()))
            .await
            .unwrap();
        assert_eq!(destination, Destination::Landing);
        assert_eq!(session.current().unwrap().store_id, Some(StoreId::new(4)));
        assert_eq!(navigator.last(), Some(Destination::Landing));
    }

    #[tokio::test]
    async fn test_wrong_pin_changes_nothing() {
        let (onboarding, _, session, navigator) = onboarding(Some(person(Role::Staff)));
        let err = onboarding
            .join(StoreId::new(4), &SecretString::from("0000".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::InvalidPin);
        assert!(!session.current().unwrap().has_store());
        assert!(navigator.visits().is_empty());
    }

    #[tokio::test]
    async fn test_join_requires_sign_in() {
        let (onboarding, provider, _, _) = onboarding(None);
        let err = onboarding
            .join(StoreId::new(4), &SecretString::from("1234".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotSignedIn);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_refreshes_identity_and_opens_admin() {
        let (onboarding, _, session, navigator) = onboarding(Some(person(Role::Owner)));
        let destination = onboarding.create("Abarrotes Lupita").await.unwrap();
        assert_eq!(destination, Destination::AdminPanel);
        assert_eq!(session.current().unwrap().store_id, Some(StoreId::new(9)));
        assert_eq!(navigator.visits(), vec![Destination::AdminPanel]);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (onboarding, _, _, _) = onboarding(Some(person(Role::Owner)));
        assert!(matches!(
            onboarding.create(" ").await,
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_updates_own_store_pin() {
        let owner = person(Role::Owner).with_store(StoreId::new(4));
        let (onboarding, provider, _, _) = onboarding(Some(owner));

        onboarding
            .update_pin(&SecretString::from(" 4321 ".to_string()))
            .await
            .unwrap();
        assert_eq!(
            *provider.updated.lock().unwrap(),
            vec![(StoreId::new(4), "4321".to_string())]
        );
    }

    #[tokio::test]
    async fn test_administration_is_refused_outside_admin_panel() {
        let staff = person(Role::Staff).with_store(StoreId::new(4));
        for identity in [None, Some(staff), Some(person(Role::Owner))] {
            let expected = if identity.is_some() {
                StoreError::Forbidden
            } else {
                StoreError::NotSignedIn
            };
            let (onboarding, provider, _, _) = onboarding(identity);

            assert_eq!(onboarding.staff().await.unwrap_err(), expected);
            assert_eq!(
                onboarding
                    .update_settings(StoreSettings::named("Otra"))
                    .await
                    .unwrap_err(),
                expected
            );
            assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_settings_require_a_name() {
        let owner = person(Role::Owner).with_store(StoreId::new(4));
        let (onboarding, provider, _, _) = onboarding(Some(owner));

        assert!(matches!(
            onboarding.update_settings(StoreSettings::named("  ")).await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            onboarding.update_pin(&SecretString::from(String::new())).await,
            Err(StoreError::InvalidInput(_))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        onboarding
            .update_settings(StoreSettings::named("Abarrotes Lupita"))
            .await
            .unwrap();
        assert_eq!(onboarding.staff().await.unwrap().len(), 1);
    }
}
