//! Store search, onboarding and administration.

use tracing::info;

use tienda_access::StoreOnboarding;
use tienda_core::{StoreId, StoreSettings};

use super::{CommandError, Context, secret_or_prompt};

fn onboarding(context: &Context) -> StoreOnboarding {
    StoreOnboarding::new(
        context.api.clone(),
        context.session.clone(),
        context.navigator.clone(),
    )
}

/// List stores matching `term`.
pub async fn search(context: &Context, term: &str) -> Result<(), CommandError> {
    let listings = onboarding(context).search(term).await?;
    if listings.is_empty() {
        info!(term, "No stores found");
    }
    for listing in listings {
        info!(
            id = %listing.store.id,
            name = %listing.store.name,
            owner = %listing.owner_name,
            "Store"
        );
    }
    Ok(())
}

/// Show one store.
pub async fn show(context: &Context, id: StoreId) -> Result<(), CommandError> {
    let store = onboarding(context).store(id).await?;
    info!(
        id = %store.id,
        name = %store.name,
        owner_id = %store.owner_id,
        email = ?store.email,
        phone = ?store.phone,
        "Store"
    );
    Ok(())
}

/// Join a store as staff.
pub async fn join(context: &Context, id: StoreId, pin: Option<String>) -> Result<(), CommandError> {
    let pin = secret_or_prompt(context, pin, "store PIN").await?;
    let destination = onboarding(context).join(id, &pin).await?;
    info!(store_id = %id, destination = %destination, "Joined store");
    Ok(())
}

/// Create a store for the signed-in owner.
pub async fn create(context: &Context, name: &str) -> Result<(), CommandError> {
    let destination = onboarding(context).create(name).await?;
    info!(destination = %destination, "Store created");
    Ok(())
}

/// Replace the staff PIN of the owner's store.
pub async fn pin(context: &Context, pin: Option<String>) -> Result<(), CommandError> {
    let pin = secret_or_prompt(context, pin, "new store PIN").await?;
    onboarding(context).update_pin(&pin).await?;
    info!("¡PIN de vendedor actualizado con éxito!");
    Ok(())
}

/// Replace the details of the owner's store.
pub async fn settings(context: &Context, settings: StoreSettings) -> Result<(), CommandError> {
    onboarding(context).update_settings(settings).await?;
    info!("¡Datos de la tienda actualizados con éxito!");
    Ok(())
}

/// List the users of the owner's store.
pub async fn staff(context: &Context) -> Result<(), CommandError> {
    let staff = onboarding(context).staff().await?;
    if staff.is_empty() {
        info!("No users found");
    }
    for user in staff {
        info!(
            user_id = %user.user_id,
            name = %user.name,
            email = %user.email,
            role = %user.role,
            "User"
        );
    }
    Ok(())
}
