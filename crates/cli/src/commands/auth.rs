//! Sign-in, registration and sign-out.

use secrecy::SecretString;
use tracing::{info, warn};

use tienda_access::{AuthFlow, AuthView, Transition};
use tienda_core::Role;

use super::{CommandError, Context, secret_or_prompt};

fn flow(context: &Context, view: AuthView) -> AuthFlow {
    AuthFlow::new(
        context.api.clone(),
        context.session.clone(),
        context.navigator.clone(),
        view,
        context.config.timings,
    )
}

fn report(flow: &AuthFlow, transition: &Transition) {
    if let Some(message) = flow.feedback().success {
        info!("{message}");
    }
    if let Transition::SignedIn { landing } = transition {
        info!(landing = %landing, "Signed in");
    }
}

/// Sign in with a contact and password, then follow the redirect.
pub async fn login(
    context: &Context,
    contact: &str,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = secret_or_prompt(context, password, "password").await?;
    let flow = flow(context, AuthView::Login);

    let transition = flow.submit_login(contact, &password).await?;
    report(&flow, &transition);
    flow.settle().await;
    Ok(())
}

/// Register, and complete email verification when the backend asks for it.
pub async fn register(
    context: &Context,
    name: &str,
    phone: &str,
    email: &str,
    role: Role,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = secret_or_prompt(context, password, "password").await?;
    let flow = flow(context, AuthView::Register);

    let transition = flow.submit_register(name, phone, email, password, role).await?;
    report(&flow, &transition);

    if let Transition::VerificationPending { email } = transition {
        info!(email = %email, "A verification code was sent");
        loop {
            let code = context.prompt.read_line("verification code").await?;
            match flow.submit_code(&code).await {
                Ok(transition) => {
                    report(&flow, &transition);
                    break;
                }
                Err(e) => warn!("{e}"),
            }
        }
        info!("Sign in with `tienda login` once the account is verified");
    } else if transition == Transition::Registered {
        info!("Sign in with `tienda login`");
    }

    flow.settle().await;
    Ok(())
}

/// Exchange a Google ID token for a session.
pub async fn google(context: &Context, token: String) -> Result<(), CommandError> {
    if context.config.google_client_id.is_none() {
        warn!("GOOGLE_CLIENT_ID is not set; the backend may reject the token");
    }

    let flow = flow(context, AuthView::Login);
    let transition = flow.submit_federated(&SecretString::from(token)).await?;
    report(&flow, &transition);
    flow.settle().await;
    Ok(())
}

/// Clear the persisted session.
pub fn logout(context: &Context) {
    if !context.session.is_signed_in() {
        info!("Not signed in");
        return;
    }
    flow(context, AuthView::Login).logout();
}
