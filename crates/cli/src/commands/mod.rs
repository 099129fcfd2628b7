//! Command implementations.

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use tokio::io::{BufReader, Stdin};
use tracing::info;

use tienda_access::{
    AccessConfig, ApiClient, FileStorage, FlowError, Navigator, SessionStore, StoreError,
};
use tienda_core::Destination;

pub mod auth;
pub mod prompt;
pub mod session;
pub mod stores;

use prompt::Prompt;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Authentication flow rejected the request.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// Store onboarding rejected the request.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading from stdin failed.
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),

    /// Stdin closed before a value was entered.
    #[error("No {0} entered")]
    MissingInput(&'static str),
}

/// Navigator for a terminal: the destination is reported, nothing is drawn.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, destination: Destination) {
        info!(destination = %destination, "Navigate");
    }
}

/// Everything a command needs.
pub struct Context {
    pub config: AccessConfig,
    pub session: Arc<SessionStore>,
    pub navigator: Arc<LogNavigator>,
    pub api: Arc<ApiClient>,
    pub prompt: Prompt<BufReader<Stdin>>,
}

impl Context {
    /// Restore the persisted session and build the backend client.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Client` if the HTTP client cannot be built.
    pub fn new(config: AccessConfig) -> Result<Self, CommandError> {
        let storage = Arc::new(FileStorage::new(&config.session_dir));
        let session = Arc::new(SessionStore::restore(storage));
        let api = Arc::new(ApiClient::new(&config)?);
        Ok(Self {
            config,
            session,
            navigator: Arc::new(LogNavigator),
            api,
            prompt: Prompt::stdin(),
        })
    }
}

/// Use `given`, or read one line from stdin.
pub async fn secret_or_prompt(
    context: &Context,
    given: Option<String>,
    what: &'static str,
) -> Result<SecretString, CommandError> {
    if let Some(value) = given {
        return Ok(SecretString::from(value));
    }
    context.prompt.read_line(what).await.map(SecretString::from)
}
