//! Tienda CLI - drive the access engine from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Who is signed in, and where would they land
//! tienda status
//!
//! # Ask the route guard about a path
//! tienda route /admin
//!
//! # Sign in (password is read from stdin when not given)
//! tienda login -c ana@x.com
//!
//! # Register; prompts for the emailed code when confirmation is required
//! tienda register -n Ana -p 5512345678 -e ana@x.com -r admin
//!
//! # Exchange a Google ID token
//! tienda google --token <jwt>
//!
//! # Store onboarding
//! tienda stores search lupita
//! tienda stores join 4 --pin 1234
//! tienda stores create "Abarrotes Lupita"
//!
//! # Store administration (owners)
//! tienda stores pin --pin 5678
//! tienda stores settings --name "Abarrotes Lupita" --phone 5512345678
//! tienda stores staff
//!
//! tienda logout
//! ```
//!
//! Configuration comes from the environment (see `tienda_access::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tienda_access::AccessConfig;
use tienda_core::{Role, StoreId, StoreSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "tienda")]
#[command(author, version, about = "Tienda access CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the signed-in user and their landing page
    Status,
    /// Check where the route guard sends a path
    Route {
        /// Route path, e.g. `/admin` or `/join-store`
        path: String,
    },
    /// Sign in with email or phone and password
    Login {
        /// Email address or phone number
        #[arg(short, long)]
        contact: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Register a new account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Phone number
        #[arg(short, long)]
        phone: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Role (`admin` or `vendedor`)
        #[arg(short, long, default_value = "vendedor")]
        role: Role,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in with a Google ID token
    Google {
        /// ID token returned by Google Identity Services
        #[arg(long)]
        token: String,
    },
    /// Sign out
    Logout,
    /// Find, join, create or administer a store
    Stores {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Search stores by name
    Search {
        /// Search term
        term: String,
    },
    /// Show a store
    Show {
        /// Store ID
        id: StoreId,
    },
    /// Join a store with its staff PIN
    Join {
        /// Store ID
        id: StoreId,

        /// Store PIN (read from stdin when omitted)
        #[arg(long)]
        pin: Option<String>,
    },
    /// Create a store owned by the signed-in user
    Create {
        /// Store name
        name: String,
    },
    /// Change the staff PIN of your store
    Pin {
        /// New PIN (read from stdin when omitted)
        #[arg(long)]
        pin: Option<String>,
    },
    /// Change the name and contact details of your store
    Settings {
        /// Store name
        #[arg(short, long)]
        name: String,

        /// Contact email
        #[arg(short, long)]
        email: Option<String>,

        /// Contact phone
        #[arg(short, long)]
        phone: Option<String>,

        /// Logo URL
        #[arg(short, long)]
        image: Option<String>,
    },
    /// List the users of your store
    Staff,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AccessConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AccessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tienda=info,tienda_access=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match Context::new(config) {
        Ok(context) => run(cli, &context).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, context: &Context) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Status => commands::session::status(context),
        Commands::Route { path } => commands::session::route(context, &path),
        Commands::Login { contact, password } => {
            commands::auth::login(context, &contact, password).await?;
        }
        Commands::Register {
            name,
            phone,
            email,
            role,
            password,
        } => {
            commands::auth::register(context, &name, &phone, &email, role, password).await?;
        }
        Commands::Google { token } => commands::auth::google(context, token).await?,
        Commands::Logout => commands::auth::logout(context),
        Commands::Stores { action } => match action {
            StoreAction::Search { term } => commands::stores::search(context, &term).await?,
            StoreAction::Show { id } => commands::stores::show(context, id).await?,
            StoreAction::Join { id, pin } => commands::stores::join(context, id, pin).await?,
            StoreAction::Create { name } => commands::stores::create(context, &name).await?,
            StoreAction::Pin { pin } => commands::stores::pin(context, pin).await?,
            StoreAction::Settings {
                name,
                email,
                phone,
                image,
            } => {
                let settings = StoreSettings {
                    name,
                    email,
                    phone,
                    image,
                };
                commands::stores::settings(context, settings).await?;
            }
            StoreAction::Staff => commands::stores::staff(context).await?,
        },
    }
    Ok(())
}
