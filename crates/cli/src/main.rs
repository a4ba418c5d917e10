//! Velorm CLI - shop the Velorm storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with a one-time password
//! velorm auth send-otp 9876543210
//! velorm auth verify 9876543210 123456
//!
//! # Browse and fill the cart
//! velorm catalog products
//! velorm cart add rooh-gulab
//! velorm cart dec <product-id>
//!
//! # Place a cash-on-delivery order
//! velorm checkout --first-name Asha --address "1 MG Road" --city Pune
//! velorm orders
//! ```
//!
//! # Commands
//!
//! - `auth` - OTP login, profile updates, logout
//! - `catalog` - List products and categories
//! - `cart` - Show and change the cart
//! - `checkout` - Place an order from the cart
//! - `orders` - Order history

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use velorm_storefront::Storefront;
use velorm_storefront::config::StorefrontConfig;
use velorm_storefront::error::{self, StoreError};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "velorm")]
#[command(author, version, about = "Velorm storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, update your profile, sign out
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Browse products and categories
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: Option<commands::cart::CartAction>,
    },
    /// Place a cash-on-delivery order from the cart
    Checkout(commands::checkout::CheckoutArgs),
    /// List your orders
    Orders,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
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

    // Sentry must be initialized before the tracing subscriber
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "velorm_cli=info,velorm_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(StoreError::from(e)),
    };

    if let Err(e) = result {
        error::report(&e);
        tracing::error!("Command failed: {}", e.user_message());
        tracing::debug!(error = %e, "Command failure detail");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), StoreError> {
    let storefront = Storefront::from_config(config)?;

    match cli.command {
        Commands::Auth { action } => commands::auth::run(&storefront, action).await,
        Commands::Catalog { action } => commands::catalog::run(&storefront, action).await,
        Commands::Cart { action } => commands::cart::run(&storefront, action).await,
        Commands::Checkout(args) => commands::checkout::run(&storefront, args).await,
        Commands::Orders => commands::orders::run(&storefront).await,
    }
}
