//! Vivero CLI - drive the storefront session, cart and wishlist from a terminal.
//!
//! Each invocation acts as one browser tab. Tabs share the persistent
//! storage file under `VIVERO_STORAGE_DIR`; `--tab` names the tab-scoped one.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with credentials or an existing token
//! vivero session login --id u42 --password secret
//! vivero session login --token eyJ...
//!
//! # Work with the cart
//! vivero cart add --id 5 --name Ficus --price 25000
//! vivero cart add --guest --id 5 --name Ficus --price 25000
//! vivero cart inc 5
//! vivero cart show
//!
//! # Favorites
//! vivero wishlist toggle 5
//! vivero wishlist add-to-cart 5
//!
//! # Order hand-off
//! vivero order --link
//!
//! # Follow changes made by other tabs
//! vivero --tab second watch
//! ```
//!
//! # Commands
//!
//! - `session` - Sign in, sign out, show the current user
//! - `cart` - Show and edit the signed-in cart or the guest cart
//! - `wishlist` - List and edit favorites
//! - `order` - Render the WhatsApp order message
//! - `watch` - Print badge updates as other tabs change storage

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vivero_storefront::StorefrontContext;
use vivero_storefront::config::StorefrontConfig;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "vivero")]
#[command(author, version, about = "Vivero storefront CLI")]
struct Cli {
    /// Name of the tab this invocation acts as
    #[arg(long, global = true, default_value = "main")]
    tab: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, sign out or show the current user
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Show or edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show or edit favorites
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Render the order message for the current cart
    Order {
        /// Print the WhatsApp link instead of the message
        #[arg(long)]
        link: bool,
    },
    /// Print badge updates as storage changes
    Watch {
        /// Storage poll interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Sign in with credentials or an existing token
    Login {
        /// Bearer token issued by the API
        #[arg(long, conflicts_with_all = ["id", "password"])]
        token: Option<String>,

        /// Account identifier
        #[arg(long, requires = "password")]
        id: Option<String>,

        /// Account password
        #[arg(long, requires = "id")]
        password: Option<String>,
    },
    /// Remove the stored token
    Logout,
    /// Show the current user and badges
    Whoami,
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines and the total
    Show,
    /// Add a product, or add to its quantity if already present
    Add {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        name: String,

        /// Unit price in pesos
        #[arg(long)]
        price: i64,

        #[arg(long, default_value_t = 1)]
        qty: u32,

        /// Image reference shown next to the line
        #[arg(long)]
        image: Option<String>,

        /// Add to the pre-login cart instead
        #[arg(long)]
        guest: bool,
    },
    /// Increase a line's quantity by one
    Inc { id: i64 },
    /// Decrease a line's quantity by one, never below one
    Dec { id: i64 },
    /// Remove a line
    Remove { id: i64 },
    /// Print the cart total
    Total,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List favorites with price and stock
    List,
    /// Add or remove a product from favorites
    Toggle { id: i64 },
    /// Remove a product from favorites
    Remove { id: i64 },
    /// Remove every favorite
    Clear,
    /// Add a favorite to the cart
    AddToCart { id: i64 },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.sentry_environment.clone().map(Cow::Owned),
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
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            commands::print_error(&e.to_string());
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vivero_storefront=warn,vivero_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli, config).await {
        commands::print_error(&e.report());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let ctx = StorefrontContext::open(config, &cli.tab)?;

    // Every tab merges a leftover pre-login cart as soon as it opens
    ctx.rehydrate();

    match cli.command {
        Commands::Session { action } => match action {
            SessionAction::Login {
                token,
                id,
                password,
            } => commands::session::login(&ctx, token, id, password).await?,
            SessionAction::Logout => commands::session::logout(&ctx).await?,
            SessionAction::Whoami => commands::session::whoami(&ctx).await,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx),
            CartAction::Add {
                id,
                name,
                price,
                qty,
                image,
                guest,
            } => commands::cart::add(&ctx, commands::cart::NewLine {
                id,
                name,
                price,
                qty,
                image,
                guest,
            })?,
            CartAction::Inc { id } => commands::cart::change(&ctx, id, 1)?,
            CartAction::Dec { id } => commands::cart::change(&ctx, id, -1)?,
            CartAction::Remove { id } => commands::cart::remove(&ctx, id)?,
            CartAction::Total => commands::cart::total(&ctx)?,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::List => commands::wishlist::list(&ctx).await?,
            WishlistAction::Toggle { id } => commands::wishlist::toggle(&ctx, id).await?,
            WishlistAction::Remove { id } => commands::wishlist::remove(&ctx, id).await?,
            WishlistAction::Clear => commands::wishlist::clear(&ctx).await?,
            WishlistAction::AddToCart { id } => commands::wishlist::add_to_cart(&ctx, id).await?,
        },
        Commands::Order { link } => commands::order::render(&ctx, link)?,
        Commands::Watch { interval_ms } => {
            commands::watch::run(&ctx, Duration::from_millis(interval_ms)).await?;
        }
    }
    Ok(())
}
