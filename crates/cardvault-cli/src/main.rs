use std::path::PathBuf;

use anyhow::Result;
use cardvault_core::catalog::{Category, ItemKind, ItemStatus};
use clap::{Parser, Subcommand};

mod commands;

use commands::AppContext;

#[derive(Parser)]
#[command(name = "cardvault")]
#[command(about = "Cardvault - trading card storefront client", long_about = None)]
struct Cli {
    /// Configuration directory (defaults to ~/.config/cardvault)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the public catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the local selection
    Selection {
        #[command(subcommand)]
        action: SelectionAction,
    },
    /// Administer catalog entries (requires login)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Upload a product image and print its URL
    Upload {
        /// Image file (jpeg, png, webp, gif)
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List one page of entries, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        kind: Option<ItemKind>,
        #[arg(long)]
        status: Option<ItemStatus>,
        /// Case-insensitive name search
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one entry as JSON
    Show { id: String },
    /// List featured entries
    Featured {
        #[arg(long, default_value_t = 8)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum SelectionAction {
    /// List selected entries and the total
    List,
    /// Add a catalog entry by id
    Add { id: String },
    /// Remove an entry by id
    Remove { id: String },
    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Sign in with email and password (password is read from stdin if omitted)
    Login {
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Create an entry from a JSON request file
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    /// Apply a sparse JSON update; absent keys are kept, null clears
    Update {
        id: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Mark an entry available or sold
    Status { id: String, status: ItemStatus },
    /// Delete an entry with its images and featured membership
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config_dir)?;
    commands::init_logging(&ctx.config.log_level);

    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::List {
                page,
                category,
                kind,
                status,
                search,
            } => commands::catalog::list(&ctx, page, category, kind, status, search).await?,
            CatalogAction::Show { id } => commands::catalog::show(&ctx, &id).await?,
            CatalogAction::Featured { limit } => commands::catalog::featured(&ctx, limit).await?,
        },
        Commands::Selection { action } => match action {
            SelectionAction::List => commands::selection::list(&ctx)?,
            SelectionAction::Add { id } => commands::selection::add(&ctx, &id).await?,
            SelectionAction::Remove { id } => commands::selection::remove(&ctx, &id)?,
            SelectionAction::Clear => commands::selection::clear(&ctx)?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Login { email, password } => {
                commands::admin::login(&ctx, &email, password).await?
            }
            AdminAction::Logout => commands::admin::logout(&ctx).await?,
            AdminAction::Create { file } => commands::admin::create(&ctx, &file).await?,
            AdminAction::Update { id, file } => commands::admin::update(&ctx, &id, &file).await?,
            AdminAction::Status { id, status } => {
                commands::admin::set_status(&ctx, &id, status).await?
            }
            AdminAction::Delete { id } => commands::admin::delete(&ctx, &id).await?,
        },
        Commands::Upload { file } => commands::upload::upload(&ctx, &file).await?,
    }

    Ok(())
}
