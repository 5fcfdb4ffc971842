//! Biblioteca main entry point
//!
//! This is the command-line interface for the Biblioteca book catalog.

use biblioteca::catalog::{open_catalog, BookUpdate, NewAuthor, NewCategory, SqliteCatalog};
use biblioteca::config::{load_config_or_default, Config};
use biblioteca::{ImportRequest, Importer};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Biblioteca: a book catalog that imports from product pages
///
/// Books are imported by scraping title, price, ISBN and publication year
/// from a product page and attaching an existing author and category.
#[derive(Parser, Debug)]
#[command(name = "biblioteca")]
#[command(version = "1.0.0")]
#[command(about = "A book catalog with page-scraping import", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a book from a product page
    Import {
        /// Product page URL
        url: String,

        #[arg(long)]
        author_id: i64,

        #[arg(long)]
        category_id: i64,
    },

    /// Manage authors
    #[command(subcommand)]
    Author(AuthorCommand),

    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Inspect, correct and remove books
    #[command(subcommand)]
    Book(BookCommand),
}

#[derive(Subcommand, Debug)]
enum AuthorCommand {
    /// Register an author
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// Birth date as YYYY-MM-DD
        #[arg(long)]
        birth_date: NaiveDate,
    },

    /// List all authors
    List,

    /// Show one author
    Show { id: i64 },

    /// Change an author; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Birth date as YYYY-MM-DD
        #[arg(long)]
        birth_date: Option<NaiveDate>,
    },

    /// Delete an author without books
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// Register a category
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// List all categories
    List,

    /// Show one category
    Show { id: i64 },

    /// Change a category; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a category without books
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum BookCommand {
    /// List all books
    List,

    /// Show one book
    Show { id: i64 },

    /// Correct a book; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        isbn: Option<String>,

        /// Publication year
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        price: Option<Decimal>,

        #[arg(long)]
        author_id: Option<i64>,

        #[arg(long)]
        category_id: Option<i64>,

        #[arg(long)]
        source_url: Option<String>,
    },

    /// Delete one book
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load_config_or_default(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let database_path = Path::new(&config.storage.database_path);
    tracing::debug!("Opening catalog at {}", database_path.display());
    let mut catalog = open_catalog(database_path)?;

    match cli.command {
        Command::Import {
            url,
            author_id,
            category_id,
        } => handle_import(catalog, &config, ImportRequest::new(url, author_id, category_id)).await?,
        Command::Author(command) => handle_author(&mut catalog, command)?,
        Command::Category(command) => handle_category(&mut catalog, command)?,
        Command::Book(command) => handle_book(&mut catalog, command)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("biblioteca=info,warn"),
            1 => EnvFilter::new("biblioteca=debug,info"),
            2 => EnvFilter::new("biblioteca=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays parseable JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs one import; Ctrl-C cancels it
async fn handle_import(
    catalog: SqliteCatalog,
    config: &Config,
    request: ImportRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let importer = Importer::from_config(Arc::new(Mutex::new(catalog)), config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling import");
            on_interrupt.cancel();
        }
    });

    let outcome = importer.import_book(&request, &cancel).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn handle_author(
    catalog: &mut SqliteCatalog,
    command: AuthorCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        AuthorCommand::Add {
            name,
            email,
            birth_date,
        } => {
            let author = catalog.create_author(&NewAuthor {
                name,
                email,
                birth_date,
            })?;
            tracing::info!("Created author {} ({})", author.name, author.id);
            println!("{}", serde_json::to_string_pretty(&author)?);
        }
        AuthorCommand::List => {
            println!("{}", serde_json::to_string_pretty(&catalog.list_authors()?)?);
        }
        AuthorCommand::Show { id } => {
            println!("{}", serde_json::to_string_pretty(&catalog.get_author(id)?)?);
        }
        AuthorCommand::Update {
            id,
            name,
            email,
            birth_date,
        } => {
            let current = catalog.get_author(id)?;
            let author = catalog.update_author(
                id,
                &NewAuthor {
                    name: name.unwrap_or(current.name),
                    email: email.unwrap_or(current.email),
                    birth_date: birth_date.unwrap_or(current.birth_date),
                },
            )?;
            tracing::info!("Updated author {} ({})", author.name, author.id);
            println!("{}", serde_json::to_string_pretty(&author)?);
        }
        AuthorCommand::Delete { id } => {
            catalog.delete_author(id)?;
            println!("✓ Deleted author {}", id);
        }
    }
    Ok(())
}

fn handle_category(
    catalog: &mut SqliteCatalog,
    command: CategoryCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        CategoryCommand::Add { name, description } => {
            let category = catalog.create_category(&NewCategory { name, description })?;
            tracing::info!("Created category {} ({})", category.name, category.id);
            println!("{}", serde_json::to_string_pretty(&category)?);
        }
        CategoryCommand::List => {
            println!(
                "{}",
                serde_json::to_string_pretty(&catalog.list_categories()?)?
            );
        }
        CategoryCommand::Show { id } => {
            println!("{}", serde_json::to_string_pretty(&catalog.get_category(id)?)?);
        }
        CategoryCommand::Update {
            id,
            name,
            description,
        } => {
            let current = catalog.get_category(id)?;
            let category = catalog.update_category(
                id,
                &NewCategory {
                    name: name.unwrap_or(current.name),
                    description: description.or(current.description),
                },
            )?;
            tracing::info!("Updated category {} ({})", category.name, category.id);
            println!("{}", serde_json::to_string_pretty(&category)?);
        }
        CategoryCommand::Delete { id } => {
            catalog.delete_category(id)?;
            println!("✓ Deleted category {}", id);
        }
    }
    Ok(())
}

fn handle_book(
    catalog: &mut SqliteCatalog,
    command: BookCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        BookCommand::List => {
            let books = catalog.list_books()?;
            tracing::info!("{} books in catalog", books.len());
            println!("{}", serde_json::to_string_pretty(&books)?);
        }
        BookCommand::Show { id } => {
            println!("{}", serde_json::to_string_pretty(&catalog.get_book(id)?)?);
        }
        BookCommand::Update {
            id,
            title,
            isbn,
            year,
            price,
            author_id,
            category_id,
            source_url,
        } => {
            let mut update = BookUpdate::from_record(&catalog.get_book(id)?);
            if let Some(title) = title {
                update.title = title;
            }
            if let Some(isbn) = isbn {
                update.isbn = isbn;
            }
            if let Some(year) = year {
                update.publication_year = year;
            }
            if let Some(price) = price {
                update.price = price;
            }
            if let Some(author_id) = author_id {
                update.author_id = author_id;
            }
            if let Some(category_id) = category_id {
                update.category_id = category_id;
            }
            if source_url.is_some() {
                update.source_url = source_url;
            }

            let book = catalog.update_book(id, &update)?;
            tracing::info!("Updated book {} ({})", book.title, book.id);
            println!("{}", serde_json::to_string_pretty(&book)?);
        }
        BookCommand::Delete { id } => {
            catalog.delete_book(id)?;
            println!("✓ Deleted book {}", id);
        }
    }
    Ok(())
}
