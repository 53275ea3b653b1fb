//! SchemaNest command-line tool.
//!
//! Connects to a database, reads its structural metadata, and writes one
//! nested JSON document per table in which foreign keys appear as embedded
//! sub-documents.
//!
//! # Security Guarantees
//! - Read-only catalog queries only; table rows are never read
//! - Passwords are never logged or written to config files

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use schemanest::{config::ProjectConfig, credentials::resolve_database_url, export, output};
use schemanest_core::{Result, create_inspector, logging::init_logging, redact_database_url};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "schemanest")]
#[command(about = "Export a database schema as nested, foreign-key-shaped JSON")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "
SchemaNest - Nested JSON documents from relational schemas

Reads tables, columns, primary keys and foreign keys, then renders each table
as a document in which referenced and referencing tables are embedded.
Cycles and depth limits are marked in place.

SUPPORTED DATABASES:
- PostgreSQL (postgres://)
- SQLite (sqlite:// or .db/.sqlite files)

EXAMPLES:
  schemanest --database-url postgres://user@localhost/shop --schemas public,sales
  schemanest build --max-depth 2 --compact --output shop.json
  schemanest schemas --database-url sqlite:///data/shop.db
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Export the nested document (default)
    Build(BuildArgs),
    /// List schemas visible to the connection
    Schemas(ConnectionArgs),
    /// Test database connection
    Test(ConnectionArgs),
}

#[derive(Args)]
struct ConnectionArgs {
    /// Database connection URL
    #[arg(
        long,
        env = "DATABASE_URL",
        help = "Database connection string (credentials will be sanitized in logs)"
    )]
    database_url: Option<String>,

    /// Prompt for the database password
    #[arg(long, help = "Prompt for the password instead of reading it from the URL")]
    ask_password: bool,
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Output file path
    #[arg(short, long, help = "Output file path [default: database_structure.json]")]
    output: Option<PathBuf>,

    /// Disable pretty printing
    #[arg(long, help = "Write compact JSON instead of indented JSON")]
    compact: bool,

    /// Schemas to export
    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "Comma-separated schemas to export (default: all visible)"
    )]
    schemas: Vec<String>,

    /// Maximum nesting depth
    #[arg(long, help = "Maximum nesting depth below each table [default: 3, max: 16]")]
    max_depth: Option<u32>,

    /// Configuration file to read
    #[arg(short, long, help = "Read settings from a JSON config file")]
    config: Option<PathBuf>,

    /// Configuration file to write
    #[arg(long, help = "Save the effective settings (without password) to a JSON file")]
    save_config: Option<PathBuf>,
}

impl BuildArgs {
    fn overrides(&self) -> ProjectConfig {
        ProjectConfig {
            database_url: self.connection.database_url.clone(),
            schemas: self.schemas.clone(),
            max_depth: self.max_depth,
            pretty: self.compact.then_some(false),
            output: self.output.clone(),
        }
    }
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Some(Command::Build(args)) => build(args, cli.global.quiet).await,
        Some(Command::Schemas(args)) => list_schemas(args).await,
        Some(Command::Test(args)) => test_connection(args).await,
        None => build(&cli.build, cli.global.quiet).await,
    }
}

/// Exports the nested document.
async fn build(args: &BuildArgs, quiet: bool) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => ProjectConfig::load(path).await?,
        None => ProjectConfig::default(),
    };
    let project = file_config.merge(args.overrides());

    if let Some(path) = &args.save_config {
        project.save(path).await?;
    }

    let database_url = resolve_database_url(
        project.database_url.as_deref(),
        args.connection.ask_password,
    )?;

    info!("Starting export...");
    info!("Target: {}", redact_database_url(&database_url));

    let (document, output_path) = export(&database_url, &project).await.map_err(|e| {
        error!("Export failed: {}", e);
        e
    })?;

    info!("✓ Document saved to {}", output_path.display());
    if !quiet {
        println!("{}", output::summary(&document, &output_path));
    }
    Ok(())
}

/// Prints schemas visible to the connection, one per line.
async fn list_schemas(args: &ConnectionArgs) -> Result<()> {
    let database_url = resolve_database_url(args.database_url.as_deref(), args.ask_password)?;
    let inspector = create_inspector(&database_url).await?;

    for schema in inspector.list_schemas().await? {
        println!("{}", schema);
    }
    Ok(())
}

/// Tests database connection without reading any schema.
async fn test_connection(args: &ConnectionArgs) -> Result<()> {
    info!("Testing database connection...");

    let database_url = resolve_database_url(args.database_url.as_deref(), args.ask_password)?;
    let inspector = create_inspector(&database_url).await?;

    info!("Created {} inspector", inspector.database_type());

    inspector.test_connection().await.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;

    info!("✓ Connection test successful");
    println!(
        "Connection to {} database successful",
        inspector.database_type()
    );
    Ok(())
}
