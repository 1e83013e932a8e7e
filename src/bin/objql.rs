//! objql CLI
//!
//! Compiles object queries against an entity catalog and prints the
//! generated SQL with its parameter and result metadata.
//!
//! # Usage
//!
//! ```bash
//! # Compile an object query
//! objql compile --catalog entities.toml "select e from Employee e where e.id = :id"
//!
//! # Normalize the placeholders of native SQL
//! objql compile --catalog entities.toml --native "SELECT * FROM employee WHERE id = $1"
//!
//! # List mapped entities
//! objql entities --catalog entities.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use objql::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "objql")]
#[command(version)]
#[command(about = "Object query compiler", long_about = None)]
#[command(after_help = "EXAMPLES:
    objql compile -c entities.toml 'select e from Employee e where e.id = ?1'
    objql compile -c entities.toml --fetch-relationships lazy 'select e from Employee e'
    objql entities -c entities.toml")]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and print the result
    Compile {
        /// Entity catalog (TOML)
        #[arg(short, long, env = "OBJQL_CATALOG")]
        catalog: PathBuf,

        /// Compiler configuration (TOML)
        #[arg(long, env = "OBJQL_CONFIG")]
        config: Option<PathBuf>,

        /// Treat the query as native SQL
        #[arg(long)]
        native: bool,

        /// Override the fetch policy of every relationship
        #[arg(long, value_name = "eager|lazy")]
        fetch_relationships: Option<FetchPolicy>,

        /// Override the fetch policy of plain columns
        #[arg(long, value_name = "eager|lazy")]
        fetch_columns: Option<FetchPolicy>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// The query text
        query: String,
    },
    /// List the entities of a catalog
    Entities {
        /// Entity catalog (TOML)
        #[arg(short, long, env = "OBJQL_CATALOG")]
        catalog: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Compile {
            catalog,
            config,
            native,
            fetch_relationships,
            fetch_columns,
            format,
            query,
        } => {
            let mut hints = QueryHints::new();
            hints.relationship_fetch = *fetch_relationships;
            hints.column_fetch = *fetch_columns;
            let language = if *native { QueryLanguage::Native } else { QueryLanguage::Object };
            compile(catalog, config.as_deref(), language, hints, format, query)
        }
        Commands::Entities { catalog } => list_entities(catalog),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "objql=debug" } else { "objql=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn compile(
    catalog: &Path,
    config: Option<&Path>,
    language: QueryLanguage,
    hints: QueryHints,
    format: &OutputFormat,
    query: &str,
) -> Result<()> {
    let catalog = EntityCatalog::load_from_file(catalog)
        .with_context(|| format!("loading catalog {}", catalog.display()))?;
    let config = match config {
        Some(path) => CompilerConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => CompilerConfig::default(),
    };

    let compiler = QueryCompiler::new(Arc::new(catalog), config);
    let compiled = match compiler.compile(query, language, &hints) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("{} {}", format!("{:?}", e.kind()).red().bold(), e);
            std::process::exit(2);
        }
    };

    match format {
        OutputFormat::Json => println!("{}", compiled.to_json()?),
        OutputFormat::Text => print_compiled(&compiled),
    }
    Ok(())
}

fn print_compiled(compiled: &CompiledQuery) {
    println!("{} {}", "Kind:".dimmed(), compiled.kind.to_string().cyan());
    println!("{}", "SQL:".green().bold());
    println!("  {}", compiled.sql.white());

    if !compiled.parameters.is_empty() {
        println!();
        println!("{}", "Parameters:".cyan());
        for param in &compiled.parameters {
            let source = match (&param.name, param.index) {
                (Some(name), _) => format!(":{}", name),
                (None, Some(index)) => format!("?{}", index),
                (None, None) => "?".to_string(),
            };
            let component = param
                .component
                .as_ref()
                .map(|c| format!(" ({}.{})", c.class, c.path))
                .unwrap_or_default();
            println!(
                "  {} {} {}{}",
                format!("#{}", param.position).dimmed(),
                source.yellow(),
                param.value_type,
                component.dimmed()
            );
        }
    }

    if !compiled.return_types.is_empty() {
        println!();
        println!("{}", "Returns:".cyan());
        for ret in &compiled.return_types {
            let array = if ret.array { " (array)" } else { "" };
            println!("  {} {}{}", ret.label.yellow(), ret.class, array.dimmed());
        }
    }

    if compiled.kind == StatementKind::Select && compiled.language == QueryLanguage::Object {
        println!();
        let flag = if compiled.primary_key_lookup {
            "yes".green()
        } else {
            "no".dimmed()
        };
        println!("{} {}", "Primary key lookup:".dimmed(), flag);
    }
}

fn list_entities(path: &Path) -> Result<()> {
    let catalog =
        EntityCatalog::load_from_file(path).with_context(|| format!("loading catalog {}", path.display()))?;

    for name in catalog.names() {
        let Some(entity) = catalog.entity(name) else {
            continue;
        };
        let version = entity
            .version_field()
            .map(|f| format!(", version {}", f.name))
            .unwrap_or_default();
        println!(
            "{} {}",
            entity.name.cyan().bold(),
            format!("({}{})", entity.table, version).dimmed()
        );
        for field in &entity.fields {
            let mut notes = Vec::new();
            if field.id {
                notes.push("id".to_string());
            }
            if let Some(target) = &field.target {
                notes.push(format!("-> {}", target));
            }
            if field.mapping.is_relationship() {
                notes.push(field.fetch_policy().to_string());
            }
            let column = if field.column.is_empty() { "-" } else { field.column.as_str() };
            println!(
                "  {:<16} {:<14} {:<12} {}",
                field.name.white(),
                format!("{:?}", field.mapping),
                column,
                notes.join(", ").dimmed()
            );
        }
    }
    Ok(())
}
