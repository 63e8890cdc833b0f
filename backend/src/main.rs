//! csvbin CLI - serve and debug the CSV query service
//!
//! # Main Commands
//!
//! ```bash
//! csvbin serve                          # Start HTTP server (port 3000)
//! csvbin query data.csv -c User -v 'j*' # Run a query against a local file
//! csvbin store list                     # Manage uploaded documents
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! csvbin parse data.csv                 # Just parse CSV to JSON records
//! ```

use clap::{Parser, Subcommand};
use csvbin::{query_file, DocumentStore, StoreConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csvbin")]
#[command(about = "Upload CSV files and query their rows as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Upload directory (default: $CSVBIN_UPLOAD_DIR or ./uploads)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Maximum upload size in bytes
        #[arg(long)]
        max_bytes: Option<usize>,
    },

    /// Parse a CSV file and output its records as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Query a CSV file by column and glob pattern
    Query {
        /// Input CSV file
        input: PathBuf,

        /// Filter column (requires --value)
        #[arg(short, long, requires = "value")]
        column: Option<String>,

        /// Filter pattern, `*` matches any run of characters
        #[arg(short, long, requires = "column")]
        value: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage uploaded documents
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// List all stored documents
    List {
        /// Upload directory (default: $CSVBIN_UPLOAD_DIR or ./uploads)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Delete a stored document
    Delete {
        /// Access code of the document
        code: String,

        /// Upload directory (default: $CSVBIN_UPLOAD_DIR or ./uploads)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            port,
            dir,
            max_bytes,
        } => cmd_serve(port, dir, max_bytes).await,

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Query {
            input,
            column,
            value,
            output,
        } => cmd_query(&input, column.as_deref(), value.as_deref(), output.as_deref()),

        Commands::Store { action } => cmd_store(action).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Build the store configuration from flags, environment, then defaults.
fn store_config(dir: Option<PathBuf>, max_bytes: Option<usize>) -> StoreConfig {
    let mut config = StoreConfig::default();

    if let Some(dir) = dir.or_else(|| std::env::var("CSVBIN_UPLOAD_DIR").ok().map(PathBuf::from))
    {
        config.dir = dir;
    }
    if let Some(max) = max_bytes.or_else(|| {
        std::env::var("CSVBIN_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
    }) {
        config.max_bytes = max;
    }

    config
}

async fn cmd_serve(
    port: u16,
    dir: Option<PathBuf>,
    max_bytes: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = store_config(dir, max_bytes);
    eprintln!("📂 Upload directory: {}", config.dir.display());

    let store = DocumentStore::new(config);
    csvbin::server::start_server(port, store).await
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = query_file(input, None, None)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_query(
    input: &Path,
    column: Option<&str>,
    value: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔎 Querying: {}", input.display());

    let result = query_file(input, column, value)?;

    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    match (column, value) {
        (Some(c), Some(v)) => eprintln!(
            "   Filter: {} = '{}' -> {} of {} rows",
            c,
            v,
            result.records.len(),
            result.row_count
        ),
        _ => eprintln!("   No filter -> {} rows", result.records.len()),
    }

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_store(action: StoreAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        StoreAction::List { dir } => {
            let store = DocumentStore::new(store_config(dir, None));
            let metas = store.list().await?;

            if metas.is_empty() {
                eprintln!("📋 No documents stored yet.");
                return Ok(());
            }

            eprintln!("📋 Stored documents ({}):\n", metas.len());
            for meta in metas {
                println!("  📄 {}", meta.access_code);
                if let Some(ref name) = meta.file_name {
                    println!("     Name: {}", name);
                }
                println!("     Size: {} bytes", meta.size);
                println!("     Uploaded: {}", meta.uploaded_at);
                println!();
            }
        }

        StoreAction::Delete { code, dir } => {
            let store = DocumentStore::new(store_config(dir, None));
            store.delete(&code).await?;
            eprintln!("🗑️  Document deleted: {}", code);
        }
    }

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
