/// Main entry point for the habit tracker server
///
/// This file sets up logging, reads configuration from the command line and
/// environment, and starts the HTTP server.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use habit_tracker_server::{HabitTrackerServer, ServerConfig, StoreLocation};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|p| p.join(".habit_tracker")),
        dirs::data_dir().map(|p| p.join("habit_tracker")),
        dirs::config_dir().map(|p| p.join("habit_tracker")),
        // Current working directory (last resort)
        std::env::current_dir().ok().map(|p| p.join(".habit_tracker")),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            // Only use the directory if we can actually write to it
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("habits.db"));
            }
        }
    }

    let temp_path = std::env::temp_dir().join("habit_tracker");
    std::fs::create_dir_all(&temp_path)?;
    let db_path = temp_path.join("habits.db");

    tracing::warn!("Using temporary directory for database: {}", db_path.display());
    Ok(db_path)
}

/// Command line arguments for the habit tracker server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, env = "HABIT_DB_PATH")]
    database: Option<PathBuf>,

    /// Keep habits in memory instead of a database file
    #[arg(long, conflicts_with = "database")]
    in_memory: bool,

    /// Directory uploaded images are stored in
    #[arg(long, env = "UPLOADS_DIR", default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Public base URL used in image links (defaults to http://localhost:<port>)
    #[arg(long, env = "PUBLIC_URL")]
    public_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // RUST_LOG wins over the command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "habit_tracker_server={},tower_http={}",
            log_level, log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting habit tracker server");

    let store = if args.in_memory {
        StoreLocation::Memory
    } else {
        let db_path = match args.database {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                path
            }
            None => get_default_database_path()?,
        };
        info!("Using database at: {}", db_path.display());
        StoreLocation::Sqlite(db_path)
    };

    let config =
        ServerConfig::new(args.port, store, args.uploads_dir).with_public_url(args.public_url);

    let server = HabitTrackerServer::new(config).await?;
    server.run().await?;

    info!("Habit tracker server shutdown complete");
    Ok(())
}
