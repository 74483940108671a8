//! flatdb command-line shell
//!
//! ```bash
//! # Interactive session
//! flatdb --root ./data
//!
//! # One command against a preselected database
//! flatdb -d school -c "SELECT * FROM students WHERE age >= 21"
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use flatdb::shell::{Output, Shell};
use flatdb::{DatabaseStore, JsonFileStorage, StoreConfig};

/// Flat-file, schema-typed record store
#[derive(Parser, Debug)]
#[command(name = "flatdb", version, about)]
struct Args {
    /// Directory holding the database documents
    #[arg(long, default_value = "flatdb_data", env = "FLATDB_ROOT")]
    root: PathBuf,

    /// Database to select on startup
    #[arg(short = 'd', long, env = "FLATDB_DATABASE")]
    database: Option<String>,

    /// Execute a single command and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Write documents without indentation
    #[arg(long)]
    compact: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = StoreConfig::new(&args.root).with_pretty(!args.compact);
    debug!(root = %config.root.display(), "opening store");
    let mut shell = Shell::new(DatabaseStore::new(JsonFileStorage::new(config)?));

    if let Some(name) = &args.database {
        shell.use_database(name)?;
    }

    match &args.command {
        Some(command) => {
            if let Output::Text(text) = shell.execute(command)? {
                println!("{text}");
            }
            Ok(())
        }
        None => repl(&mut shell),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("flatdb=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flatdb=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

fn repl(shell: &mut Shell<JsonFileStorage>) -> Result<()> {
    println!("Welcome to flatdb! Type 'help' for available commands.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", shell.prompt());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(());
        };
        match shell.execute(&line?) {
            Ok(Output::Text(text)) if text.is_empty() => {}
            Ok(Output::Text(text)) => println!("{text}"),
            Ok(Output::Exit) => {
                println!("Goodbye!");
                return Ok(());
            }
            Err(e) => println!("Error: {e}"),
        }
    }
}
