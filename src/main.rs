mod config;
mod picker;
mod report;
mod schema;
mod store;
mod translit;
mod variations;

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::{Connection, OpenFlags};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use config::Config;
use report::{ProgressReporter, Reporter, TracingReporter};
use store::{VariationStats, VariationStore};

#[derive(Parser, Debug)]
#[command(name = "ocrvar")]
#[command(about = "Store OCR-confusable variations of a text column", long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/ocrvar/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Do not draw a progress bar
    #[arg(long, global = true, default_value_t = false)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate variations for a column and store them in <table>_variations
    Process(ProcessArgs),
    /// List the tables of a database
    Tables(DbArgs),
    /// List the columns of a table
    Columns(ColumnsArgs),
    /// Print the variations of a single string
    Generate {
        text: String,
    },
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// SQLite file; picked from the search directory when omitted
    #[arg(long)]
    db: Option<PathBuf>,

    /// Source table; picked interactively when omitted
    #[arg(long)]
    table: Option<String>,

    /// Text column; picked interactively when omitted
    #[arg(long)]
    column: Option<String>,

    /// Source values per committed batch
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Args, Debug)]
struct DbArgs {
    #[arg(long)]
    db: PathBuf,
}

#[derive(Args, Debug)]
struct ColumnsArgs {
    #[arg(long)]
    db: PathBuf,

    #[arg(long)]
    table: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Process(args) => {
            let log_file = cli.log_file.unwrap_or_else(|| config.log_file.clone());
            init_logging(Some(&log_file))?;
            handle_process(args, &config, config.progress && !cli.no_progress)
        }
        Command::Tables(args) => {
            init_logging(cli.log_file.as_deref())?;
            let conn = open_read_only(&args.db)?;
            for table in schema::list_tables(&conn)? {
                println!("{}", table);
            }
            Ok(())
        }
        Command::Columns(args) => {
            init_logging(cli.log_file.as_deref())?;
            let conn = open_read_only(&args.db)?;
            if !schema::list_tables(&conn)?.contains(&args.table) {
                bail!("table `{}` does not exist", args.table);
            }
            for column in schema::list_columns(&conn, &args.table)? {
                println!("{}", column);
            }
            Ok(())
        }
        Command::Generate { text } => {
            for variation in variations::generate(&text) {
                println!("{}", variation);
            }
            Ok(())
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .try_init()
        .context("failed to initialise logging")?;
    Ok(())
}

fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open database {}", path.display()))
}

fn handle_process(args: ProcessArgs, config: &Config, progress: bool) -> Result<()> {
    if let Some(path) = &config.config_path {
        info!("loaded configuration from {}", path.display());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let db = match args.db {
        Some(db) => db,
        None => pick_database(&config.search_dir, &mut input, &mut output)?,
    };

    let conn = open_read_only(&db)?;
    let table = match args.table {
        Some(table) => table,
        None => {
            let tables = schema::source_tables(&conn)?;
            let idx = picker::choose(
                &tables,
                "Tables found in the database:",
                "Select the number of the table to process",
                &mut input,
                &mut output,
            )?;
            tables[idx].clone()
        }
    };
    let column = match args.column {
        Some(column) => column,
        None => {
            let columns = schema::list_columns(&conn, &table)?;
            let idx = picker::choose(
                &columns,
                "Columns found in the selected table:",
                "Select the number of the description column to process",
                &mut input,
                &mut output,
            )?;
            columns[idx].clone()
        }
    };
    schema::validate(&conn, &table, &column)?;
    drop(conn);

    let batch_size = args.batch_size.unwrap_or(config.batch_size);
    info!(
        db = %db.display(),
        table = table.as_str(),
        column = column.as_str(),
        "processing file '{}', table '{}', column '{}'",
        db.display(),
        table,
        column
    );

    let stats = if progress {
        let reporter = ProgressReporter::new(TracingReporter);
        run_store(&db, &reporter, batch_size, &table, &column)?
    } else {
        run_store(&db, &TracingReporter, batch_size, &table, &column)?
    };

    println!(
        "Stored {} variations in {} ({} new, {} already present, {} rejected).",
        stats.total_variations,
        store::variations_table(&table),
        stats.inserted,
        stats.already_present,
        stats.conflicts
    );
    println!(
        "Processed {} of {} distinct values ({} empty) in {} batches.",
        stats.processed, stats.found, stats.skipped, stats.commits
    );
    Ok(())
}

fn run_store(
    db: &Path,
    reporter: &dyn Reporter,
    batch_size: usize,
    table: &str,
    column: &str,
) -> Result<VariationStats> {
    // Failures inside the pass are already reported with the table name.
    let stats = VariationStore::open(db, reporter)?
        .with_batch_size(batch_size)
        .process(table, column)?;
    Ok(stats)
}

/// Offer the `*.sqlite` files of `dir`, sorted by name.
fn pick_database<R: BufRead, W: Write>(dir: &Path, input: &mut R, output: &mut W) -> Result<PathBuf> {
    let files = sqlite_files(dir)?;
    if files.is_empty() {
        bail!("no .sqlite file found in {}", dir.display());
    }

    let names: Vec<String> = files
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();
    let idx = picker::choose(
        &names,
        "Database files found:",
        "Select the number of the file to process",
        input,
        output,
    )?;
    Ok(files[idx].clone())
}

fn sqlite_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sqlite") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_sqlite_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.sqlite"), b"").unwrap();
        fs::write(dir.path().join("a.sqlite"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("dir.sqlite")).unwrap();

        let files = sqlite_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.sqlite"), dir.path().join("b.sqlite")]
        );
    }

    #[test]
    fn test_pick_database() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.sqlite"), b"").unwrap();
        fs::write(dir.path().join("b.sqlite"), b"").unwrap();

        let mut input = Cursor::new("2\n");
        let mut output = Vec::new();
        let picked = pick_database(dir.path(), &mut input, &mut output).unwrap();
        assert_eq!(picked, dir.path().join("b.sqlite"));
    }

    #[test]
    fn test_pick_database_empty_dir() {
        let dir = TempDir::new().unwrap();
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let err = pick_database(dir.path(), &mut input, &mut output).unwrap_err();
        assert!(err.to_string().contains("no .sqlite file found"));
    }
}
