mod bench;
mod render;
mod shell;

use arbor_query::Database;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "A lightweight B+ tree database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Database name; its snapshot lives at data/<name>/db.json
    #[arg(long, default_value = "arbor")]
    db: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive shell (Default)
    Shell,
    /// Execute a single shell command
    Exec { command: String },
    /// Replay INSERT statements from a SQL file and save
    Load { file: PathBuf },
    /// Race the B+ tree against the linear baseline
    Bench {
        /// Number of keys per workload
        #[arg(long, default_value_t = 10_000)]
        count: usize,
        /// Branching order of the benchmarked tree
        #[arg(long, default_value_t = 5)]
        order: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Bench { count, order }) => bench::run(count, order),
        Some(Commands::Exec { command }) => {
            let mut shell = shell::Shell::new(Database::open(&cli.db));
            println!("{}", shell.execute(&command)?);
        }
        Some(Commands::Load { file }) => {
            let mut db = Database::open(&cli.db);
            let inserted = arbor_query::sql::load_sql_file(&mut db, &file)?;
            db.save()?;
            println!(
                "{} {} rows loaded into `{}`",
                "OK".green(),
                inserted,
                db.name()
            );
        }
        Some(Commands::Shell) | None => shell::run_repl(Database::open(&cli.db))?,
    }

    Ok(())
}
