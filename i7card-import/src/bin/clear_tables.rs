//! Wipe every imported relation, children before parents.
//!
//! Deletes rows rather than dropping tables, so the schema survives and the
//! next import starts from a clean slate. Asks for confirmation first unless
//! --yes was passed.

use anyhow::Result;
use clap::Parser;
use i7card_common::catalog::TargetRelation;
use i7card_common::config::Settings;
use i7card_common::db::init_database_pool;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clear-tables")]
#[command(about = "Delete all rows from every imported relation")]
struct Cli {
    /// Database file path (overrides config and environment)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(cli.db, None)?;

    if !cli.yes {
        print!(
            "This deletes all rows in {} (type \"yes\" to continue): ",
            settings.database_path.display()
        );
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if answer.trim() != "yes" {
            println!("aborted");
            return Ok(());
        }
    }

    let pool = init_database_pool(&settings.database_path).await?;

    // Children first so foreign key references never dangle mid-wipe
    for relation in TargetRelation::clear_order() {
        let sql = format!("DELETE FROM {}", relation.table_name());
        let result = sqlx::query(&sql).execute(&pool).await?;
        println!(
            "{:20} {:>6} rows deleted",
            relation.table_name(),
            result.rows_affected()
        );
    }

    Ok(())
}
