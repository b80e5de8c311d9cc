//! Read-only inspection of the imported database.
//!
//! Prints a row count for every imported relation plus a few sample card
//! rows so a fresh import can be eyeballed without opening a SQL shell.

use anyhow::Result;
use clap::Parser;
use i7card_common::catalog::TargetRelation;
use i7card_common::config::Settings;
use i7card_common::db::connect_readonly;
use sqlx::Row;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "verify")]
#[command(about = "Report row counts and sample rows from the imported database")]
struct Cli {
    /// Database file path (overrides config and environment)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Number of sample card rows to print
    #[arg(long, default_value_t = 5)]
    samples: u32,
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
    let pool = connect_readonly(&settings.database_path).await?;

    println!("database: {}", settings.database_path.display());
    println!();

    for relation in TargetRelation::ALL {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", relation.table_name());
        let row = sqlx::query(&sql).fetch_one(&pool).await?;
        let count: i64 = row.get("n");
        println!("{:20} {:>6} rows", relation.table_name(), count);
    }

    if cli.samples > 0 {
        println!();
        println!("sample cards:");
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.card_id, c.cardname, s.attribute
            FROM cards c LEFT JOIN card_stats s ON s.id = c.id
            ORDER BY c.id LIMIT ?1
            "#,
        )
        .bind(cli.samples)
        .fetch_all(&pool)
        .await?;
        for row in rows {
            let id: i64 = row.get("id");
            let card_id: i64 = row.get("card_id");
            let name: Option<String> = row.get("cardname");
            let attribute: Option<i64> = row.get("attribute");
            println!(
                "  id={:<6} card_id={:<6} attribute={:<4} {}",
                id,
                card_id,
                attribute.map(|a| a.to_string()).unwrap_or_default(),
                name.unwrap_or_default()
            );
        }
    }

    Ok(())
}
