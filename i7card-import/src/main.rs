//! i7card-import binary entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use i7card_common::config::Settings;
use i7card_common::db::init_database_pool;
use i7card_import::{ImportSummary, Importer, PercentPolicy, SheetClient};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "i7card-import")]
#[command(about = "Import the community card spreadsheet into the local database")]
struct Cli {
    /// Database file path (overrides config and environment)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Spreadsheet document id (overrides config and environment)
    #[arg(long)]
    sheet_id: Option<String>,

    /// Treat percentage cells as fractions already in 0.0 to 1.0
    #[arg(long)]
    fraction_percentages: bool,

    /// Print per-sheet summaries as JSON on stdout
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Import every sheet in order (default)
    All,
    /// Import the main card sheet only
    Cards,
    /// Import the songs sheet only
    Songs,
    /// Import the group-card sheet only
    GroupCards,
    /// Import the score-calculation sheet only
    ScoreCalc,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(cli.db, cli.sheet_id)?;
    let policy = if cli.fraction_percentages {
        PercentPolicy::Fraction
    } else {
        PercentPolicy::WholeNumber
    };

    info!(
        db = %settings.database_path.display(),
        sheet_id = %settings.sheet_id,
        "Starting import"
    );

    let pool = init_database_pool(&settings.database_path).await?;
    let client = SheetClient::new()?;
    let importer = Importer::new(pool);

    let summaries: Vec<(&str, ImportSummary)> = match cli.command.unwrap_or(Command::All) {
        Command::All => importer.import_all(&client, &settings, policy).await?,
        Command::Cards => vec![("cards", importer.import_cards(&client, &settings).await?)],
        Command::Songs => vec![(
            "songs",
            importer.import_songs(&client, &settings, policy).await?,
        )],
        Command::GroupCards => vec![(
            "group_cards",
            importer.import_group_cards(&client, &settings).await?,
        )],
        Command::ScoreCalc => vec![(
            "score_calc",
            importer.import_score_calc(&client, &settings, policy).await?,
        )],
    };

    for (sheet, summary) in &summaries {
        report(sheet, summary);
    }
    if cli.json {
        let by_sheet: std::collections::BTreeMap<&str, &ImportSummary> =
            summaries.iter().map(|(sheet, s)| (*sheet, s)).collect();
        println!("{}", serde_json::to_string_pretty(&by_sheet)?);
    }

    Ok(())
}

fn report(sheet: &str, summary: &ImportSummary) {
    info!(sheet, %summary, "Sheet imported");
    for err in &summary.errors {
        warn!(
            sheet,
            row = err.row_index,
            key = err.key,
            error = %err.message,
            "Record failed"
        );
    }
}
