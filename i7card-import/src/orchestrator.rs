//! Import orchestration
//!
//! Drives one import pass per sheet: fetch, extract, then one atomic unit
//! of relation writes per record. A fetch failure aborts the pass before
//! anything is written; a failed record rolls back alone and the pass
//! continues, so the blast radius of a malformed row is that row.
//!
//! The pipeline is sequential in source order on purpose: the score-calc
//! path must create its song before the team composition referencing it
//! is written.

use i7card_common::config::Settings;
use i7card_common::Result;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::cell::PercentPolicy;
use crate::fetch::SheetClient;
use crate::record::{self, RowOutcome};
use crate::scan;
use crate::summary::ImportSummary;
use crate::upsert::{self, ScoreCalcSong, TeamScores};

/// Orchestrates import passes against one database
pub struct Importer {
    db: SqlitePool,
}

impl Importer {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Run every sheet import in order, returning one summary per sheet
    pub async fn import_all(
        &self,
        client: &SheetClient,
        settings: &Settings,
        policy: PercentPolicy,
    ) -> Result<Vec<(&'static str, ImportSummary)>> {
        let mut summaries = Vec::new();
        summaries.push(("cards", self.import_cards(client, settings).await?));
        summaries.push(("songs", self.import_songs(client, settings, policy).await?));
        summaries.push((
            "group_cards",
            self.import_group_cards(client, settings).await?,
        ));
        summaries.push((
            "score_calc",
            self.import_score_calc(client, settings, policy).await?,
        ));
        Ok(summaries)
    }

    /// Fetch and import the main card sheet
    pub async fn import_cards(
        &self,
        client: &SheetClient,
        settings: &Settings,
    ) -> Result<ImportSummary> {
        let csv_text = client
            .fetch_csv(&settings.sheet_id, &settings.gids.cards)
            .await?;
        self.import_cards_csv(&csv_text).await
    }

    /// Fetch and import the songs sheet
    pub async fn import_songs(
        &self,
        client: &SheetClient,
        settings: &Settings,
        policy: PercentPolicy,
    ) -> Result<ImportSummary> {
        let csv_text = client
            .fetch_csv(&settings.sheet_id, &settings.gids.songs)
            .await?;
        self.import_songs_csv(&csv_text, policy).await
    }

    /// Fetch and import the group-card sheet
    pub async fn import_group_cards(
        &self,
        client: &SheetClient,
        settings: &Settings,
    ) -> Result<ImportSummary> {
        let csv_text = client
            .fetch_csv(&settings.sheet_id, &settings.gids.group_cards)
            .await?;
        self.import_group_cards_csv(&csv_text).await
    }

    /// Fetch and import the score-calculation sheet
    pub async fn import_score_calc(
        &self,
        client: &SheetClient,
        settings: &Settings,
        policy: PercentPolicy,
    ) -> Result<ImportSummary> {
        let csv_text = client
            .fetch_csv(&settings.sheet_id, &settings.gids.score_calc)
            .await?;
        self.import_score_calc_csv(&csv_text, policy).await
    }

    /// Import main card records from already-fetched CSV text.
    ///
    /// One card record fans out over six keyed relations plus the
    /// replace-then-insert skill details; all of them commit or roll back
    /// together.
    pub async fn import_cards_csv(&self, csv_text: &str) -> Result<ImportSummary> {
        let sheet = record::card_sheet();
        let mut summary = ImportSummary::new();

        for outcome in record::extract(csv_text, &sheet)? {
            let record = match outcome {
                RowOutcome::Record(record) => record,
                RowOutcome::NoKey { row_index } => {
                    debug!(row = row_index, "Skipped row: no ID");
                    summary.record_skipped();
                    continue;
                }
                RowOutcome::Unreadable { row_index, message } => {
                    warn!(row = row_index, error = %message, "Unreadable row");
                    summary.record_errored(Some(row_index), None, message);
                    continue;
                }
            };

            let mut tx = self.db.begin().await?;
            let result = async {
                upsert::upsert_card(&mut tx, &record).await?;
                upsert::upsert_card_stats(&mut tx, &record).await?;
                upsert::upsert_card_skills(&mut tx, &record).await?;
                let levels = record::present_skill_levels(&record);
                upsert::replace_skill_details(&mut tx, record.key, &levels).await?;
                upsert::upsert_release_info(&mut tx, &record).await?;
                upsert::upsert_broach_info(&mut tx, &record).await?;
                upsert::upsert_skill_guess(&mut tx, &record).await?;
                Ok::<(), i7card_common::Error>(())
            }
            .await;

            match result {
                Ok(()) => match tx.commit().await {
                    Ok(()) => summary.record_committed(),
                    Err(e) => {
                        warn!(row = record.row_index, card_id = record.key, error = %e, "Commit failed");
                        summary.record_errored(
                            Some(record.row_index),
                            Some(record.key),
                            e.to_string(),
                        );
                    }
                },
                Err(e) => {
                    warn!(row = record.row_index, card_id = record.key, error = %e, "Record rolled back");
                    let _ = tx.rollback().await;
                    summary.record_errored(Some(record.row_index), Some(record.key), e.to_string());
                }
            }
        }

        info!(sheet = "cards", %summary, "Import pass complete");
        Ok(summary)
    }

    /// Import song records from already-fetched CSV text
    pub async fn import_songs_csv(
        &self,
        csv_text: &str,
        policy: PercentPolicy,
    ) -> Result<ImportSummary> {
        let mut summary = ImportSummary::new();

        for outcome in record::extract_songs(csv_text)? {
            let mut record = match outcome {
                RowOutcome::Record(record) => record,
                RowOutcome::NoKey { row_index } => {
                    debug!(row = row_index, "Skipped row: no song id");
                    summary.record_skipped();
                    continue;
                }
                RowOutcome::Unreadable { row_index, message } => {
                    summary.record_errored(Some(row_index), None, message);
                    continue;
                }
            };
            normalize_percent_fields(&mut record, policy);

            let mut tx = self.db.begin().await?;
            let result = upsert::upsert_song(&mut tx, &record).await;

            match result {
                Ok(()) => match tx.commit().await {
                    Ok(()) => summary.record_committed(),
                    Err(e) => {
                        summary.record_errored(
                            Some(record.row_index),
                            Some(record.key),
                            e.to_string(),
                        );
                    }
                },
                Err(e) => {
                    warn!(row = record.row_index, song_id = record.key, error = %e, "Record rolled back");
                    let _ = tx.rollback().await;
                    summary.record_errored(Some(record.row_index), Some(record.key), e.to_string());
                }
            }
        }

        info!(sheet = "songs", %summary, "Import pass complete");
        Ok(summary)
    }

    /// Import group-card records from already-fetched CSV text
    pub async fn import_group_cards_csv(&self, csv_text: &str) -> Result<ImportSummary> {
        let sheet = record::group_card_sheet();
        let mut summary = ImportSummary::new();

        for outcome in record::extract(csv_text, &sheet)? {
            let record = match outcome {
                RowOutcome::Record(record) => record,
                RowOutcome::NoKey { row_index } => {
                    debug!(row = row_index, "Skipped row: no ID");
                    summary.record_skipped();
                    continue;
                }
                RowOutcome::Unreadable { row_index, message } => {
                    summary.record_errored(Some(row_index), None, message);
                    continue;
                }
            };

            let mut tx = self.db.begin().await?;
            let result = upsert::upsert_group_card(&mut tx, &record).await;

            match result {
                Ok(()) => match tx.commit().await {
                    Ok(()) => summary.record_committed(),
                    Err(e) => {
                        summary.record_errored(
                            Some(record.row_index),
                            Some(record.key),
                            e.to_string(),
                        );
                    }
                },
                Err(e) => {
                    warn!(row = record.row_index, card_id = record.key, error = %e, "Record rolled back");
                    let _ = tx.rollback().await;
                    summary.record_errored(Some(record.row_index), Some(record.key), e.to_string());
                }
            }
        }

        info!(sheet = "group_cards", %summary, "Import pass complete");
        Ok(summary)
    }

    /// Import one score-calculation sheet from already-fetched CSV text.
    ///
    /// The whole sheet describes a single logical record: one song (found
    /// or created by name) and, when a full roster was scanned, one team
    /// composition keyed to it.
    pub async fn import_score_calc_csv(
        &self,
        csv_text: &str,
        policy: PercentPolicy,
    ) -> Result<ImportSummary> {
        let rows = scan::raw_rows(csv_text)?;
        let output = scan::scan(&rows, scan::SCORE_CALC_LABELS);
        let mut summary = ImportSummary::new();

        // The song name is the minimum viable field for this record type
        let Some(song_name) = output.text("song_name") else {
            debug!(
                fields = output.fields.len(),
                "Score-calc scan below minimum field set; nothing persisted"
            );
            summary.record_skipped();
            return Ok(summary);
        };

        let song = ScoreCalcSong {
            song_name: song_name.to_string(),
            song_type: output.text("song_type").map(str::to_string),
            song_category: output.text("song_category").map(str::to_string),
            artist_name: output.text("artist_name").map(str::to_string),
            notes_count: output.int("notes_count"),
            duration_seconds: output.int("duration_seconds"),
            shout_percentage: output.float("shout_percentage").map(|v| policy.normalize(v)),
            beat_percentage: output.float("beat_percentage").map(|v| policy.normalize(v)),
            melody_percentage: output.float("melody_percentage").map(|v| policy.normalize(v)),
        };
        let scores = TeamScores {
            attribute_score: output.int("attribute_score"),
            scoreup_skill_score: output.int("scoreup_skill_score"),
            reduction_skill_score: output.int("reduction_skill_score"),
            live_end_score: output.int("live_end_score"),
            final_result_score: output.int("final_result_score"),
        };

        let mut tx = self.db.begin().await?;
        let result = async {
            let song_row_id = upsert::lookup_or_create_song(&mut tx, &song).await?;
            let team_row_id = if output.roster.len() >= 6 {
                Some(
                    upsert::upsert_team_composition(
                        &mut tx,
                        song_row_id,
                        &output.roster[..6],
                        &scores,
                    )
                    .await?,
                )
            } else {
                None
            };
            Ok::<(i64, Option<i64>), i7card_common::Error>((song_row_id, team_row_id))
        }
        .await;

        match result {
            Ok((song_row_id, team_row_id)) => match tx.commit().await {
                Ok(()) => {
                    summary.record_committed();
                    summary.song_row_id = Some(song_row_id);
                    summary.team_row_id = team_row_id;
                    info!(
                        song = %song.song_name,
                        song_row_id,
                        team = team_row_id.is_some(),
                        "Score-calc record committed"
                    );
                }
                Err(e) => summary.record_errored(None, None, e.to_string()),
            },
            Err(e) => {
                warn!(song = %song.song_name, error = %e, "Score-calc record rolled back");
                let _ = tx.rollback().await;
                summary.record_errored(None, None, e.to_string());
            }
        }

        info!(sheet = "score_calc", %summary, "Import pass complete");
        Ok(summary)
    }
}

/// Apply the sheet's percent policy to the percentage fields of a song row
fn normalize_percent_fields(record: &mut crate::record::Record, policy: PercentPolicy) {
    use crate::cell::Value;
    for field in ["shout_percentage", "beat_percentage", "melody_percentage"] {
        if let Some(raw) = record.float(field) {
            record.insert(field, Value::Float(policy.normalize(raw)));
        }
    }
}
