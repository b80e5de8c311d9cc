//! Relation upserts
//!
//! One function per target relation, insert-or-update keyed by the stable
//! entity id so repeated imports reconcile instead of duplicating. Every
//! function executes on a plain connection handle; the orchestrator passes
//! a transaction so all relations of one record commit or roll back as a
//! unit.

use i7card_common::Result;
use sqlx::SqliteConnection;

use crate::record::{Record, SkillLevel};

/// Upsert the core card row
pub async fn upsert_card(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cards (
            id, card_id, cardname, name, name_other,
            groupname, rarity, get_type, story, awakening_item
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            card_id = excluded.card_id,
            cardname = excluded.cardname,
            name = excluded.name,
            name_other = excluded.name_other,
            groupname = excluded.groupname,
            rarity = excluded.rarity,
            get_type = excluded.get_type,
            story = excluded.story,
            awakening_item = excluded.awakening_item
        "#,
    )
    .bind(record.key)
    .bind(record.int_or_key("cardID"))
    .bind(record.text("cardname"))
    .bind(record.text("name"))
    .bind(record.text("name_other"))
    .bind(record.text("groupname"))
    .bind(record.text("rarity"))
    .bind(record.text("get_type"))
    .bind(record.text("story"))
    .bind(record.int("awakening_item"))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Upsert the card's stat block
pub async fn upsert_card_stats(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO card_stats (
            id, attribute, shout_min, shout_max,
            beat_min, beat_max, melody_min, melody_max
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            attribute = excluded.attribute,
            shout_min = excluded.shout_min,
            shout_max = excluded.shout_max,
            beat_min = excluded.beat_min,
            beat_max = excluded.beat_max,
            melody_min = excluded.melody_min,
            melody_max = excluded.melody_max
        "#,
    )
    .bind(record.key)
    .bind(record.int("attribute"))
    .bind(record.int("shout_min"))
    .bind(record.int("shout_max"))
    .bind(record.int("beat_min"))
    .bind(record.int("beat_max"))
    .bind(record.int("melody_min"))
    .bind(record.int("melody_max"))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Upsert the card's skill summary
pub async fn upsert_card_skills(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO card_skills (
            id, ap_skill_type, ap_skill_req, ap_skill_name,
            ct_skill, comment, sp_time, sp_value
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            ap_skill_type = excluded.ap_skill_type,
            ap_skill_req = excluded.ap_skill_req,
            ap_skill_name = excluded.ap_skill_name,
            ct_skill = excluded.ct_skill,
            comment = excluded.comment,
            sp_time = excluded.sp_time,
            sp_value = excluded.sp_value
        "#,
    )
    .bind(record.key)
    .bind(record.text("ap_skill_type"))
    .bind(record.int("ap_skill_req"))
    .bind(record.text("ap_skill_name"))
    .bind(record.int("ct_skill"))
    .bind(record.text("comment"))
    .bind(record.int("sp_time"))
    .bind(record.int("sp_value"))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Replace all skill-detail rows of a card.
///
/// The number of present levels can shrink between imports, so the old
/// rows are removed first and each present level re-inserted.
pub async fn replace_skill_details(
    conn: &mut SqliteConnection,
    card_id: i64,
    levels: &[SkillLevel],
) -> Result<()> {
    sqlx::query("DELETE FROM skill_details WHERE card_id = ?")
        .bind(card_id)
        .execute(&mut *conn)
        .await?;

    for level in levels {
        sqlx::query(
            r#"
            INSERT INTO skill_details (card_id, skill_level, count, per, value, rate)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(card_id)
        .bind(level.level)
        .bind(level.count)
        .bind(level.per)
        .bind(level.value)
        .bind(level.rate)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Upsert the card's release information
pub async fn upsert_release_info(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO release_info (
            id, year, month, day, event, createtime, updatetime, listview
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            year = excluded.year,
            month = excluded.month,
            day = excluded.day,
            event = excluded.event,
            createtime = excluded.createtime,
            updatetime = excluded.updatetime,
            listview = excluded.listview
        "#,
    )
    .bind(record.key)
    .bind(record.int("year"))
    .bind(record.int("month"))
    .bind(record.int("day"))
    .bind(record.text("event"))
    .bind(record.text("createtime"))
    .bind(record.text("updatetime"))
    .bind(record.int("listview").unwrap_or(1))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Upsert the card's broach bonuses
pub async fn upsert_broach_info(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO broach_info (
            id, broach_shout, broach_beat, broach_melody, broach_req
        ) VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            broach_shout = excluded.broach_shout,
            broach_beat = excluded.broach_beat,
            broach_melody = excluded.broach_melody,
            broach_req = excluded.broach_req
        "#,
    )
    .bind(record.key)
    .bind(record.int("broach_shout"))
    .bind(record.int("broach_beat"))
    .bind(record.int("broach_melody"))
    .bind(record.int("broach_req"))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Upsert the community's per-level skill guesses
pub async fn upsert_skill_guess(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO skill_guess (
            id, ap_skill_1_guess, ap_skill_2_guess,
            ap_skill_3_guess, ap_skill_4_guess, ap_skill_5_guess
        ) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            ap_skill_1_guess = excluded.ap_skill_1_guess,
            ap_skill_2_guess = excluded.ap_skill_2_guess,
            ap_skill_3_guess = excluded.ap_skill_3_guess,
            ap_skill_4_guess = excluded.ap_skill_4_guess,
            ap_skill_5_guess = excluded.ap_skill_5_guess
        "#,
    )
    .bind(record.key)
    .bind(record.int("ap_skill_1_guess"))
    .bind(record.int("ap_skill_2_guess"))
    .bind(record.int("ap_skill_3_guess"))
    .bind(record.int("ap_skill_4_guess"))
    .bind(record.int("ap_skill_5_guess"))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Upsert one song row from the songs sheet, keyed by its sheet id
pub async fn upsert_song(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (
            song_id, category, artist_name, song_name,
            song_type, difficulty, star_rating,
            shout_percentage, beat_percentage, melody_percentage,
            notes_count, duration_seconds, update_date
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(song_id) DO UPDATE SET
            category = excluded.category,
            artist_name = excluded.artist_name,
            song_name = excluded.song_name,
            song_type = excluded.song_type,
            difficulty = excluded.difficulty,
            star_rating = excluded.star_rating,
            shout_percentage = excluded.shout_percentage,
            beat_percentage = excluded.beat_percentage,
            melody_percentage = excluded.melody_percentage,
            notes_count = excluded.notes_count,
            duration_seconds = excluded.duration_seconds,
            update_date = excluded.update_date
        "#,
    )
    .bind(record.key)
    .bind(record.text("category"))
    .bind(record.text("artist_name"))
    .bind(record.text("song_name"))
    .bind(record.text("song_type"))
    .bind(record.text("difficulty"))
    .bind(record.int("star_rating"))
    .bind(record.float("shout_percentage"))
    .bind(record.float("beat_percentage"))
    .bind(record.float("melody_percentage"))
    .bind(record.int("notes_count"))
    .bind(record.int("duration_seconds"))
    .bind(record.date("update_date").map(|d| d.to_string()))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Upsert one group-card row (sheet headers map onto relation columns here)
pub async fn upsert_group_card(conn: &mut SqliteConnection, record: &Record) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO group_cards (
            id, card_id, cardname, group_name, members,
            shout_value, beat_value, melody_value,
            attribute, idol_type, group_type,
            auto_score, song_score, score_limit, broach_type
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            card_id = excluded.card_id,
            cardname = excluded.cardname,
            group_name = excluded.group_name,
            members = excluded.members,
            shout_value = excluded.shout_value,
            beat_value = excluded.beat_value,
            melody_value = excluded.melody_value,
            attribute = excluded.attribute,
            idol_type = excluded.idol_type,
            group_type = excluded.group_type,
            auto_score = excluded.auto_score,
            song_score = excluded.song_score,
            score_limit = excluded.score_limit,
            broach_type = excluded.broach_type
        "#,
    )
    .bind(record.key)
    .bind(record.int("cardID"))
    .bind(record.text("cardname"))
    .bind(record.text("name"))
    .bind(record.text("name_other"))
    .bind(record.int("Shout"))
    .bind(record.int("Beat"))
    .bind(record.int("Melody"))
    .bind(record.int("属性"))
    .bind(record.text("アイドル"))
    .bind(record.text("グループ"))
    .bind(record.int("オート"))
    .bind(record.int("楽曲"))
    .bind(record.int("上限"))
    .bind(record.text("ブローチの種類"))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Song metadata gathered by a score-calculation scan
#[derive(Debug, Clone)]
pub struct ScoreCalcSong {
    pub song_name: String,
    pub song_type: Option<String>,
    pub song_category: Option<String>,
    pub artist_name: Option<String>,
    pub notes_count: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub shout_percentage: Option<f64>,
    pub beat_percentage: Option<f64>,
    pub melody_percentage: Option<f64>,
}

/// Score block gathered by a score-calculation scan
#[derive(Debug, Clone, Default)]
pub struct TeamScores {
    pub attribute_score: Option<i64>,
    pub scoreup_skill_score: Option<i64>,
    pub reduction_skill_score: Option<i64>,
    pub live_end_score: Option<i64>,
    pub final_result_score: Option<i64>,
}

/// Find a song by name and update it, or create it; returns the row id.
///
/// Score-calc sheets carry no song id, so the name is the reconciliation
/// key on this path. The row id is needed before the team composition
/// referencing it can be written, which is why the pipeline stays in
/// source order.
pub async fn lookup_or_create_song(
    conn: &mut SqliteConnection,
    song: &ScoreCalcSong,
) -> Result<i64> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM songs WHERE song_name = ?")
        .bind(&song.song_name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some((id,)) = existing {
        sqlx::query(
            r#"
            UPDATE songs SET
                song_type = ?, song_category = ?, artist_name = ?,
                notes_count = ?, duration_seconds = ?,
                shout_percentage = ?, beat_percentage = ?, melody_percentage = ?,
                update_date = date('now')
            WHERE id = ?
            "#,
        )
        .bind(&song.song_type)
        .bind(&song.song_category)
        .bind(&song.artist_name)
        .bind(song.notes_count)
        .bind(song.duration_seconds)
        .bind(song.shout_percentage)
        .bind(song.beat_percentage)
        .bind(song.melody_percentage)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        return Ok(id);
    }

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO songs (
            song_type, song_category, song_name, artist_name,
            notes_count, duration_seconds,
            shout_percentage, beat_percentage, melody_percentage,
            update_date
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, date('now'))
        RETURNING id
        "#,
    )
    .bind(&song.song_type)
    .bind(&song.song_category)
    .bind(&song.song_name)
    .bind(&song.artist_name)
    .bind(song.notes_count)
    .bind(song.duration_seconds)
    .bind(song.shout_percentage)
    .bind(song.beat_percentage)
    .bind(song.melody_percentage)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Upsert the team composition scored against a song; returns the row id
pub async fn upsert_team_composition(
    conn: &mut SqliteConnection,
    song_row_id: i64,
    roster: &[i64],
    scores: &TeamScores,
) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO team_compositions (
            song_id, position1_card_id, position2_card_id,
            position3_card_id, position4_card_id, position5_card_id,
            position6_card_id, attribute_score, scoreup_skill_score,
            reduction_skill_score, live_end_score, final_result_score
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(song_id) DO UPDATE SET
            position1_card_id = excluded.position1_card_id,
            position2_card_id = excluded.position2_card_id,
            position3_card_id = excluded.position3_card_id,
            position4_card_id = excluded.position4_card_id,
            position5_card_id = excluded.position5_card_id,
            position6_card_id = excluded.position6_card_id,
            attribute_score = excluded.attribute_score,
            scoreup_skill_score = excluded.scoreup_skill_score,
            reduction_skill_score = excluded.reduction_skill_score,
            live_end_score = excluded.live_end_score,
            final_result_score = excluded.final_result_score
        RETURNING id
        "#,
    )
    .bind(song_row_id)
    .bind(roster.first().copied())
    .bind(roster.get(1).copied())
    .bind(roster.get(2).copied())
    .bind(roster.get(3).copied())
    .bind(roster.get(4).copied())
    .bind(roster.get(5).copied())
    .bind(scores.attribute_score)
    .bind(scores.scoreup_skill_score)
    .bind(scores.reduction_skill_score)
    .bind(scores.live_end_score)
    .bind(scores.final_result_score)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}
