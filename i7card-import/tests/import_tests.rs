//! End-to-end import tests against an in-memory database

use i7card_common::catalog::TargetRelation;
use i7card_common::db::init_tables;
use i7card_import::{Importer, PercentPolicy};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

async fn test_pool() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();
    pool
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
        .get("n")
}

fn score_calc_csv(song_name: &str) -> String {
    let mut lines = vec![
        format!(",曲名,,{song_name}"),
        ",アーティスト名,,IDOLiSH7".to_string(),
        ",ノーツ数,,742".to_string(),
        ",秒数,,128".to_string(),
        ",最終リザルト,,3254100".to_string(),
        ",,,,,,,Shout,,Beat,,Melody".to_string(),
        ",,,,,,,,33%,,33%,,34%".to_string(),
    ];
    lines.push(format!("{}ID", ",".repeat(33)));
    lines.push(format!("{}1001,1002,1003,1004,1005,1006", ",".repeat(34)));
    lines.join("\n") + "\n"
}

#[tokio::test]
async fn card_rows_fan_out_and_missing_key_is_skipped() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let csv = "ID,cardname,attribute\n101,Alpha,3\n,Beta,2\n103,Gamma,\n";
    let summary = importer.import_cards_csv(csv).await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.committed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errored, 0);

    assert_eq!(count(&pool, "cards").await, 2);
    assert_eq!(count(&pool, "card_stats").await, 2);

    let attr_101: Option<i64> = sqlx::query("SELECT attribute FROM card_stats WHERE id = 101")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("attribute");
    assert_eq!(attr_101, Some(3));

    let attr_103: Option<i64> = sqlx::query("SELECT attribute FROM card_stats WHERE id = 103")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("attribute");
    assert_eq!(attr_103, None);

    // listview defaults to visible when the column is missing
    let listview: i64 = sqlx::query("SELECT listview FROM release_info WHERE id = 101")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("listview");
    assert_eq!(listview, 1);
}

#[tokio::test]
async fn reimport_reconciles_instead_of_duplicating() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let csv = "ID,cardname,attribute,ap_skill_1_count\n101,Alpha,3,4\n102,Beta,1,\n";
    importer.import_cards_csv(csv).await.unwrap();

    let mut before = Vec::new();
    for relation in TargetRelation::ALL {
        before.push(count(&pool, relation.table_name()).await);
    }

    let summary = importer.import_cards_csv(csv).await.unwrap();
    assert_eq!(summary.committed, 2);

    for (i, relation) in TargetRelation::ALL.into_iter().enumerate() {
        let after = count(&pool, relation.table_name()).await;
        assert_eq!(after, before[i], "{relation} row count changed on re-import");
    }
}

#[tokio::test]
async fn reimport_overwrites_changed_fields() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    importer
        .import_cards_csv("ID,cardname\n101,Old Name\n")
        .await
        .unwrap();
    importer
        .import_cards_csv("ID,cardname\n101,New Name\n")
        .await
        .unwrap();

    let name: String = sqlx::query("SELECT cardname FROM cards WHERE id = 101")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("cardname");
    assert_eq!(name, "New Name");
    assert_eq!(count(&pool, "cards").await, 1);
}

#[tokio::test]
async fn skill_details_are_replaced_wholesale() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    importer
        .import_cards_csv("ID,ap_skill_1_count,ap_skill_3_count\n101,4,6\n")
        .await
        .unwrap();
    let levels: Vec<i64> =
        sqlx::query("SELECT skill_level FROM skill_details WHERE card_id = 101 ORDER BY skill_level")
            .fetch_all(&pool)
            .await
            .unwrap()
            .iter()
            .map(|r| r.get("skill_level"))
            .collect();
    assert_eq!(levels, vec![1, 3]);

    // The present set can shrink; stale levels must not survive
    importer
        .import_cards_csv("ID,ap_skill_2_count\n101,5\n")
        .await
        .unwrap();
    let levels: Vec<i64> =
        sqlx::query("SELECT skill_level FROM skill_details WHERE card_id = 101 ORDER BY skill_level")
            .fetch_all(&pool)
            .await
            .unwrap()
            .iter()
            .map(|r| r.get("skill_level"))
            .collect();
    assert_eq!(levels, vec![2]);
}

#[tokio::test]
async fn failed_record_rolls_back_alone() {
    let pool = test_pool().await;

    // Force a mid-record write failure for one card: the release_info
    // insert happens after cards/stats/skills in the same unit, so the
    // earlier writes of that record must be rolled back with it.
    sqlx::query(
        r#"
        CREATE TRIGGER reject_one BEFORE INSERT ON release_info
        WHEN NEW.id = 150
        BEGIN
            SELECT RAISE(ABORT, 'injected failure');
        END
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let mut csv = String::from("ID,cardname\n");
    for id in 100..200 {
        csv.push_str(&format!("{id},Card {id}\n"));
    }

    let importer = Importer::new(pool.clone());
    let summary = importer.import_cards_csv(&csv).await.unwrap();

    assert_eq!(summary.total, 100);
    assert_eq!(summary.committed, 99);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].key, Some(150));

    assert_eq!(count(&pool, "cards").await, 99);
    let rejected = sqlx::query("SELECT id FROM cards WHERE id = 150")
        .fetch_optional(&pool)
        .await
        .unwrap();
    assert!(rejected.is_none(), "failed record left a partial row");
}

#[tokio::test]
async fn songs_sheet_imports_and_reconciles() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let csv = ",,,,,,,,,,,\n\
               ID,category,artist,song,type,diff,stars,s,b,m,notes,sec\n\
               7,MEZZO\",MEZZO\",Dear Butterfly,通常,EXPERT,★★★★,33,33,34,512,118\n\
               注釈,,,,,,,,,,,\n\
               8,IDOLiSH7,IDOLiSH7,RESTART POiNTER,通常,EXPERT,★★★★★,33,33,34,742,128\n";

    let summary = importer
        .import_songs_csv(csv, PercentPolicy::WholeNumber)
        .await
        .unwrap();
    assert_eq!(summary.committed, 2);
    assert_eq!(count(&pool, "songs").await, 2);

    let summary = importer
        .import_songs_csv(csv, PercentPolicy::WholeNumber)
        .await
        .unwrap();
    assert_eq!(summary.committed, 2);
    assert_eq!(count(&pool, "songs").await, 2);

    let shout: Option<f64> = sqlx::query("SELECT shout_percentage FROM songs WHERE song_id = 7")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("shout_percentage");
    assert_eq!(shout, Some(33.0));
}

#[tokio::test]
async fn fraction_percentages_are_normalized_to_whole_numbers() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let csv = "ID,category,artist,song,type,diff,stars,s,b,m,notes,sec\n\
               7,c,a,Song,t,d,★,0.33,0.33,0.34,512,118\n";
    importer
        .import_songs_csv(csv, PercentPolicy::Fraction)
        .await
        .unwrap();

    let shout: Option<f64> = sqlx::query("SELECT shout_percentage FROM songs WHERE song_id = 7")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("shout_percentage");
    assert_eq!(shout, Some(33.0));
}

#[tokio::test]
async fn group_cards_import_is_idempotent() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let csv = "ID,cardID,cardname,name,Shout,Beat,Melody,属性\n\
               9001,9001,Group Card,TRIGGER,120,130,140,3\n";
    importer.import_group_cards_csv(csv).await.unwrap();
    importer.import_group_cards_csv(csv).await.unwrap();

    assert_eq!(count(&pool, "group_cards").await, 1);
    let attribute: Option<i64> = sqlx::query("SELECT attribute FROM group_cards WHERE id = 9001")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("attribute");
    assert_eq!(attribute, Some(3));
}

#[tokio::test]
async fn score_calc_creates_song_and_team() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let csv = score_calc_csv("NATSU☆しようぜ!");
    let summary = importer
        .import_score_calc_csv(&csv, PercentPolicy::WholeNumber)
        .await
        .unwrap();

    assert_eq!(summary.committed, 1);
    let song_row_id = summary.song_row_id.unwrap();
    assert!(summary.team_row_id.is_some());

    assert_eq!(count(&pool, "songs").await, 1);
    assert_eq!(count(&pool, "team_compositions").await, 1);

    let row = sqlx::query(
        "SELECT song_id, position1_card_id, position6_card_id, final_result_score \
         FROM team_compositions",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let song_id: i64 = row.get("song_id");
    let pos1: Option<i64> = row.get("position1_card_id");
    let pos6: Option<i64> = row.get("position6_card_id");
    let final_score: Option<i64> = row.get("final_result_score");
    assert_eq!(song_id, song_row_id);
    assert_eq!(pos1, Some(1001));
    assert_eq!(pos6, Some(1006));
    assert_eq!(final_score, Some(3_254_100));

    // Re-running reconciles onto the same song and team rows
    let again = importer
        .import_score_calc_csv(&csv, PercentPolicy::WholeNumber)
        .await
        .unwrap();
    assert_eq!(again.song_row_id, Some(song_row_id));
    assert_eq!(count(&pool, "songs").await, 1);
    assert_eq!(count(&pool, "team_compositions").await, 1);
}

#[tokio::test]
async fn score_calc_reuses_song_imported_from_songs_sheet() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let songs_csv = "ID,category,artist,song,type,diff,stars,s,b,m,notes,sec\n\
                     7,c,a,Dear Butterfly,t,d,★,33,33,34,512,118\n";
    importer
        .import_songs_csv(songs_csv, PercentPolicy::WholeNumber)
        .await
        .unwrap();

    let csv = score_calc_csv("Dear Butterfly");
    let summary = importer
        .import_score_calc_csv(&csv, PercentPolicy::WholeNumber)
        .await
        .unwrap();

    // Reconciled by name: no second song row
    assert_eq!(count(&pool, "songs").await, 1);
    let existing: i64 = sqlx::query("SELECT id FROM songs WHERE song_name = 'Dear Butterfly'")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("id");
    assert_eq!(summary.song_row_id, Some(existing));
}

#[tokio::test]
async fn score_calc_without_song_name_persists_nothing() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let csv = ",ノーツ数,,742\n,秒数,,128\n";
    let summary = importer
        .import_score_calc_csv(csv, PercentPolicy::WholeNumber)
        .await
        .unwrap();

    assert_eq!(summary.committed, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(count(&pool, "songs").await, 0);
    assert_eq!(count(&pool, "team_compositions").await, 0);
}

#[tokio::test]
async fn score_calc_without_roster_creates_song_only() {
    let pool = test_pool().await;
    let importer = Importer::new(pool.clone());

    let csv = ",曲名,,Solo Song\n,ノーツ数,,500\n";
    let summary = importer
        .import_score_calc_csv(csv, PercentPolicy::WholeNumber)
        .await
        .unwrap();

    assert_eq!(summary.committed, 1);
    assert!(summary.song_row_id.is_some());
    assert_eq!(summary.team_row_id, None);
    assert_eq!(count(&pool, "songs").await, 1);
    assert_eq!(count(&pool, "team_compositions").await, 0);
}
