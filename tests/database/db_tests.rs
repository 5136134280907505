use approx::assert_abs_diff_eq;
use chrono::{Duration, Utc};
use coaster_ranker::{
    database::{
        db::DbClient,
        db_structs::{RankingSnapshot, TopListEntry},
        RankingStore
    },
    messaging::RabbitMqPublisher,
    model::{
        constants::{default_constants, RankingConstants},
        structures::ranked_item::RankedItem
    },
    runner::{run_ranking, RunOptions},
    utils::cancellation::CancellationToken
};
use serial_test::serial;

use super::test_helpers::{TestDatabase, STALE_ITEM_ID};
use crate::common::init_test_env;

// These tests start a PostgreSQL container: cargo test -- --ignored

async fn seeded() -> (TestDatabase, DbClient) {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let db_client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    (test_db, db_client)
}

fn test_constants() -> RankingConstants {
    RankingConstants {
        min_duels: 2,
        min_duels_elite: 3,
        persist_batch_size: 3,
        ..default_constants()
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_list_users() {
    let (_test_db, db_client) = seeded().await;

    let users = db_client.list_users().await.expect("Failed to list users");

    assert_eq!(users.len(), 4);
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);

    assert_eq!(users[0].top_list.len(), 4);
    assert_eq!(users[0].top_list[0], TopListEntry { item_id: 1, position: 1 });
    assert_eq!(users[0].top_list[3], TopListEntry { item_id: 4, position: 4 });
    assert!(users[0].ratings.is_empty());

    assert!(users[3].top_list.is_empty());
    assert_eq!(users[3].ratings.len(), 5);
    assert_abs_diff_eq!(users[3].ratings[&1], 5.0);
    assert_abs_diff_eq!(users[3].ratings[&5], 1.0);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_current_ranks() {
    let (_test_db, db_client) = seeded().await;

    let ranks = db_client.current_ranks().await.expect("Failed to fetch ranks");

    assert_eq!(ranks.len(), 1);
    assert_eq!(ranks[&STALE_ITEM_ID], 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_save_rankings() {
    let (test_db, db_client) = seeded().await;

    let rankings = vec![
        RankedItem {
            item_id: 2,
            score: 75.0,
            rank: 1,
            previous_rank: None
        },
        RankedItem {
            item_id: 1,
            score: 50.0,
            rank: 2,
            previous_rank: Some(3)
        },
    ];
    let now = Utc::now();
    let snapshot = RankingSnapshot {
        rating_count: 5,
        top_list_count: 3,
        user_count: 4,
        items_in_lists_count: 12,
        qualifying_comparison_count: 8,
        ranked_item_count: 2,
        computed_at: now
    };

    let cleared = db_client
        .save_rankings(&rankings, &snapshot, now - Duration::hours(4), 1)
        .await
        .expect("Failed to save rankings");

    assert_eq!(cleared, 1);

    let check_client = test_db.get_client().await.expect("Failed to get client");
    let row = check_client
        .query_one("SELECT score, rank, previous_rank FROM items WHERE id = 1", &[])
        .await
        .expect("Failed to query");
    assert_abs_diff_eq!(row.get::<_, f64>(0), 50.0);
    assert_eq!(row.get::<_, Option<i32>>(1), Some(2));
    assert_eq!(row.get::<_, Option<i32>>(2), Some(3));

    let row = check_client
        .query_one("SELECT score, rank, previous_rank FROM items WHERE id = $1", &[&STALE_ITEM_ID])
        .await
        .expect("Failed to query");
    assert_eq!(row.get::<_, Option<f64>>(0), None);
    assert_eq!(row.get::<_, Option<i32>>(1), None);
    assert_eq!(row.get::<_, Option<i32>>(2), None);

    let snapshot_count: i64 = check_client
        .query_one("SELECT COUNT(*) FROM ranking_snapshots", &[])
        .await
        .expect("Failed to query")
        .get(0);
    assert_eq!(snapshot_count, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_update_valid_duels_keeps_updated_at() {
    let (test_db, db_client) = seeded().await;

    db_client
        .update_valid_duels(&[(1, 3), (2, 3)])
        .await
        .expect("Failed to update valid duels");

    let check_client = test_db.get_client().await.expect("Failed to get client");
    let rows = check_client
        .query("SELECT id, valid_duels FROM items ORDER BY id", &[])
        .await
        .expect("Failed to query");
    let counts = rows
        .iter()
        .map(|row| (row.get::<_, i32>(0), row.get::<_, i32>(1)))
        .collect::<Vec<_>>();
    assert_eq!(counts, vec![(1, 3), (2, 3), (3, 0), (4, 0), (5, 0), (6, 0)]);

    // Only ranked writes refresh an item, so the stale item stays stale
    let stale_year: f64 = check_client
        .query_one(
            "SELECT EXTRACT(YEAR FROM updated_at)::float8 FROM items WHERE id = $1",
            &[&STALE_ITEM_ID]
        )
        .await
        .expect("Failed to query")
        .get(0);
    assert_abs_diff_eq!(stale_year, 2024.0);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_run_lock_is_exclusive() {
    let (test_db, first) = seeded().await;
    let second = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    assert!(first.try_lock_run().await.expect("Failed to lock"));
    assert!(!second.try_lock_run().await.expect("Failed to lock"));

    first.unlock_run().await.expect("Failed to unlock");
    assert!(second.try_lock_run().await.expect("Failed to lock"));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_full_run() {
    let (test_db, db_client) = seeded().await;
    let options = RunOptions {
        dry_run: false,
        constants: test_constants()
    };

    let report = run_ranking(
        &db_client,
        None::<&RabbitMqPublisher>,
        &options,
        &CancellationToken::new()
    )
    .await
    .expect("Ranking run failed");

    assert_eq!(report.outcome.pruned, vec![5]);
    assert_eq!(report.stale_cleared, 1);

    let snapshot = report.snapshot.expect("Expected a snapshot");
    assert_eq!(snapshot.rating_count, 5);
    assert_eq!(snapshot.top_list_count, 3);
    assert_eq!(snapshot.user_count, 4);
    assert_eq!(snapshot.items_in_lists_count, 12);
    assert_eq!(snapshot.qualifying_comparison_count, 12);
    assert_eq!(snapshot.ranked_item_count, 4);

    let check_client = test_db.get_client().await.expect("Failed to get client");
    let rows = check_client
        .query("SELECT id, rank, valid_duels FROM items ORDER BY id", &[])
        .await
        .expect("Failed to query");
    let items = rows
        .iter()
        .map(|row| (row.get::<_, i32>(0), row.get::<_, Option<i32>>(1), row.get::<_, i32>(2)))
        .collect::<Vec<_>>();

    assert_eq!(
        items,
        vec![
            (1, Some(1), 3),
            (2, Some(2), 3),
            (3, Some(3), 3),
            (4, Some(4), 3),
            (5, None, 0),
            (6, None, 0),
        ]
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_dry_run_leaves_database_untouched() {
    let (test_db, db_client) = seeded().await;
    let options = RunOptions {
        dry_run: true,
        constants: test_constants()
    };

    let report = run_ranking(
        &db_client,
        None::<&RabbitMqPublisher>,
        &options,
        &CancellationToken::new()
    )
    .await
    .expect("Ranking run failed");

    assert_eq!(report.outcome.leaderboard.len(), 4);
    assert_eq!(report.outcome.leaderboard[0].previous_rank, None);

    let check_client = test_db.get_client().await.expect("Failed to get client");
    let ranked: i64 = check_client
        .query_one("SELECT COUNT(*) FROM items WHERE rank IS NOT NULL", &[])
        .await
        .expect("Failed to query")
        .get(0);
    let snapshots: i64 = check_client
        .query_one("SELECT COUNT(*) FROM ranking_snapshots", &[])
        .await
        .expect("Failed to query")
        .get(0);

    assert_eq!(ranked, 1);
    assert_eq!(snapshots, 0);
}
