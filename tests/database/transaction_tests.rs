use chrono::{Duration, Utc};
use coaster_ranker::{
    database::{db::DbClient, db_structs::RankingSnapshot, RankingStore},
    model::structures::ranked_item::RankedItem
};
use serial_test::serial;

use super::test_helpers::{TestDatabase, STALE_ITEM_ID};
use crate::common::init_test_env;

// These tests start a PostgreSQL container: cargo test -- --ignored

fn snapshot() -> RankingSnapshot {
    RankingSnapshot {
        rating_count: 5,
        top_list_count: 3,
        user_count: 4,
        items_in_lists_count: 12,
        qualifying_comparison_count: 12,
        ranked_item_count: 2,
        computed_at: Utc::now()
    }
}

fn rankings() -> Vec<RankedItem> {
    vec![
        RankedItem {
            item_id: 1,
            score: 100.0,
            rank: 1,
            previous_rank: None
        },
        RankedItem {
            item_id: 2,
            score: 50.0,
            rank: 2,
            previous_rank: None
        },
    ]
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_failed_snapshot_rolls_back_rankings() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    // Make the final step of the transaction fail
    let check_client = test_db.get_client().await.expect("Failed to get client");
    check_client
        .batch_execute("DROP TABLE ranking_snapshots")
        .await
        .expect("Failed to drop table");

    let snapshot = snapshot();
    let result = client
        .save_rankings(&rankings(), &snapshot, snapshot.computed_at - Duration::hours(4), 20)
        .await;

    assert!(result.is_err());

    // Neither the ranked items nor the stale clear may have been applied
    let ranked: i64 = check_client
        .query_one("SELECT COUNT(*) FROM items WHERE id IN (1, 2) AND rank IS NOT NULL", &[])
        .await
        .expect("Failed to query")
        .get(0);
    assert_eq!(ranked, 0);

    let stale_rank: Option<i32> = check_client
        .query_one("SELECT rank FROM items WHERE id = $1", &[&STALE_ITEM_ID])
        .await
        .expect("Failed to query")
        .get(0);
    assert_eq!(stale_rank, Some(1));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_client_usable_after_rollback() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let client = DbClient::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    let check_client = test_db.get_client().await.expect("Failed to get client");
    check_client
        .batch_execute("DROP TABLE ranking_snapshots")
        .await
        .expect("Failed to drop table");

    let snapshot = snapshot();
    let result = client
        .save_rankings(&rankings(), &snapshot, snapshot.computed_at - Duration::hours(4), 1)
        .await;
    assert!(result.is_err());

    // An aborted transaction left open would reject every further query
    let users = client.list_users().await.expect("Client should still be usable");
    assert_eq!(users.len(), 4);
}
