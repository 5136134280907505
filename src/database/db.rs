use super::{
    db_structs::{RankingSnapshot, TopListEntry, User},
    RankingStore
};
use crate::{error::RankingError, model::structures::ranked_item::RankedItem, utils::progress_utils::progress_bar};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use postgres_types::ToSql;
use std::{collections::HashMap, sync::Arc};
use tokio_postgres::{Client, Error, NoTls};
use tracing::{error, info, warn};

/// Key of the session advisory lock held for the duration of a run
pub const RUN_LOCK_KEY: i64 = 0x636f_6173_7465_72;

#[derive(Clone)]
pub struct DbClient {
    client: Arc<Client>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(DbClient {
            client: Arc::new(client)
        })
    }

    /// Tries to take the run lock. Returns false if another session holds it.
    pub async fn try_lock_run(&self) -> Result<bool, Error> {
        let row = self
            .client
            .query_one("SELECT pg_try_advisory_lock($1)", &[&RUN_LOCK_KEY])
            .await?;

        Ok(row.get(0))
    }

    pub async fn unlock_run(&self) -> Result<(), Error> {
        self.client
            .execute("SELECT pg_advisory_unlock($1)", &[&RUN_LOCK_KEY])
            .await?;

        Ok(())
    }

    async fn fetch_users(&self) -> Result<Vec<User>, Error> {
        info!("Fetching users...");
        let mut users: HashMap<i32, User> = HashMap::new();

        for row in self.client.query("SELECT id FROM users", &[]).await? {
            let id = row.get::<_, i32>("id");
            users.insert(
                id,
                User {
                    id,
                    ..User::default()
                }
            );
        }

        info!("Fetching top lists...");
        let rows = self
            .client
            .query(
                "SELECT tl.user_id AS user_id, e.item_id AS item_id, e.position AS position \
                FROM top_lists tl \
                JOIN top_list_entries e ON e.top_list_id = tl.id \
                ORDER BY tl.user_id, e.position",
                &[]
            )
            .await?;

        for row in rows {
            let user_id = row.get::<_, i32>("user_id");
            users
                .entry(user_id)
                .or_insert_with(|| User {
                    id: user_id,
                    ..User::default()
                })
                .top_list
                .push(TopListEntry {
                    item_id: row.get("item_id"),
                    position: row.get("position")
                });
        }

        info!("Fetching ratings...");
        let rows = self
            .client
            .query("SELECT user_id, item_id, value FROM ratings", &[])
            .await?;

        for row in rows {
            let user_id = row.get::<_, i32>("user_id");
            users
                .entry(user_id)
                .or_insert_with(|| User {
                    id: user_id,
                    ..User::default()
                })
                .ratings
                .insert(row.get("item_id"), row.get("value"));
        }

        let users = users.into_values().sorted_by_key(|u| u.id).collect_vec();
        info!("Fetched {} users", users.len());

        Ok(users)
    }

    async fn fetch_current_ranks(&self) -> Result<HashMap<i32, i32>, Error> {
        let rows = self
            .client
            .query("SELECT id, rank FROM items WHERE rank IS NOT NULL", &[])
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<_, i32>("id"), row.get::<_, i32>("rank")))
            .collect())
    }

    async fn write_valid_duels(&self, valid_duels: &[(i32, u32)]) -> Result<(), Error> {
        let ids = valid_duels.iter().map(|(id, _)| *id).collect_vec();
        let counts = valid_duels.iter().map(|(_, count)| *count as i32).collect_vec();

        self.client
            .execute(
                "UPDATE items SET valid_duels = 0 WHERE valid_duels <> 0 AND NOT (id = ANY($1))",
                &[&ids]
            )
            .await?;

        self.client
            .execute(
                "UPDATE items AS i SET valid_duels = v.valid_duels \
                FROM UNNEST($1::int4[], $2::int4[]) AS v(id, valid_duels) \
                WHERE i.id = v.id",
                &[&ids, &counts]
            )
            .await?;

        Ok(())
    }

    /// Runs inside the transaction opened by `save_rankings`
    async fn write_rankings(
        &self,
        rankings: &[RankedItem],
        snapshot: &RankingSnapshot,
        stale_before: DateTime<Utc>,
        batch_size: usize
    ) -> Result<u64, Error> {
        let p_bar = progress_bar(rankings.len() as u64, "Saving item rankings to db".to_string());

        for batch in rankings.chunks(batch_size.max(1)) {
            let ids = batch.iter().map(|r| r.item_id).collect_vec();
            let scores = batch.iter().map(|r| r.score).collect_vec();
            let ranks = batch.iter().map(|r| r.rank).collect_vec();
            let previous_ranks = batch.iter().map(|r| r.previous_rank).collect_vec();

            let values: &[&(dyn ToSql + Sync)] = &[&ids, &scores, &ranks, &previous_ranks, &snapshot.computed_at];
            self.client
                .execute(
                    "UPDATE items AS i \
                    SET score = v.score, rank = v.rank, previous_rank = v.previous_rank, updated_at = $5 \
                    FROM UNNEST($1::int4[], $2::float8[], $3::int4[], $4::int4[]) \
                        AS v(id, score, rank, previous_rank) \
                    WHERE i.id = v.id",
                    values
                )
                .await?;

            p_bar.inc(batch.len() as u64);
        }

        p_bar.finish_and_clear();

        let cleared = self
            .client
            .execute(
                "UPDATE items SET score = NULL, rank = NULL, previous_rank = NULL \
                WHERE rank IS NOT NULL AND updated_at < $1",
                &[&stale_before]
            )
            .await?;

        info!("Cleared {} stale rankings", cleared);

        let values: &[&(dyn ToSql + Sync)] = &[
            &snapshot.rating_count,
            &snapshot.top_list_count,
            &snapshot.user_count,
            &snapshot.items_in_lists_count,
            &snapshot.qualifying_comparison_count,
            &snapshot.ranked_item_count,
            &snapshot.computed_at
        ];
        self.client
            .execute(
                "INSERT INTO ranking_snapshots (rating_count, top_list_count, user_count, \
                items_in_lists_count, qualifying_comparison_count, ranked_item_count, computed_at) \
                VALUES ($1, $2, $3, $4, $5, $6, $7)",
                values
            )
            .await?;

        info!("Ranking snapshot saved");

        Ok(cleared)
    }
}

impl RankingStore for DbClient {
    async fn list_users(&self) -> Result<Vec<User>, RankingError> {
        Ok(self.fetch_users().await?)
    }

    async fn current_ranks(&self) -> Result<HashMap<i32, i32>, RankingError> {
        Ok(self.fetch_current_ranks().await?)
    }

    async fn update_valid_duels(&self, valid_duels: &[(i32, u32)]) -> Result<(), RankingError> {
        Ok(self.write_valid_duels(valid_duels).await?)
    }

    async fn save_rankings(
        &self,
        rankings: &[RankedItem],
        snapshot: &RankingSnapshot,
        stale_before: DateTime<Utc>,
        batch_size: usize
    ) -> Result<u64, RankingError> {
        self.client.batch_execute("BEGIN").await?;

        match self.write_rankings(rankings, snapshot, stale_before, batch_size).await {
            Ok(cleared) => {
                self.client.batch_execute("COMMIT").await?;
                Ok(cleared)
            }
            Err(e) => {
                error!("Failed to save rankings, rolling back: {}", e);
                if let Err(rollback_error) = self.client.batch_execute("ROLLBACK").await {
                    warn!("Rollback failed: {}", rollback_error);
                }

                Err(e.into())
            }
        }
    }
}
