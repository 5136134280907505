use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    database::db_structs::{RankingSnapshot, User},
    error::RankingError,
    model::structures::ranked_item::RankedItem
};

pub mod db;
pub mod db_structs;

/// The data-store collaborator of a ranking run.
pub trait RankingStore {
    /// Every user with their top list (ordered by position) and ratings
    async fn list_users(&self) -> Result<Vec<User>, RankingError>;

    /// item id -> rank for every item currently carrying a rank
    async fn current_ranks(&self) -> Result<HashMap<i32, i32>, RankingError>;

    /// Writes the per-item valid duel counts. Does not touch `updated_at`.
    /// Items missing from `valid_duels` are reset to zero.
    async fn update_valid_duels(&self, valid_duels: &[(i32, u32)]) -> Result<(), RankingError>;

    /// Applies a committed run atomically:
    /// 1. Writes score, rank, previous rank and `updated_at = snapshot.computed_at`
    ///     for every ranked item, `batch_size` items per round trip.
    /// 2. Clears score, rank and previous rank of every item still ranked but last
    ///     updated before `stale_before`.
    /// 3. Inserts the snapshot.
    ///
    /// Returns the number of items cleared in step 2. Nothing is applied on error.
    async fn save_rankings(
        &self,
        rankings: &[RankedItem],
        snapshot: &RankingSnapshot,
        stale_before: DateTime<Utc>,
        batch_size: usize
    ) -> Result<u64, RankingError>;
}
