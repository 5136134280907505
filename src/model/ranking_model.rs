use std::collections::HashMap;

use itertools::Itertools;
use tracing::info;

use crate::{
    database::db_structs::User,
    error::RankingError,
    model::{
        constants::RankingConstants,
        duel_matrix::{build_duel_matrix, ComparisonTally},
        pruning::prune,
        ranker::Leaderboard,
        scoring::{compute_scores, duel_counts, qualifying_comparison_count},
        structures::{item_result::ItemResult, ranked_item::RankedItem}
    },
    utils::cancellation::CancellationToken
};

#[derive(Debug, Clone, PartialEq)]
pub struct RankingOutcome {
    /// One entry per item seen in any comparison, ascending by item id
    pub items: Vec<ItemResult>,
    /// Ranked items in rank order
    pub leaderboard: Vec<RankedItem>,
    /// Items stripped out by the pruner, ascending
    pub pruned: Vec<i32>,
    pub prune_iterations: u32,
    pub prune_converged: bool,
    pub qualifying_comparison_count: u64,
    pub comparisons: ComparisonTally
}

pub struct RankingModel {
    pub constants: RankingConstants
}

impl RankingModel {
    pub fn new(constants: RankingConstants) -> RankingModel {
        RankingModel { constants }
    }

    /// # Ranking pipeline
    ///
    /// Steps:
    /// 1. Turn every user's top list and ratings into pairwise wins.
    /// 2. Record each item's duel count on the full matrix. This is the item's
    ///     `valid_duels`, kept whether or not it ends up ranked.
    /// 3. Prune items below the duel minimum until stable.
    /// 4. Score the pruned matrix and apply the elite filter.
    /// 5. Rank the eligible items.
    pub fn process(
        &self,
        users: &[User],
        previous_ranks: &HashMap<i32, i32>,
        cancel: &CancellationToken
    ) -> Result<RankingOutcome, RankingError> {
        let (matrix, comparisons) = build_duel_matrix(users, cancel)?;
        let valid_duels = duel_counts(&matrix, &self.constants);

        let pruned = prune(matrix, &self.constants, cancel)?;
        let scores = compute_scores(&pruned.matrix, &self.constants);
        let leaderboard = Leaderboard::new(&scores, previous_ranks);

        info!(
            scored = scores.len(),
            ranked = leaderboard.len(),
            pruned = pruned.removed.len(),
            "Scoring complete"
        );

        let items = valid_duels
            .iter()
            .sorted_by_key(|(item_id, _)| **item_id)
            .map(|(item_id, valid_duels)| {
                let ranked = leaderboard.get(*item_id);
                ItemResult {
                    item_id: *item_id,
                    score: ranked.map(|r| r.score),
                    rank: ranked.map(|r| r.rank),
                    previous_rank: previous_ranks.get(item_id).copied(),
                    valid_duels: *valid_duels
                }
            })
            .collect_vec();

        Ok(RankingOutcome {
            items,
            leaderboard: leaderboard.into_ranked_items(),
            pruned: pruned.removed,
            prune_iterations: pruned.iterations,
            prune_converged: pruned.converged,
            qualifying_comparison_count: qualifying_comparison_count(&scores),
            comparisons
        })
    }
}
