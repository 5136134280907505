use std::collections::HashMap;

use indexmap::IndexMap;

use crate::model::structures::{item_score::ItemScore, ranked_item::RankedItem};

pub struct Leaderboard {
    // Ordered by rank once `sort` has run
    leaderboard: IndexMap<i32, RankedItem>
}

impl Leaderboard {
    /// Builds the leaderboard from the eligible scores only.
    ///
    /// `previous_ranks` holds the rank each item carried before this run and is
    /// copied into `previous_rank` for every item placed on the board.
    pub fn new(scores: &[ItemScore], previous_ranks: &HashMap<i32, i32>) -> Leaderboard {
        let mut leaderboard = IndexMap::new();

        for score in scores.iter().filter(|s| s.eligible) {
            let Some(raw_score) = score.raw_score else {
                continue;
            };

            leaderboard.insert(
                score.item_id,
                RankedItem {
                    item_id: score.item_id,
                    score: raw_score,
                    rank: 0,
                    previous_rank: previous_ranks.get(&score.item_id).copied()
                }
            );
        }

        let mut board = Leaderboard { leaderboard };
        board.sort();

        board
    }

    /// Sorts by score descending, then item id ascending, and assigns ranks 1..N.
    fn sort(&mut self) {
        self.leaderboard
            .sort_by(|k1, v1, k2, v2| v2.score.total_cmp(&v1.score).then_with(|| k1.cmp(k2)));

        for (rank, item) in self.leaderboard.values_mut().enumerate() {
            item.rank = rank as i32 + 1;
        }
    }

    pub fn get(&self, item_id: i32) -> Option<&RankedItem> {
        self.leaderboard.get(&item_id)
    }

    pub fn len(&self) -> usize {
        self.leaderboard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaderboard.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedItem> {
        self.leaderboard.values()
    }

    /// Ranked items in rank order
    pub fn into_ranked_items(self) -> Vec<RankedItem> {
        self.leaderboard.into_values().collect()
    }
}
