use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopListEntry {
    pub item_id: i32,
    /// 1 is the most preferred item
    pub position: i32
}

#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: i32,
    /// Ordered by position when loaded from the database
    pub top_list: Vec<TopListEntry>,
    /// item id -> rating value
    pub ratings: HashMap<i32, f64>
}

impl User {
    pub fn has_top_list(&self) -> bool {
        !self.top_list.is_empty()
    }
}

/// Aggregate record written once per committing run. Never updated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingSnapshot {
    pub rating_count: i64,
    pub top_list_count: i64,
    pub user_count: i64,
    pub items_in_lists_count: i64,
    pub qualifying_comparison_count: i64,
    pub ranked_item_count: i64,
    pub computed_at: DateTime<Utc>
}

impl RankingSnapshot {
    pub fn new(
        users: &[User],
        qualifying_comparison_count: u64,
        ranked_item_count: usize,
        computed_at: DateTime<Utc>
    ) -> RankingSnapshot {
        RankingSnapshot {
            rating_count: users.iter().map(|u| u.ratings.len() as i64).sum(),
            top_list_count: users.iter().filter(|u| u.has_top_list()).count() as i64,
            user_count: users.len() as i64,
            items_in_lists_count: users.iter().map(|u| u.top_list.len() as i64).sum(),
            qualifying_comparison_count: qualifying_comparison_count as i64,
            ranked_item_count: ranked_item_count as i64,
            computed_at
        }
    }
}
