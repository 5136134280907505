/// Result of one scoring pass for a single item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemScore {
    pub item_id: i32,
    /// Number of opponents with at least the minimum number of comparisons
    pub duel_count: u32,
    /// `None` when the item has no qualifying duels. No data is not a zero score.
    pub raw_score: Option<f64>,
    /// Passed both the minimum duel bar and the elite bar
    pub eligible: bool
}
