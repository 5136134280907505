use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub item_id: i32,
    pub score: f64,
    /// 1-based
    pub rank: i32,
    /// Rank from the prior run, if the item was ranked
    pub previous_rank: Option<i32>
}
