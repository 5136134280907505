use serde::Serialize;

/// Final per-item output of a ranking run.
///
/// Every item seen in any comparison gets one of these, ranked or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub item_id: i32,
    pub score: Option<f64>,
    pub rank: Option<i32>,
    pub previous_rank: Option<i32>,
    pub valid_duels: u32
}
