/// Minimum number of user comparisons (ties count once) before a pairing
/// counts as a duel.
pub const MIN_COMPARISONS: f64 = 3.0;
/// Minimum number of duels an item needs to be ranked.
pub const MIN_DUELS: u32 = 275;
/// Minimum number of duels for an item scoring at or above [`ELITE_SCORE`].
pub const MIN_DUELS_ELITE: u32 = 350;
pub const ELITE_SCORE: f64 = 99.0;
pub const MAX_PRUNE_ITERATIONS: u32 = 5;
/// Ranked items written per database round trip
pub const PERSIST_BATCH_SIZE: usize = 20;
/// Ranked items not refreshed within this window are de-ranked
pub const STALE_AFTER_HOURS: i64 = 4;

pub const WIN_CONTRIBUTION: f64 = 100.0;
pub const TIE_CONTRIBUTION: f64 = 50.0;
pub const LOSS_CONTRIBUTION: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConstants {
    pub min_comparisons: f64,
    pub min_duels: u32,
    pub min_duels_elite: u32,
    pub elite_score: f64,
    pub max_prune_iterations: u32,
    pub persist_batch_size: usize,
    pub stale_after_hours: i64
}

pub fn default_constants() -> RankingConstants {
    RankingConstants {
        min_comparisons: MIN_COMPARISONS,
        min_duels: MIN_DUELS,
        min_duels_elite: MIN_DUELS_ELITE,
        elite_score: ELITE_SCORE,
        max_prune_iterations: MAX_PRUNE_ITERATIONS,
        persist_batch_size: PERSIST_BATCH_SIZE,
        stale_after_hours: STALE_AFTER_HOURS
    }
}

impl Default for RankingConstants {
    fn default() -> Self {
        default_constants()
    }
}
