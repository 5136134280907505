use std::{cmp::Ordering, collections::HashMap};

use itertools::Itertools;

use crate::model::{
    constants::{RankingConstants, LOSS_CONTRIBUTION, TIE_CONTRIBUTION, WIN_CONTRIBUTION},
    duel_matrix::DuelMatrix,
    structures::item_score::ItemScore
};

/// Scores a single item against every opponent it has enough comparisons with.
///
/// Each qualifying duel contributes 100 for an aggregate win, 50 for an
/// aggregate tie and 0 for a loss. The raw score is the mean contribution.
pub fn score_item(matrix: &DuelMatrix, item_id: i32, constants: &RankingConstants) -> ItemScore {
    let mut duel_count = 0u32;
    let mut total = 0.0;

    for (opponent, wins) in matrix.opponents(item_id) {
        let losses = matrix.wins(opponent, item_id);
        if wins + losses < constants.min_comparisons {
            continue;
        }

        duel_count += 1;
        total += match wins.partial_cmp(&losses) {
            Some(Ordering::Greater) => WIN_CONTRIBUTION,
            Some(Ordering::Equal) => TIE_CONTRIBUTION,
            _ => LOSS_CONTRIBUTION
        };
    }

    let raw_score = match duel_count {
        0 => None,
        n => Some(total / n as f64)
    };

    ItemScore {
        item_id,
        duel_count,
        raw_score,
        eligible: is_eligible(duel_count, raw_score, constants)
    }
}

/// Scores every item in the matrix, ascending by item id.
pub fn compute_scores(matrix: &DuelMatrix, constants: &RankingConstants) -> Vec<ItemScore> {
    matrix
        .items()
        .into_iter()
        .map(|item_id| score_item(matrix, item_id, constants))
        .collect_vec()
}

/// Number of qualifying duels per item. Used by the pruner, which only cares
/// about the minimum duel bar.
pub fn duel_counts(matrix: &DuelMatrix, constants: &RankingConstants) -> HashMap<i32, u32> {
    matrix
        .items()
        .into_iter()
        .map(|item_id| {
            let count = matrix
                .opponents(item_id)
                .into_iter()
                .filter(|(opponent, _)| matrix.total_comparisons(item_id, *opponent) >= constants.min_comparisons)
                .count() as u32;

            (item_id, count)
        })
        .collect()
}

/// An item may be ranked once it has enough duels. Items at or above the elite
/// score need the stricter elite duel count so tiny samples can't produce
/// near-perfect scores.
pub fn is_eligible(duel_count: u32, raw_score: Option<f64>, constants: &RankingConstants) -> bool {
    let Some(score) = raw_score else {
        return false;
    };

    if duel_count < constants.min_duels {
        return false;
    }

    score < constants.elite_score || duel_count >= constants.min_duels_elite
}

/// Directional (item, opponent) pairings that met the comparison minimum
pub fn qualifying_comparison_count(scores: &[ItemScore]) -> u64 {
    scores.iter().map(|s| s.duel_count as u64).sum()
}
