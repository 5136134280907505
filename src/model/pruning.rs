use std::collections::HashSet;

use itertools::Itertools;
use tracing::{info, warn};

use crate::{
    error::RankingError,
    model::{constants::RankingConstants, duel_matrix::DuelMatrix, scoring::duel_counts},
    utils::cancellation::CancellationToken
};

#[derive(Debug, Clone, PartialEq)]
pub struct PruneOutcome {
    pub matrix: DuelMatrix,
    /// Every item stripped out of the matrix, ascending
    pub removed: Vec<i32>,
    pub iterations: u32,
    /// False when the iteration bound was hit while items still fell below the duel minimum
    pub converged: bool
}

/// Repeatedly strips items with fewer than `min_duels` qualifying duels out of
/// the matrix. Removing an item can push its opponents below the bar, so duel
/// counts are recomputed after each pass.
///
/// Stops once a pass finds nothing to remove, or after `max_prune_iterations`
/// passes. In the latter case the partially pruned matrix is returned as is.
pub fn prune(
    mut matrix: DuelMatrix,
    constants: &RankingConstants,
    cancel: &CancellationToken
) -> Result<PruneOutcome, RankingError> {
    let mut removed = Vec::new();
    let mut iterations = 0;
    let mut rejects = find_rejects(&matrix, constants);

    while !rejects.is_empty() && iterations < constants.max_prune_iterations {
        cancel.check()?;
        iterations += 1;

        info!(
            iteration = iterations,
            rejected = rejects.len(),
            remaining = matrix.len() - rejects.len(),
            "Pruning under-sampled items"
        );

        matrix.remove_items(&rejects);
        removed.extend(rejects.iter().copied());
        rejects = find_rejects(&matrix, constants);
    }

    let converged = rejects.is_empty();
    if !converged {
        warn!(
            iterations,
            pending = rejects.len(),
            "Pruning stopped at the iteration bound before converging"
        );
    }

    Ok(PruneOutcome {
        matrix,
        removed: removed.into_iter().sorted().collect_vec(),
        iterations,
        converged
    })
}

fn find_rejects(matrix: &DuelMatrix, constants: &RankingConstants) -> HashSet<i32> {
    duel_counts(matrix, constants)
        .into_iter()
        .filter(|(_, count)| *count < constants.min_duels)
        .map(|(item_id, _)| item_id)
        .collect()
}
