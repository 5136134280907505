use chrono::{Duration, Utc};
use itertools::Itertools;
use tracing::{info, warn};

use crate::{
    database::{db_structs::RankingSnapshot, RankingStore},
    error::RankingError,
    messaging::Notifier,
    model::{
        constants::RankingConstants,
        ranking_model::{RankingModel, RankingOutcome}
    },
    utils::cancellation::CancellationToken
};

pub const RANKING_UPDATED: &str = "ranking_updated";

/// Leaderboard entries logged at the end of a dry run
const DRY_RUN_PREVIEW: usize = 25;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Compute and report only. Nothing is written and nobody is notified.
    pub dry_run: bool,
    pub constants: RankingConstants
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RankingOutcome,
    /// Only set for committed runs
    pub snapshot: Option<RankingSnapshot>,
    pub stale_cleared: u64,
    pub notified: bool
}

/// Runs a full ranking batch against `store`.
///
/// A committed run writes the ranked items, clears stale rankings and stores
/// the snapshot in one atomic step, then records valid duel counts and
/// broadcasts the update. Failures in the last two are logged and swallowed;
/// anything before them aborts the run with the catalog left untouched.
pub async fn run_ranking<S: RankingStore, N: Notifier>(
    store: &S,
    notifier: Option<&N>,
    options: &RunOptions,
    cancel: &CancellationToken
) -> Result<RunReport, RankingError> {
    info!(dry_run = options.dry_run, "Starting ranking run");

    let users = store.list_users().await?;
    let previous_ranks = store.current_ranks().await?;
    info!(
        users = users.len(),
        previously_ranked = previous_ranks.len(),
        "Loaded ranking input"
    );

    let model = RankingModel::new(options.constants);
    let outcome = model.process(&users, &previous_ranks, cancel)?;

    if options.dry_run {
        log_leaderboard(&outcome);
        info!("Dry run complete, nothing was saved");

        return Ok(RunReport {
            outcome,
            snapshot: None,
            stale_cleared: 0,
            notified: false
        });
    }

    cancel.check()?;

    let computed_at = Utc::now();
    let snapshot = RankingSnapshot::new(
        &users,
        outcome.qualifying_comparison_count,
        outcome.leaderboard.len(),
        computed_at
    );
    let stale_before = computed_at - Duration::hours(options.constants.stale_after_hours);

    let stale_cleared = store
        .save_rankings(
            &outcome.leaderboard,
            &snapshot,
            stale_before,
            options.constants.persist_batch_size
        )
        .await?;
    info!(
        ranked = outcome.leaderboard.len(),
        stale_cleared, "Rankings saved"
    );

    let valid_duels = outcome
        .items
        .iter()
        .map(|item| (item.item_id, item.valid_duels))
        .collect_vec();
    if let Err(e) = store.update_valid_duels(&valid_duels).await {
        warn!("Failed to update valid duel counts, continuing: {}", e);
    }

    let notified = match notifier {
        Some(notifier) => match notifier.notify_all(RANKING_UPDATED, &snapshot).await {
            Ok(()) => {
                info!("Ranking update broadcast sent");
                true
            }
            Err(e) => {
                warn!("Failed to broadcast ranking update: {}", e);
                false
            }
        },
        None => {
            info!("Notifications disabled, skipping broadcast");
            false
        }
    };

    Ok(RunReport {
        outcome,
        snapshot: Some(snapshot),
        stale_cleared,
        notified
    })
}

fn log_leaderboard(outcome: &RankingOutcome) {
    for ranked in outcome.leaderboard.iter().take(DRY_RUN_PREVIEW) {
        info!(
            "#{:<4} item {:<8} score {:>7.3} (previous {})",
            ranked.rank,
            ranked.item_id,
            ranked.score,
            ranked.previous_rank.map_or("-".to_string(), |r| r.to_string())
        );
    }

    info!(
        ranked = outcome.leaderboard.len(),
        items = outcome.items.len(),
        pruned = outcome.pruned.len(),
        "Dry run leaderboard"
    );
}
