use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::{debug, info};

use crate::{
    database::db_structs::User,
    error::RankingError,
    model::structures::comparison_source::ComparisonSource,
    utils::{cancellation::CancellationToken, progress_utils::progress_bar}
};

/// Sparse item x item win tally accumulated across all users.
///
/// `wins[a][b]` is the number of times `a` beat `b`. A tie adds 0.5 in both
/// directions. Whenever a pair is recorded, both rows carry an entry for the
/// other item (possibly 0.0), so iterating a row yields every opponent the item
/// was ever compared with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuelMatrix {
    wins: HashMap<i32, HashMap<i32, f64>>
}

impl DuelMatrix {
    pub fn new() -> DuelMatrix {
        DuelMatrix::default()
    }

    /// Number of times `a` beat `b`
    pub fn wins(&self, a: i32, b: i32) -> f64 {
        self.wins
            .get(&a)
            .and_then(|row| row.get(&b))
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of users who expressed an opinion on the pair
    pub fn total_comparisons(&self, a: i32, b: i32) -> f64 {
        self.wins(a, b) + self.wins(b, a)
    }

    pub fn record_win(&mut self, winner: i32, loser: i32) {
        self.add_wins(winner, loser, 1.0);
    }

    pub fn record_tie(&mut self, a: i32, b: i32) {
        self.add_wins(a, b, 0.5);
        self.add_wins(b, a, 0.5);
    }

    pub fn add_wins(&mut self, winner: i32, loser: i32, amount: f64) {
        *self.wins.entry(winner).or_default().entry(loser).or_insert(0.0) += amount;
        self.wins.entry(loser).or_default().entry(winner).or_insert(0.0);
    }

    /// All items with at least one comparison, ascending by id
    pub fn items(&self) -> Vec<i32> {
        self.wins.keys().copied().sorted().collect_vec()
    }

    /// Opponents of `item` and the wins `item` holds over each, ascending by opponent id
    pub fn opponents(&self, item: i32) -> Vec<(i32, f64)> {
        match self.wins.get(&item) {
            Some(row) => row
                .iter()
                .map(|(opponent, wins)| (*opponent, *wins))
                .sorted_by_key(|(opponent, _)| *opponent)
                .collect_vec(),
            None => Vec::new()
        }
    }

    pub fn contains(&self, item: i32) -> bool {
        self.wins.contains_key(&item)
    }

    pub fn len(&self) -> usize {
        self.wins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wins.is_empty()
    }

    /// Strips the rows and columns of every given item out of the matrix.
    pub fn remove_items(&mut self, items: &HashSet<i32>) {
        self.wins.retain(|item, _| !items.contains(item));
        for row in self.wins.values_mut() {
            row.retain(|opponent, _| !items.contains(opponent));
        }
    }
}

/// Counts of single-user comparisons that made it into the matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonTally {
    pub top_list: u64,
    pub rating: u64,
    /// Rating comparisons dropped because the same user's top list already covered the pair
    pub superseded: u64
}

impl ComparisonTally {
    pub fn count(&self, source: ComparisonSource) -> u64 {
        match source {
            ComparisonSource::TopList => self.top_list,
            ComparisonSource::Rating => self.rating
        }
    }

    pub fn total(&self) -> u64 {
        self.top_list + self.rating
    }
}

#[derive(Debug, Default)]
pub struct DuelMatrixBuilder {
    matrix: DuelMatrix,
    tally: ComparisonTally
}

impl DuelMatrixBuilder {
    pub fn new() -> DuelMatrixBuilder {
        DuelMatrixBuilder::default()
    }

    /// Adds one user's opinions to the matrix.
    ///
    /// Steps:
    /// 1. Every pair of items in the user's top list: the better position wins.
    /// 2. Every pair of rated items not already covered by step 1: the higher
    ///     rating wins, equal ratings tie.
    ///
    /// Each unordered pair is visited once per user.
    pub fn add_user(&mut self, user: &User) {
        // Pairs this user already compared through their top list
        let mut compared: HashSet<(i32, i32)> = HashSet::new();

        // Keep the best position should an item ever be listed twice
        let top_list = user
            .top_list
            .iter()
            .sorted_by_key(|entry| entry.position)
            .unique_by(|entry| entry.item_id)
            .collect_vec();

        for (i, better) in top_list.iter().enumerate() {
            for worse in &top_list[i + 1..] {
                compared.insert(pair_key(better.item_id, worse.item_id));
                self.matrix.record_win(better.item_id, worse.item_id);
                self.tally.top_list += 1;
            }
        }

        let rated = user
            .ratings
            .iter()
            .map(|(item_id, value)| (*item_id, *value))
            .sorted_by_key(|(item_id, _)| *item_id)
            .collect_vec();

        for (i, (a, a_value)) in rated.iter().enumerate() {
            for (b, b_value) in &rated[i + 1..] {
                if compared.contains(&pair_key(*a, *b)) {
                    self.tally.superseded += 1;
                    continue;
                }

                match a_value.partial_cmp(b_value) {
                    Some(std::cmp::Ordering::Greater) => self.matrix.record_win(*a, *b),
                    Some(std::cmp::Ordering::Less) => self.matrix.record_win(*b, *a),
                    Some(std::cmp::Ordering::Equal) => self.matrix.record_tie(*a, *b),
                    None => {
                        debug!(user_id = user.id, a, b, "Skipping unordered rating values");
                        continue;
                    }
                }

                self.tally.rating += 1;
            }
        }
    }

    pub fn finish(self) -> (DuelMatrix, ComparisonTally) {
        (self.matrix, self.tally)
    }
}

/// Builds the duel matrix from every user's top list and ratings.
///
/// The cancellation token is polled before each user.
pub fn build_duel_matrix(
    users: &[User],
    cancel: &CancellationToken
) -> Result<(DuelMatrix, ComparisonTally), RankingError> {
    let bar = progress_bar(users.len() as u64, "Building duel matrix".to_string());
    let mut builder = DuelMatrixBuilder::new();

    for user in users {
        cancel.check()?;
        builder.add_user(user);
        bar.inc(1);
    }

    bar.finish_and_clear();

    let (matrix, tally) = builder.finish();
    info!(
        items = matrix.len(),
        comparisons = tally.total(),
        top_list_comparisons = tally.count(ComparisonSource::TopList),
        rating_comparisons = tally.count(ComparisonSource::Rating),
        superseded = tally.superseded,
        "Duel matrix built"
    );

    Ok((matrix, tally))
}

fn pair_key(a: i32, b: i32) -> (i32, i32) {
    (a.min(b), a.max(b))
}
