use crate::{
    database::{
        db_structs::{RankingSnapshot, TopListEntry, User},
        RankingStore
    },
    error::RankingError,
    messaging::{Notifier, PublisherError, RankingUpdatedMessage},
    model::{duel_matrix::DuelMatrix, structures::ranked_item::RankedItem}
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex
    }
};

/// A user whose top list holds `item_ids` in order, positions starting at 1
pub fn top_list_user(id: i32, item_ids: &[i32]) -> User {
    User {
        id,
        top_list: item_ids
            .iter()
            .enumerate()
            .map(|(i, item_id)| TopListEntry {
                item_id: *item_id,
                position: i as i32 + 1
            })
            .collect_vec(),
        ratings: HashMap::new()
    }
}

pub fn rating_user(id: i32, ratings: &[(i32, f64)]) -> User {
    User {
        id,
        top_list: Vec::new(),
        ratings: ratings.iter().copied().collect()
    }
}

/// Generates `n_users` users over items `1..=n_items`. Every user rates between
/// 2 and 15 items on a 0.5..=5.0 scale, and about half of them also keep a top
/// list of up to 8 items.
pub fn generate_users(n_users: i32, n_items: i32, seed: u64) -> Vec<User> {
    if n_items < 2 {
        panic!("At least two items are needed to generate comparisons");
    }

    // Initialize seeded RNG for reproducible results
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut item_ids = (1..=n_items).collect_vec();

    (1..=n_users)
        .map(|id| {
            item_ids.shuffle(&mut rng);
            let n_rated = rng.random_range(2..=n_items.min(15)) as usize;
            let ratings = item_ids[..n_rated]
                .iter()
                .map(|item_id| (*item_id, rng.random_range(1..=10) as f64 * 0.5))
                .collect::<HashMap<_, _>>();

            let top_list = if rng.random_bool(0.5) {
                item_ids.shuffle(&mut rng);
                let n_listed = rng.random_range(2..=n_items.min(8)) as usize;
                item_ids[..n_listed]
                    .iter()
                    .enumerate()
                    .map(|(i, item_id)| TopListEntry {
                        item_id: *item_id,
                        position: i as i32 + 1
                    })
                    .collect_vec()
            } else {
                Vec::new()
            };

            User { id, top_list, ratings }
        })
        .collect_vec()
}

/// Builds a matrix from `(a, b, wins of a over b, wins of b over a)` tuples
pub fn matrix_from_duels(duels: &[(i32, i32, f64, f64)]) -> DuelMatrix {
    let mut matrix = DuelMatrix::new();
    for (a, b, a_wins, b_wins) in duels {
        matrix.add_wins(*a, *b, *a_wins);
        matrix.add_wins(*b, *a, *b_wins);
    }

    matrix
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredItem {
    pub score: Option<f64>,
    pub rank: Option<i32>,
    pub previous_rank: Option<i32>,
    pub valid_duels: u32,
    pub updated_at: Option<DateTime<Utc>>
}

/// In-memory stand-in for the database
#[derive(Default)]
pub struct InMemoryStore {
    pub users: Vec<User>,
    pub items: Mutex<HashMap<i32, StoredItem>>,
    pub snapshots: Mutex<Vec<RankingSnapshot>>,
    pub fail_valid_duels: AtomicBool,
    pub fail_save: AtomicBool
}

impl InMemoryStore {
    pub fn new(users: Vec<User>) -> InMemoryStore {
        InMemoryStore {
            users,
            ..InMemoryStore::default()
        }
    }

    pub fn insert_item(&self, item_id: i32, item: StoredItem) {
        self.items.lock().unwrap().insert(item_id, item);
    }

    pub fn item(&self, item_id: i32) -> StoredItem {
        self.items.lock().unwrap().get(&item_id).cloned().unwrap_or_default()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl RankingStore for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, RankingError> {
        Ok(self.users.clone())
    }

    async fn current_ranks(&self) -> Result<HashMap<i32, i32>, RankingError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(id, item)| item.rank.map(|rank| (*id, rank)))
            .collect())
    }

    async fn update_valid_duels(&self, valid_duels: &[(i32, u32)]) -> Result<(), RankingError> {
        if self.fail_valid_duels.load(Ordering::SeqCst) {
            return Err(RankingError::Persistence("valid duels unavailable".to_string()));
        }

        let counts: HashMap<i32, u32> = valid_duels.iter().copied().collect();
        let mut items = self.items.lock().unwrap();
        for (id, item) in items.iter_mut() {
            item.valid_duels = counts.get(id).copied().unwrap_or(0);
        }
        for (id, count) in counts {
            items.entry(id).or_default().valid_duels = count;
        }

        Ok(())
    }

    async fn save_rankings(
        &self,
        rankings: &[RankedItem],
        snapshot: &RankingSnapshot,
        stale_before: DateTime<Utc>,
        batch_size: usize
    ) -> Result<u64, RankingError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(RankingError::Persistence("rankings unavailable".to_string()));
        }

        let mut items = self.items.lock().unwrap();
        for ranked in rankings {
            let item = items.entry(ranked.item_id).or_default();
            item.score = Some(ranked.score);
            item.rank = Some(ranked.rank);
            item.previous_rank = ranked.previous_rank;
            item.updated_at = Some(snapshot.computed_at);
        }

        let mut cleared = 0;
        for item in items.values_mut() {
            let stale = item.updated_at.map_or(false, |updated_at| updated_at < stale_before);
            if item.rank.is_some() && stale {
                item.score = None;
                item.rank = None;
                item.previous_rank = None;
                cleared += 1;
            }
        }

        self.snapshots.lock().unwrap().push(snapshot.clone());

        Ok(cleared)
    }
}

/// Records every broadcast instead of sending it
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<RankingUpdatedMessage>>,
    pub fail: AtomicBool
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<RankingUpdatedMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify_all(&self, message_key: &str, snapshot: &RankingSnapshot) -> Result<(), PublisherError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublisherError::NotInitialized);
        }

        self.sent
            .lock()
            .unwrap()
            .push(RankingUpdatedMessage::new(message_key, snapshot));
        Ok(())
    }
}
