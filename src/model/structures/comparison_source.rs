use strum_macros::{Display, EnumIter};

/// Where a single user's preference between two items came from.
/// A top list comparison always takes precedence over a rating comparison
/// for the same user and pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum ComparisonSource {
    #[strum(serialize = "top list")]
    TopList,
    #[strum(serialize = "rating")]
    Rating
}
