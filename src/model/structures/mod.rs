pub mod comparison_source;
pub mod item_result;
pub mod item_score;
pub mod ranked_item;
