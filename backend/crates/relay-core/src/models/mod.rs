pub mod queue_item;
pub mod team_id;
pub mod user_id;
