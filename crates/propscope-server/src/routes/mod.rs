pub mod event_data;
pub mod health;
pub mod query;
