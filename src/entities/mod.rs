pub mod item;
pub mod user;
pub mod withdrawal;
