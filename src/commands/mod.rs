pub mod events;
pub mod list;
