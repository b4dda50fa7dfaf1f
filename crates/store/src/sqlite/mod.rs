//! SQLite-Backend des Nachrichtenspeichers

mod nachrichten;
mod pool;

pub use pool::SqliteStore;
