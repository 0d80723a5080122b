// Local durable cache

mod sqlite;

pub use sqlite::{CacheError, LocalStore};
