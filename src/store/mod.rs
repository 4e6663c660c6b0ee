pub mod sqlite;

use crate::app::Result;

pub use sqlite::SqliteStore;

/// Application-scoped key/value persistence.
pub trait Store {
    fn get_value(&self, key: &str) -> Result<Option<String>>;
    fn set_value(&self, key: &str, value: &str) -> Result<()>;
    fn delete_value(&self, key: &str) -> Result<()>;
}
