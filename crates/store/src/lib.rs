pub mod accounts;
pub mod error;
pub mod storage;

// Re-export commonly used items
pub use crate::accounts::{trades_key, AccountStore, ACCOUNTS_KEY, THEME_KEY};
pub use crate::error::{Result, StoreError};
pub use crate::storage::{resolve_store_path, JsonFileStore, KeyValueStore, MemoryStore};
