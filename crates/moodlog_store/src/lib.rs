mod sqlite;

pub use sqlite::SqliteEntryStore;
