/// Match persistence backends.
pub mod match_store;
/// Persisted match representation.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
