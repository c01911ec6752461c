/// Database model definitions.
pub mod models;
/// Presentation and section persistence backends.
pub mod presentation_store;
/// Storage abstraction layer for database operations.
pub mod storage;
