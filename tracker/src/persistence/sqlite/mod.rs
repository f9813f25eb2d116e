//! SQLite-backed repository implementations.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode** so readers never block the single writer.
//! - **Foreign keys enabled**, which the schema relies on for cascading
//!   deletes of exercises and sets.
//! - **Embedded migrations** from `migrations/`, applied by [`Database::open`].
//!
//! ## Repository types
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqliteWorkoutRepository`] | `WorkoutRepository` |
//! | [`SqliteCatalogRepository`] | `CatalogRepository` |
//! | [`SqlitePreferenceRepository`] | `PreferenceRepository` |
//! | [`SqliteTransferRepository`] | `TransferRepository` |
//!
//! The single-active-workout rule is a partial unique index on `workouts`,
//! so it holds across processes and not only inside one engine.

mod catalog_repo;
mod database;
mod preference_repo;
mod transfer_repo;
mod workout_repo;
#[cfg(test)]
mod integration_tests;
pub(crate) mod helpers;

pub use catalog_repo::SqliteCatalogRepository;
pub use database::Database;
pub use preference_repo::SqlitePreferenceRepository;
pub use transfer_repo::SqliteTransferRepository;
pub use workout_repo::SqliteWorkoutRepository;
