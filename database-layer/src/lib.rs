//! Schema-validated document store for ScribeCare.
//!
//! Four collections (`users`, `patients`, `transcripts`, `notes`) sit on a
//! pluggable [`DocumentBackend`]:
//!
//! - [`InMemoryBackend`]: DashMap storage for development and tests
//! - [`PostgresBackend`]: one `documents_<collection>` JSONB table per
//!   collection, with expression indexes for every declared index
//!
//! Each model declares its indexes and a `validate()` schema check through
//! the [`Document`] trait; [`Collection`] runs that check before every insert
//! and replace, so a violating document is never written. Collections and
//! indexes are created on startup if absent. There is no migration tooling,
//! no transactions and no optimistic locking: the last writer wins.

pub mod backend;
pub mod collection;
pub mod database;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod schema;

pub use backend::DocumentBackend;
pub use collection::Collection;
pub use database::DocumentDatabase;
pub use error::*;
pub use memory::InMemoryBackend;
pub use models::*;
pub use postgres::{PoolConfig, PostgresBackend};
pub use query::{Filter, Query, Sort, SortDirection};
pub use schema::{Document, IndexSpec};
