//! Dialect-agnostic persistence layer for versioned lore content.
//!
//! One logical schema and one fluent query surface over two backing
//! stores: a single-file embedded store and a client/server relational
//! store. Callers pick a dialect once, in [`StoreConfig`]; everything
//! above the provider is dialect-free.
//!
//! # Architecture
//!
//! ```text
//! Domain code
//!     |
//!     +-- Repositories (per-entity façades)
//!         |
//!         +-- LoreManager (sole writer, transactions, versioning)
//!             |-- QueryExecutor (+ QueryBuilder) -- retry/backoff
//!             |-- SchemaSetup                     -- tables + validation
//!             +-- StoreProvider                   -- pool + reconnect
//!
//! HealthMonitor ---- periodic probe ----> LoreManager::reconnect
//! ```
//!
//! # Modules
//!
//! - [`config`] -- resolved store settings and dialect selection
//! - [`provider`] -- pool lifecycle, liveness probe, reconnect
//! - [`query`] / [`schema_query`] -- parameterized DML / DDL builders
//! - [`executor`] -- async execution, bounded retry, transactions
//! - [`schema`] -- idempotent table creation and presence validation
//! - [`manager`] -- versioned-entity operations and workflows
//! - [`health`] -- background liveness monitoring
//! - [`repository`] -- the surface domain code holds
//! - [`rows`] -- typed row records and explicit field mapping
//! - [`error`] -- shared error taxonomy

pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod health;
pub mod manager;
pub mod provider;
pub mod query;
pub mod repository;
pub mod rows;
pub mod schema;
pub mod schema_query;

// Re-export primary types for convenience.
pub use config::{Dialect, EmbeddedConfig, ServerConfig, StoreConfig};
pub use error::StoreError;
pub use executor::QueryExecutor;
pub use health::{HealthMonitor, HealthMonitorConfig, HealthState};
pub use manager::{CreatedEntry, LoreManager, Specialization};
pub use provider::StoreProvider;
pub use query::{QueryBuilder, SqlValue};
pub use repository::{
    CollectionRepository, EntryRepository, ItemRepository, LocationRepository, PlayerRepository,
};
pub use rows::{
    CollectionItemRow, CollectionRow, EntryRow, FromStoreRow, ItemRow, LocationRow, NameChangeRow,
    PlayerRow, ProgressRow, SubmissionRow,
};
pub use schema::{SchemaSetup, REQUIRED_TABLES};
pub use schema_query::{ColumnType, SchemaQueryBuilder, TableBuilder};
