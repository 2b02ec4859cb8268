//! Database layer
//!
//! SQLite connection pool, embedded migrations and the repository
//! implementations used by the service layer.
//!
//! # Usage
//!
//! ```ignore
//! use devnest::config::DatabaseConfig;
//! use devnest::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{begin_write, create_pool, create_test_pool, ping, DbPool};
