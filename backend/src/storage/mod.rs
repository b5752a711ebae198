//! # Storage Module
//!
//! SQLite persistence for the immunization records service.
//!
//! `DbConnection` owns the pool and creates the schema on startup. Each table
//! has a repository module of plain async functions taking a
//! `&mut SqliteConnection`, so the same query runs against a pooled
//! connection for reads or inside a service's transaction for writes.
//!
//! Soft-deleted children stay in the `children` table; every "active" query
//! filters on `deleted_at IS NULL` explicitly.

pub mod connection;
pub mod repositories;

pub use connection::DbConnection;
