//! Postgres implementations of the fieldmeta-core port traits.
//!
//! Each adapter is a newtype wrapping `PgPool`. All SQL is
//! runtime-checked (`sqlx::query`, not `sqlx::query!`) to avoid a
//! compile-time DB requirement. The schema lives in `schema.sql` at the
//! crate root.

mod sqlx_types;
mod store;

pub use store::{PgDimensionStore, PgFieldStore, PgFieldValuesStore};
