//! Tabula Core - query representation and row evaluation
//!
//! This crate holds the pieces of a query that never touch the network:
//! - scalar values and column types
//! - table schemas
//! - the predicate tree, its flattening into atomic comparisons, and
//!   in-memory evaluation against rows
//! - the parsed SELECT query consumed by the engine
//! - the shared error taxonomy

pub mod error;
pub mod predicate;
pub mod query;
pub mod result;
pub mod schema;
pub mod value;

pub use error::QueryError;
pub use predicate::{extract, Comparison, CompareOp, Connective, Predicate};
pub use query::SelectQuery;
pub use result::{ResultSet, Row};
pub use schema::{Column, TableSchema};
pub use value::{ColumnType, Value};
