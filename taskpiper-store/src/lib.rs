//! Embedded document store for `taskpiper`.
//!
//! Collections hold JSON object documents in insertion order and expose
//! Mongo-flavored point lookups, filtered queries with
//! sort/select/skip/limit/count, operator updates (`$set`, `$unset`,
//! `$push`, `$pull`), full-document replacement, and deletes. Everything
//! lives in process memory behind per-collection read/write locks.

pub mod collection;
pub mod error;
pub mod filter;
pub mod query;
pub mod store;
pub mod update;

pub use collection::Collection;
pub use error::StoreError;
pub use query::FindQuery;
pub use store::Store;
