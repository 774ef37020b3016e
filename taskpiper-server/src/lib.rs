//! `taskpiper` API server library.
//!
//! Exposes the HTTP server for use in tests and embedding. The server
//! manages Users and Tasks over an embedded document store and keeps the
//! denormalized `Task.assignedUser` / `User.pendingTasks` references
//! mutually consistent after every mutation.

pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod pending;
pub mod seed;
pub mod tasks;
pub mod users;
