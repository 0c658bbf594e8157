//! Persistence layer: store contract, query building, error translation and
//! the SQLite backend.
//!
//! # Responsibility
//! - Define the backend-agnostic `AccountStore` contract.
//! - Isolate SQL text and backend error shapes from callers.
//!
//! # Invariants
//! - Store APIs return `StoreError` only.
//! - Caller-supplied values travel as bound parameters, never SQL text.

pub mod context;
pub mod error;
pub mod query;
pub mod sqlite;
pub mod store;
pub mod translate;
