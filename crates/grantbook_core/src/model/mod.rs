//! Domain model for accounts, privileges and lookup filters.
//!
//! # Responsibility
//! - Define the value types crossing the store boundary.
//! - Keep "not provided" and "not loaded" states explicit in the types.
//!
//! # Invariants
//! - Ids are surrogate integers assigned by the store and never reused by
//!   callers.
//! - Grants are not addressable on their own; they surface only through an
//!   account's privilege relation.

pub mod account;
pub mod filter;
pub mod privilege;
