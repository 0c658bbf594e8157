//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into adapter-facing APIs.
//! - Own the plaintext-to-credential boundary.

pub mod account_service;
