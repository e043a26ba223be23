//! # ck-core
//!
//! Core types, traits, and configuration for crudkit.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - The `ValidationError` raised for malformed requests
//! - Core traits (Entity, Identifiable, Timestamped)
//! - Page request/result types
//! - Configuration types

pub mod config;
pub mod error;
pub mod pagination;
pub mod traits;

pub use error::*;
pub use pagination::*;
pub use traits::*;
