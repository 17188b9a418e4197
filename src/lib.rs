//! Audits MySQL index design from catalog metadata.
//!
//! A [`models::Schema`] snapshot is loaded either from a live
//! `information_schema` ([`loader::MetadataLoader`]) or from a saved file
//! ([`loader::load_snapshot`]), then [`analysis::analyze`] reports covered
//! indexes, unindexed foreign-key-like columns and badly ordered composite
//! indexes.

pub mod analysis;
pub mod config;
pub mod loader;
pub mod models;
pub mod reporter;
