//! Language tag validation and multilingual field encoding for
//! bibliographic metadata.
//!
//! - [`i18n`]: language tag validation against the subtag reference tables
//! - [`multi`]: packed multi-language field values and mangled creator names
//! - [`registry`]: parsers and downloader for the upstream reference data
//! - [`db`]: SQLite storage for the reference tables

pub mod config;
pub mod db;
pub mod i18n;
pub mod multi;
pub mod registry;
pub mod retry;
