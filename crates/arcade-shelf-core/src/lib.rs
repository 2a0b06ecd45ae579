//! # Arcade Shelf Core
//!
//! Shared, I/O-free logic for Arcade Shelf: status models, the status
//! store abstraction, media-reference extraction, and relevance filtering
//! of archive search results.
//!
//! This crate contains no tokio, sqlx, reqwest, or filesystem I/O. The
//! `arcade-shelf` app crate supplies the SQLite and REST backends and the
//! HTTP enrichment clients.

pub mod media;
pub mod models;
pub mod relevance;
pub mod store;
