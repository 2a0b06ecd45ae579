//! # Arcade Shelf
//!
//! Local-first status persistence and on-demand enrichment for an arcade
//! game picker.
//!
//! Arcade Shelf remembers what you think of each game (`want_to_play`,
//! `played`, `dont_have_rom`, `not_playable`, or any free-form status) in a
//! hosted REST table when one is configured, and in a local SQLite file
//! otherwise or whenever the remote is unreachable. Alongside it sit
//! best-effort clients for marquee artwork, arcade-database metadata, and
//! historical newspaper search, all cached per session.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌──────────────┐
//! │     CLI      │───▶│ StatusService │───▶│ REST table   │
//! │   (shelf)    │    │  + Session    │    │ (PostgREST)  │
//! └──────┬───────┘    └───────┬───────┘    └──────┬───────┘
//!        │                    │ fallback           │
//!        ▼                    ▼                    ▼
//! ┌──────────────┐    ┌───────────────┐
//! │ Enrichment / │    │ SQLite (WAL)  │
//! │   Archive    │    │  game_status  │
//! └──────────────┘    └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! shelf init                          # create the local database
//! shelf status set pacman played      # remember a status
//! shelf export                        # list Want to Play games
//! shelf details galaga                # arcade-database summary
//! shelf search --year 1923            # ranked newspaper articles
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and remote secret resolution |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Local schema creation |
//! | [`local_store`] | SQLite status backend |
//! | [`remote_store`] | PostgREST status backend |
//! | [`status`] | Unified status service with fallback |
//! | [`session`] | Per-session status and enrichment caches |
//! | [`enrich`] | Marquee and metadata enrichment |
//! | [`archive`] | Newspaper archive search |
//! | [`export`] | Status list export |
//! | [`links`] | Research links |

pub mod archive;
pub mod config;
pub mod db;
pub mod enrich;
pub mod export;
pub mod links;
pub mod local_store;
pub mod migrate;
pub mod remote_store;
pub mod session;
pub mod status;

pub use arcade_shelf_core::models;
pub use arcade_shelf_core::relevance;
pub use arcade_shelf_core::store;
