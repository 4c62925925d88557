//! # SR Timeline
//!
//! Skill-rating reconstruction and gap-aware timelines for competitive
//! match history.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (match records, seasons, annotations)
//! - **calculate**: Rating estimation, merged timeline, continuity and viewport
//! - **storage**: JSONL match source and per-key input cache
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod models;
pub mod storage;

pub use models::*;
