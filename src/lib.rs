//! `inboxsweep`: mailbox hygiene for large email corpora.
//!
//! This crate parses raw messages into [`model::MessageRecord`]s, assigns each
//! a cleanup [`model::Category`], persists them through a
//! [`store::RecordStore`], and runs side-effect-free analyses (sender decay,
//! subject clustering, privacy risk) that surface bulk-cleanup candidates.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod parser;
pub mod store;
