//! LexVault: legal document intake and research.
//!
//! Documents enter through the ingestion pipeline, which validates them,
//! stores their bytes content-addressed, runs text extraction, and routes
//! them to the library or to human verification based on extraction
//! confidence. The library backs a retrieval-augmented assistant, review
//! workflows, and a draft template catalog, all exposed over a JSON API and
//! a CLI.

pub mod chat;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod models;
pub mod repository;
pub mod server;
pub mod storage;
pub mod templates;
pub mod workflow;
