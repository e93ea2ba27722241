//! libradmin - operator console for the reading platform's book-import pipeline.
//!
//! Watches a pipeline run over the admin REST API: live status and per-book
//! progress while it runs, then the final report once it settles.

pub mod cli;
pub mod client;
pub mod config;
pub mod credentials;
pub mod environment;
pub mod models;
pub mod panels;
pub mod poller;
pub mod utils;
