//! Library crate for PKKacquire.
//!
//! The pipeline is one extraction core with two trigger adapters: a batch CLI
//! (`cli`) and an HTTP-triggered server (`server`). Both drive the same
//! orchestration in `pipeline`.

pub mod cli;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod scrapers;
pub mod server;
pub mod storage;
