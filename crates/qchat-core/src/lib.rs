//! Core qchat library (stream ingestion, markdown rendering, chat persistence, config).

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod markdown;
pub mod session;
pub mod storage;
pub mod stream;
