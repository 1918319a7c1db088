//! ODDSIQ: value pick and accumulator engine for football betting markets
//!
//! The engine lives in `strategy`; `data` and `storage` feed it, and `api`
//! and the binary put it behind HTTP and a CLI.

pub mod api;
pub mod config;
pub mod data;
pub mod storage;
pub mod strategy;
pub mod types;
