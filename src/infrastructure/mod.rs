//! Infrastructure layer - Storage adapters and cache orchestration

pub mod cache;
pub mod logging;
pub mod services;
