//! Command handlers.

pub mod models;
pub mod serve;
pub mod voices;
