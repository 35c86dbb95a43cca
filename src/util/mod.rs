//! Utility types and functions

pub mod config;
pub mod logger;
pub mod platform;
