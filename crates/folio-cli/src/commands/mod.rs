//! Command handlers

pub mod config;
pub mod credential;
pub mod pull;
pub mod save;
pub mod show;
pub mod status;
