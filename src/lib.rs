//! Instagram caption service
//!
//! Accepts photo uploads over HTTP, forwards them to a vision model with a
//! caption-writing instruction, and returns normalized caption suggestions
//! (text, category, hashtags, emojis) in the requested tone.

pub mod ai;
pub mod app;
pub mod captions;
pub mod error;
pub mod image;
pub mod models;
pub mod prompts;
pub mod server;

pub use error::{Error, Result};
