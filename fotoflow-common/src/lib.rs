//! # Fotoflow Common Library
//!
//! Shared code for the fotoflow services:
//! - Error types (`Error`, `Result`)
//! - Event types (`FotoflowEvent`) and the `EventBus`
//! - Storage layout and data-root resolution

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
