//! Domain models for fotoflow-pp

mod batch;
mod payload;
mod photo;
mod registration;

pub use batch::{BatchStatus, PhotoBatch};
pub use payload::IdentityPayload;
pub use photo::Photo;
pub use registration::Registration;
