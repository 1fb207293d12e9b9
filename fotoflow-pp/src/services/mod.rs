//! Pipeline services
//!
//! The pieces of the two-phase pipeline: image preprocessing and QR decode,
//! payload matching, sequential grouping, remote delivery, and the phase
//! orchestrator that ties them together.

pub mod batch_processor;
pub mod grouping;
pub mod matcher;
pub mod preprocess;
pub mod qr_decoder;
pub mod remote;
pub mod uploader;

pub use batch_processor::BatchProcessor;
pub use qr_decoder::{DecodeMode, QrDecoder};
pub use uploader::{ObjectStore, UploadOrchestrator};
