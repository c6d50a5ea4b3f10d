pub mod config;
pub mod crypto;
pub mod error;
pub mod pipeline;
pub mod state;

pub use error::{IntegrityError, Result};
pub use pipeline::{IntegrityPipeline, PipelineConfig, SignOutcome, VerifyOutcome};
pub use state::MemoryStore;
