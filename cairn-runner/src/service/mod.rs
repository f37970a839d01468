//! Service layer
//!
//! The checkpoint service holds the run logic; the log buffer collects what
//! the host build shows its users. Both are trait-based so hosts and tests
//! can swap implementations.

mod checkpoint;
mod log_buffer;

// Re-export traits
pub use checkpoint::CheckpointService;
pub use log_buffer::LogBufferService;

// Re-export implementations
pub use checkpoint::StandardCheckpointService;
pub use log_buffer::InMemoryLogBuffer;
