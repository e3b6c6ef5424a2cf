pub mod config;
pub mod error;
pub mod io;
pub mod signal;
pub mod tempo;

pub use crate::config::{DownsampleMode, SpectrumMode, TempoConfig};
pub use crate::error::DomainError;
pub use crate::io::ConfigFormat;
pub use crate::signal::Signal;
pub use crate::tempo::{FallbackReason, TempoEstimate};
