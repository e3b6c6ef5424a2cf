pub mod service;
pub mod source;
pub mod status;

pub use service::{TempoService, DEFAULT_TIMEOUT};
pub use source::{FileSource, MemorySource, SignalSource, TrackId};
pub use status::TempoStatus;
