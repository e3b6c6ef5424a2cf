pub mod dsp;
pub mod io;

pub use dsp::{decimate, hann_window, high_pass, resample_anti_aliased, PeakLevel};
pub use io::{AudioDecoder, DecodedAudio};
