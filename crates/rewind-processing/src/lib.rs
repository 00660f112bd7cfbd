//! Rewind media processing
//!
//! Measures downloaded media with ffprobe and produces time-reversed copies with ffmpeg.

pub mod probe;
pub mod tools;
pub mod traits;
pub mod transform;

pub use probe::{estimate_gif_size, FfprobeProbe};
pub use traits::{MediaProbe, MediaTransform};
pub use transform::FfmpegReverser;
