//! Image-processing backend for source detection.
//!
//! These modules implement the detection primitive the pipeline composes:
//! matched-filter smoothing, noise-relative thresholding, connected-component
//! labeling, multi-threshold deblending, and moment-based measurement.

pub mod convolve;
pub mod deblend;
pub mod detect;
pub mod moments;
pub mod segment;

pub use convolve::{convolve2d, convolved_noise_sigma};
pub use detect::detect_sources;
pub use moments::RawObject;
pub use segment::Pixel;
