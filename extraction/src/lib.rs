//! Source extraction and catalog post-processing for astronomical images.
//!
//! Runs a single-pass pipeline over one image: matched-filter detection
//! with deblending, Kron-aperture ("auto") photometry with a half-light
//! radius, and assembly of a fixed-schema catalog alongside a 1-based
//! segmentation map. Defaults reproduce a deep survey's production tuning;
//! callers override the configuration bundle or the detection threshold.
//!
//! # Usage
//!
//! ```
//! use extraction::{extract_default, NoiseModel};
//! use ndarray::Array2;
//!
//! let image = Array2::<f64>::from_shape_fn((32, 32), |(y, x)| {
//!     let dy = y as f64 - 16.0;
//!     let dx = x as f64 - 16.0;
//!     5.0 * (-(dx * dx + dy * dy) / 8.0).exp()
//! });
//!
//! let result = extract_default(&image.view(), &NoiseModel::Uniform(0.1)).unwrap();
//! assert_eq!(result.catalog.len(), result.segmentation.iter()
//!     .copied().max().unwrap_or(0) as usize);
//! ```
//!
//! Per-object numerical failures never abort a run: they surface as flag
//! bits and `-9999.0` sentinels in the affected rows, so the catalog always
//! has one row per raw detection.

pub mod catalog;
pub mod config;
pub mod error;
pub mod flags;
pub mod image_proc;
pub mod noise;
pub mod photometry;
pub mod pipeline;

// Re-export key functionality for easier access
pub use catalog::{CatalogRow, Extraction};
pub use config::{default_filter_kernel, ExtractionConfig, FilterType, DETECT_THRESH};
pub use error::ExtractionError;
pub use image_proc::{detect_sources, RawObject};
pub use noise::NoiseModel;
pub use photometry::{AutoPhotometry, PHOT_FLUXFRAC, SENTINEL};
pub use pipeline::{extract_default, ExtractionPipeline};
