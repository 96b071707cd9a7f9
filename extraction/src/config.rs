//! Extraction configuration tuned for deep survey coadds.
//!
//! Defaults reproduce a specific survey's production settings: a very low
//! deblending contrast, 64 deblending sub-thresholds, a 4-pixel minimum
//! area, and matched-filter smoothing with a 7x7 Gaussian kernel of
//! FWHM 3.0 pixels. Callers override the whole bundle or just the
//! detection threshold; there is no process-wide mutable default.

use ndarray::{arr2, Array2};

/// Default detection significance threshold, in units of the local noise
/// sigma of the filtered image.
pub const DETECT_THRESH: f64 = 0.8;

/// Smoothing applied to the image before thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Convolve with the configured kernel; thresholds compare against the
    /// exact sigma of the convolved noise.
    Convolution,
    /// No smoothing; thresholds compare against the raw noise sigma.
    None,
}

/// Immutable parameter bundle for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Deblending contrast: minimum fraction of a component's flux a
    /// sub-peak must carry to be split into its own object.
    pub deblend_cont: f64,
    /// Number of exponentially spaced sub-thresholds scanned during
    /// deblending.
    pub deblend_nthresh: usize,
    /// Minimum pixel count for a valid detection.
    pub minarea: usize,
    /// Smoothing mode applied before thresholding.
    pub filter_type: FilterType,
    /// Smoothing kernel; must have odd dimensions.
    pub filter_kernel: Array2<f64>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            deblend_cont: 0.00001,
            deblend_nthresh: 64,
            minarea: 4,
            filter_type: FilterType::Convolution,
            filter_kernel: default_filter_kernel(),
        }
    }
}

/// 7x7 convolution mask of a Gaussian PSF with FWHM = 3.0 pixels.
pub fn default_filter_kernel() -> Array2<f64> {
    arr2(&[
        [0.004963, 0.021388, 0.051328, 0.068707, 0.051328, 0.021388, 0.004963],
        [0.021388, 0.092163, 0.221178, 0.296069, 0.221178, 0.092163, 0.021388],
        [0.051328, 0.221178, 0.530797, 0.710525, 0.530797, 0.221178, 0.051328],
        [0.068707, 0.296069, 0.710525, 0.951108, 0.710525, 0.296069, 0.068707],
        [0.051328, 0.221178, 0.530797, 0.710525, 0.530797, 0.221178, 0.051328],
        [0.021388, 0.092163, 0.221178, 0.296069, 0.221178, 0.092163, 0.021388],
        [0.004963, 0.021388, 0.051328, 0.068707, 0.051328, 0.021388, 0.004963],
    ])
}
