//! Noise descriptions accepted by the detection stage.

use ndarray::Array2;

use crate::error::ExtractionError;

/// Per-pixel noise standard deviation, either a single scalar applied to the
/// whole frame or a full map matching the image shape.
///
/// Detection thresholds are expressed in units of this sigma, so the model is
/// expanded to a variance map once per run and threaded through the filter
/// stage.
#[derive(Debug, Clone)]
pub enum NoiseModel {
    /// One standard deviation for every pixel.
    Uniform(f64),
    /// Per-pixel standard deviation map, same shape as the image.
    Map(Array2<f64>),
}

impl NoiseModel {
    /// Expand to a per-pixel variance map of the given image shape.
    ///
    /// # Arguments
    /// * `dim` - Image shape as (rows, cols)
    ///
    /// # Returns
    /// Variance (sigma squared) per pixel, or `InvalidDimensions` if a map
    /// was supplied with the wrong shape.
    pub fn variance_map(&self, dim: (usize, usize)) -> Result<Array2<f64>, ExtractionError> {
        match self {
            NoiseModel::Uniform(sigma) => Ok(Array2::from_elem(dim, sigma * sigma)),
            NoiseModel::Map(sigma) => {
                if sigma.dim() != dim {
                    return Err(ExtractionError::InvalidDimensions {
                        expected: dim,
                        actual: sigma.dim(),
                    });
                }
                Ok(sigma.mapv(|s| s * s))
            }
        }
    }
}
