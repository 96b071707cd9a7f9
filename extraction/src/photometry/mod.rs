//! Photometry kernels and the auto-photometry stage.

pub mod aperture;
pub mod auto;
pub mod ellipse;
pub mod kron;

pub use aperture::{flux_radius, sum_ellipse};
pub use auto::{compute_auto_photometry, AutoPhotometry, PHOT_FLUXFRAC, SENTINEL};
pub use ellipse::EllipseCoeffs;
pub use kron::kron_radius;
