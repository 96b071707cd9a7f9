//! Processing-flag bits carried by every detected object.
//!
//! Flags accumulate across the pipeline with bitwise OR: detection sets the
//! object-level bits, and each photometry sub-step contributes its own bits
//! without ever clearing earlier ones. The bit values follow the Source
//! Extractor convention so merged flag words read the same as catalogs
//! produced by that family of tools.

/// Object was split from a blended detection during deblending.
pub const OBJ_MERGED: u32 = 0x0001;

/// Object footprint touches the image boundary.
pub const OBJ_TRUNC: u32 = 0x0002;

/// Object moments were singular; position fell back to the unweighted
/// pixel centroid and the shape ellipse is degenerate.
pub const OBJ_SINGU: u32 = 0x0008;

/// An aperture was clipped at the image boundary.
pub const APER_TRUNC: u32 = 0x0010;

/// An aperture sum or reference flux was not positive; the dependent
/// quantity was forced to zero.
pub const APER_NONPOSITIVE: u32 = 0x0080;
