//! Threshold segmentation and connected-component labeling.
//!
//! Converts a filtered image plus a per-pixel threshold map into pixel
//! membership lists, one per connected component, using 8-connectivity.
//! The final 1-based segmentation map is built only after deblending and
//! minimum-area filtering so its labels match catalog order exactly.

use ndarray::{Array2, ArrayView2};

/// Pixel coordinates as (row, col).
pub type Pixel = (usize, usize);

/// Build the boolean detection mask.
///
/// A pixel is detected when its filtered value exceeds the threshold map at
/// that pixel and it is not excluded by the optional input mask (`true` in
/// the mask means "ignore this pixel").
pub fn detection_mask(
    filtered: &ArrayView2<f64>,
    threshold: &ArrayView2<f64>,
    mask: Option<&ArrayView2<bool>>,
) -> Array2<bool> {
    let mut detected = Array2::from_elem(filtered.dim(), false);
    for ((i, j), &value) in filtered.indexed_iter() {
        let masked = mask.map(|m| m[[i, j]]).unwrap_or(false);
        detected[[i, j]] = !masked && value > threshold[[i, j]];
    }
    detected
}

/// Group detected pixels into connected components.
///
/// Uses 8-connectivity flood fill; each component is returned as a list of
/// (row, col) pixels in scan order of discovery.
pub fn connected_components(mask: &ArrayView2<bool>) -> Vec<Vec<Pixel>> {
    let (rows, cols) = mask.dim();
    let mut visited = Array2::from_elem((rows, cols), false);
    let mut components = Vec::new();

    let neighbors = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ];

    for i in 0..rows {
        for j in 0..cols {
            if !mask[[i, j]] || visited[[i, j]] {
                continue;
            }

            let mut pixels = Vec::new();
            let mut stack = vec![(i, j)];
            visited[[i, j]] = true;

            while let Some((y, x)) = stack.pop() {
                pixels.push((y, x));

                for &(dy, dx) in &neighbors {
                    let ny = y as isize + dy;
                    let nx = x as isize + dx;
                    if ny < 0 || ny >= rows as isize || nx < 0 || nx >= cols as isize {
                        continue;
                    }
                    let (ny, nx) = (ny as usize, nx as usize);
                    if mask[[ny, nx]] && !visited[[ny, nx]] {
                        visited[[ny, nx]] = true;
                        stack.push((ny, nx));
                    }
                }
            }

            components.push(pixels);
        }
    }

    components
}

/// Build the 1-based segmentation map from final object pixel lists.
///
/// Pixel value 0 is background; value `i` marks membership in the i-th
/// object (1-based, catalog order).
pub fn segmentation_map(dim: (usize, usize), objects: &[Vec<Pixel>]) -> Array2<u32> {
    let mut seg = Array2::zeros(dim);
    for (index, pixels) in objects.iter().enumerate() {
        let label = (index + 1) as u32;
        for &(y, x) in pixels {
            seg[[y, x]] = label;
        }
    }
    seg
}
