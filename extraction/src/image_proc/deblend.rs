//! Multi-threshold deblending of merged detections.
//!
//! A connected component may contain several overlapping sources. Deblending
//! rescans the component at exponentially spaced sub-thresholds between its
//! detection floor and its peak; the highest level that exposes two or more
//! significant sub-components splits the component, with every remaining
//! pixel joining the nearest surviving peak. Each resulting group is
//! deblended again so triple and deeper blends resolve level by level.
//!
//! A sub-component is significant when it carries more than `cont` of the
//! component's total flux and at least `minarea` pixels; both conditions
//! keep noise bumps on a bright profile from fragmenting it at the very low
//! survey default contrast.

use ndarray::{Array2, ArrayView2};

use crate::image_proc::segment::{connected_components, Pixel};

/// Split one component's pixels into deblended child pixel lists.
///
/// Flux comparisons use the filtered (detection) image, matching the image
/// the component was found in.
///
/// # Arguments
/// * `pixels` - Member pixels of the component
/// * `filtered` - Filtered detection image
/// * `floor` - Detection threshold the component was extracted at
/// * `nthresh` - Number of sub-threshold levels to scan
/// * `cont` - Minimum flux fraction for a sub-component to split off
/// * `minarea` - Minimum pixel count for a sub-component to split off
///
/// # Returns
/// One pixel list per deblended object; a single-element vector when the
/// component does not split.
pub fn deblend(
    pixels: Vec<Pixel>,
    filtered: &ArrayView2<f64>,
    floor: f64,
    nthresh: usize,
    cont: f64,
    minarea: usize,
) -> Vec<Vec<Pixel>> {
    let total_flux: f64 = pixels.iter().map(|&(y, x)| filtered[[y, x]]).sum();
    let peak = pixels
        .iter()
        .map(|&(y, x)| filtered[[y, x]])
        .fold(f64::NEG_INFINITY, f64::max);

    if nthresh < 2 || floor <= 0.0 || peak <= floor || total_flux <= 0.0 {
        return vec![pixels];
    }

    let ratio = peak / floor;

    // Scan from just below the peak downward; the first level exposing a
    // genuine split is the one closest to the saddle between the peaks.
    for i in (1..nthresh).rev() {
        let level = floor * ratio.powf(i as f64 / nthresh as f64);

        let children = components_above(&pixels, filtered, level);
        let significant: Vec<&Vec<Pixel>> = children
            .iter()
            .filter(|child| {
                let flux: f64 = child.iter().map(|&(y, x)| filtered[[y, x]]).sum();
                child.len() >= minarea && flux > cont * total_flux
            })
            .collect();

        if significant.len() < 2 {
            continue;
        }

        let seeds: Vec<Pixel> = significant
            .iter()
            .map(|child| {
                *child
                    .iter()
                    .max_by(|&&(ay, ax), &&(by, bx)| {
                        filtered[[ay, ax]]
                            .partial_cmp(&filtered[[by, bx]])
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .expect("significant child is non-empty")
            })
            .collect();

        let mut groups: Vec<Vec<Pixel>> = vec![Vec::new(); seeds.len()];
        for &pixel in &pixels {
            let owner = significant
                .iter()
                .position(|child| child.contains(&pixel))
                .unwrap_or_else(|| nearest_seed(pixel, &seeds));
            groups[owner].push(pixel);
        }

        // Each group may itself still hold a blend
        return groups
            .into_iter()
            .flat_map(|group| deblend(group, filtered, floor, nthresh, cont, minarea))
            .collect();
    }

    vec![pixels]
}

/// Connected sub-components of `pixels` at or above `level`.
fn components_above(pixels: &[Pixel], filtered: &ArrayView2<f64>, level: f64) -> Vec<Vec<Pixel>> {
    let min_y = pixels.iter().map(|&(y, _)| y).min().unwrap_or(0);
    let min_x = pixels.iter().map(|&(_, x)| x).min().unwrap_or(0);
    let max_y = pixels.iter().map(|&(y, _)| y).max().unwrap_or(0);
    let max_x = pixels.iter().map(|&(_, x)| x).max().unwrap_or(0);

    let dim = (max_y - min_y + 1, max_x - min_x + 1);
    let mut local = Array2::from_elem(dim, false);
    for &(y, x) in pixels {
        if filtered[[y, x]] >= level {
            local[[y - min_y, x - min_x]] = true;
        }
    }

    connected_components(&local.view())
        .into_iter()
        .map(|component| {
            component
                .into_iter()
                .map(|(y, x)| (y + min_y, x + min_x))
                .collect()
        })
        .collect()
}

/// Index of the seed closest to `pixel` (squared Euclidean distance).
fn nearest_seed(pixel: Pixel, seeds: &[Pixel]) -> usize {
    let (py, px) = pixel;
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (k, &(sy, sx)) in seeds.iter().enumerate() {
        let dy = py as f64 - sy as f64;
        let dx = px as f64 - sx as f64;
        let dist = dy * dy + dx * dx;
        if dist < best_dist {
            best_dist = dist;
            best = k;
        }
    }
    best
}
