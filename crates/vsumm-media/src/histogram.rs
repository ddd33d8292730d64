//! Intensity histograms for frame-to-frame similarity.

use crate::frame::Frame;

/// Number of intensity bins.
pub const HISTOGRAM_BINS: usize = 256;

/// L1-normalised 256-bin luma histogram of a frame.
///
/// Colour frames are converted to luma first. An empty frame yields an
/// all-zero histogram.
pub fn intensity_histogram(frame: &Frame) -> Vec<f32> {
    let luma = frame.to_luma8();
    let mut counts = [0u64; HISTOGRAM_BINS];
    for pixel in luma.pixels() {
        counts[pixel.0[0] as usize] += 1;
    }

    let total: u64 = counts.iter().sum();
    if total == 0 {
        return vec![0.0; HISTOGRAM_BINS];
    }

    counts
        .iter()
        .map(|&count| (count as f64 / total as f64) as f32)
        .collect()
}

/// Compute histogram intersection (similarity measure).
///
/// Returns value in [0, 1] where 1 = identical histograms.
pub fn histogram_intersection(h1: &[f32], h2: &[f32]) -> f64 {
    if h1.len() != h2.len() || h1.is_empty() {
        return 0.0;
    }

    let mut intersection = 0.0f64;
    let mut sum1 = 0.0f64;
    let mut sum2 = 0.0f64;

    for (a, b) in h1.iter().zip(h2.iter()) {
        intersection += (*a as f64).min(*b as f64);
        sum1 += *a as f64;
        sum2 += *b as f64;
    }

    let denominator = sum1.min(sum2);
    if denominator > 0.0 {
        intersection / denominator
    } else {
        0.0
    }
}
