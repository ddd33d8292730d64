//! Local visual descriptors.
//!
//! `GradientGridExtractor` is a dense, SIFT-style descriptor: the frame is
//! tiled into square cells, each cell is split into 4x4 sub-cells, and every
//! sub-cell contributes a magnitude-weighted gradient orientation histogram.
//! Flat cells (low mean gradient energy) produce no keypoint.

use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::frame::Frame;

/// Sub-cells per cell side.
const SUBCELLS: u32 = 4;

/// Extracts local descriptors from a frame.
pub trait DescriptorExtractor: Send + Sync {
    /// One row per keypoint, or `None` when the frame has no usable keypoint.
    fn describe(&self, frame: &Frame) -> Option<Array2<f32>>;

    /// Extractor name for logging.
    fn name(&self) -> &'static str;
}

/// Configuration for the gradient-grid extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientGridConfig {
    /// Cell side in pixels (must be a multiple of 4)
    pub cell_size: u32,
    /// Orientation bins per sub-cell
    pub orientation_bins: usize,
    /// Minimum mean gradient magnitude for a cell to count as a keypoint
    pub min_energy: f32,
    /// Frames are downscaled so their longest side is at most this
    pub max_side: u32,
}

impl Default for GradientGridConfig {
    fn default() -> Self {
        Self {
            cell_size: 16,
            orientation_bins: 8,
            min_energy: 4.0,
            max_side: 320,
        }
    }
}

/// Dense gradient-orientation descriptor extractor.
#[derive(Debug, Clone, Default)]
pub struct GradientGridExtractor {
    config: GradientGridConfig,
}

impl GradientGridExtractor {
    pub fn new(config: GradientGridConfig) -> Self {
        Self { config }
    }

    /// Descriptor length.
    pub fn dimension(&self) -> usize {
        (SUBCELLS * SUBCELLS) as usize * self.config.orientation_bins
    }

    fn prepare(&self, frame: &Frame) -> GrayImage {
        let luma = frame.to_luma8();
        let longest = luma.width().max(luma.height());
        if longest <= self.config.max_side || longest == 0 {
            return luma;
        }

        let scale = self.config.max_side as f32 / longest as f32;
        let width = ((luma.width() as f32 * scale).round() as u32).max(1);
        let height = ((luma.height() as f32 * scale).round() as u32).max(1);
        image::imageops::resize(&luma, width, height, FilterType::Triangle)
    }

    fn describe_cell(&self, gradients: &Gradients, x0: u32, y0: u32) -> Option<Vec<f32>> {
        let bins = self.config.orientation_bins;
        let sub = self.config.cell_size / SUBCELLS;
        let mut descriptor = vec![0.0f32; self.dimension()];
        let mut energy = 0.0f32;

        for y in y0..y0 + self.config.cell_size {
            for x in x0..x0 + self.config.cell_size {
                let (magnitude, angle) = gradients.at(x, y);
                energy += magnitude;

                let sub_index = ((y - y0) / sub * SUBCELLS + (x - x0) / sub) as usize;
                let bin = (((angle + PI) / (2.0 * PI)) * bins as f32) as usize % bins;
                descriptor[sub_index * bins + bin] += magnitude;
            }
        }

        let mean_energy = energy / (self.config.cell_size * self.config.cell_size) as f32;
        if mean_energy < self.config.min_energy {
            return None;
        }

        let norm = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm <= f32::EPSILON {
            return None;
        }
        descriptor.iter_mut().for_each(|v| *v /= norm);
        Some(descriptor)
    }
}

impl DescriptorExtractor for GradientGridExtractor {
    fn describe(&self, frame: &Frame) -> Option<Array2<f32>> {
        let cell = self.config.cell_size;
        if cell < SUBCELLS || cell % SUBCELLS != 0 || self.config.orientation_bins == 0 {
            return None;
        }

        let luma = self.prepare(frame);
        let gradients = Gradients::compute(&luma);

        let mut data = Vec::new();
        let mut rows = 0usize;
        for y0 in (0..luma.height() / cell).map(|row| row * cell) {
            for x0 in (0..luma.width() / cell).map(|col| col * cell) {
                if let Some(descriptor) = self.describe_cell(&gradients, x0, y0) {
                    data.extend(descriptor);
                    rows += 1;
                }
            }
        }

        if rows == 0 {
            return None;
        }
        Array2::from_shape_vec((rows, self.dimension()), data).ok()
    }

    fn name(&self) -> &'static str {
        "gradient_grid"
    }
}

/// Per-pixel gradient magnitude and orientation (central differences).
struct Gradients {
    width: u32,
    magnitude: Vec<f32>,
    angle: Vec<f32>,
}

impl Gradients {
    fn compute(luma: &GrayImage) -> Self {
        let (width, height) = luma.dimensions();
        let size = width as usize * height as usize;
        let mut magnitude = vec![0.0f32; size];
        let mut angle = vec![0.0f32; size];

        let value = |x: u32, y: u32| luma.get_pixel(x, y).0[0] as f32;

        for y in 0..height {
            for x in 0..width {
                let gx = value((x + 1).min(width - 1), y) - value(x.saturating_sub(1), y);
                let gy = value(x, (y + 1).min(height - 1)) - value(x, y.saturating_sub(1));
                let index = (y * width + x) as usize;
                magnitude[index] = (gx * gx + gy * gy).sqrt();
                angle[index] = gy.atan2(gx);
            }
        }

        Self {
            width,
            magnitude,
            angle,
        }
    }

    fn at(&self, x: u32, y: u32) -> (f32, f32) {
        let index = (y * self.width + x) as usize;
        (self.magnitude[index], self.angle[index])
    }
}
