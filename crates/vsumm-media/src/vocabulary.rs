//! Visual vocabulary (k-means over local descriptors) and bag-of-visual-words
//! weighting.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// k-means parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Seed for k-means++ initialisation
    pub seed: u64,
    pub max_iterations: usize,
    /// Stop once no center moves more than this (euclidean)
    pub tolerance: f32,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 100,
            tolerance: 1e-4,
        }
    }
}

/// A fitted set of visual words.
#[derive(Debug, Clone)]
pub struct VisualVocabulary {
    centers: Array2<f32>,
}

impl VisualVocabulary {
    /// Fit `size` visual words to `descriptors` (one descriptor per row).
    pub fn fit(
        descriptors: ArrayView2<f32>,
        size: usize,
        config: &KMeansConfig,
    ) -> MediaResult<Self> {
        let available = descriptors.nrows();
        if size == 0 {
            return Err(MediaError::InvalidRequest(
                "vocabulary size must be positive".to_string(),
            ));
        }
        if size > available {
            return Err(MediaError::InsufficientFeatures {
                requested: size,
                available,
            });
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut centers = init_plus_plus(descriptors, size, &mut rng);

        let mut iterations = 0;
        for _ in 0..config.max_iterations {
            iterations += 1;
            let labels = assign(descriptors, centers.view());
            let shift = update_centers(descriptors, &labels, &mut centers);
            if shift <= config.tolerance {
                break;
            }
        }

        debug!(
            descriptors = available,
            words = size,
            iterations = iterations,
            "Fitted visual vocabulary"
        );

        Ok(Self { centers })
    }

    /// Number of visual words.
    pub fn size(&self) -> usize {
        self.centers.nrows()
    }

    /// Nearest visual word for every descriptor row.
    pub fn predict(&self, descriptors: ArrayView2<f32>) -> Vec<usize> {
        assign(descriptors, self.centers.view())
    }

    /// Occurrences of each visual word among `descriptors`.
    pub fn term_counts(&self, descriptors: ArrayView2<f32>) -> Vec<u32> {
        let mut counts = vec![0u32; self.size()];
        for word in self.predict(descriptors) {
            counts[word] += 1;
        }
        counts
    }
}

fn squared_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: ArrayView1<f32>, centers: ArrayView2<f32>) -> (usize, f32) {
    centers
        .rows()
        .into_iter()
        .enumerate()
        .map(|(index, center)| (index, squared_distance(point, center)))
        .fold((0, f32::INFINITY), |best, candidate| {
            if candidate.1 < best.1 {
                candidate
            } else {
                best
            }
        })
}

fn init_plus_plus(descriptors: ArrayView2<f32>, size: usize, rng: &mut StdRng) -> Array2<f32> {
    let rows = descriptors.nrows();
    let mut chosen = vec![rng.random_range(0..rows)];
    let mut distances: Vec<f32> = descriptors
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, descriptors.row(chosen[0])))
        .collect();

    while chosen.len() < size {
        let total: f32 = distances.iter().sum();
        let next = if total <= f32::EPSILON {
            // All remaining points coincide with a center
            (0..rows)
                .find(|index| !chosen.contains(index))
                .unwrap_or(0)
        } else {
            let mut target = rng.random::<f32>() * total;
            let mut pick = rows - 1;
            for (index, distance) in distances.iter().enumerate() {
                if target < *distance {
                    pick = index;
                    break;
                }
                target -= distance;
            }
            pick
        };

        chosen.push(next);
        let center = descriptors.row(next);
        for (distance, row) in distances.iter_mut().zip(descriptors.rows()) {
            *distance = distance.min(squared_distance(row, center));
        }
    }

    descriptors.select(Axis(0), &chosen)
}

fn assign(descriptors: ArrayView2<f32>, centers: ArrayView2<f32>) -> Vec<usize> {
    (0..descriptors.nrows())
        .into_par_iter()
        .map(|index| nearest(descriptors.row(index), centers).0)
        .collect()
}

/// Recompute centers as cluster means. Empty clusters keep their previous
/// center. Returns the largest center shift.
fn update_centers(
    descriptors: ArrayView2<f32>,
    labels: &[usize],
    centers: &mut Array2<f32>,
) -> f32 {
    let mut sums = Array2::<f32>::zeros(centers.raw_dim());
    let mut counts = vec![0usize; centers.nrows()];

    for (row, &label) in descriptors.rows().into_iter().zip(labels) {
        let mut sum = sums.row_mut(label);
        sum += &row;
        counts[label] += 1;
    }

    let mut max_shift = 0.0f32;
    for (index, count) in counts.into_iter().enumerate() {
        if count == 0 {
            continue;
        }
        let mean = sums.row(index).mapv(|v| v / count as f32);
        let shift = squared_distance(mean.view(), centers.row(index)).sqrt();
        max_shift = max_shift.max(shift);
        centers.row_mut(index).assign(&mean);
    }
    max_shift
}

/// A document's visual-word histogram weighted by inverse document frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedHistogram {
    weights: Vec<f64>,
}

impl WeightedHistogram {
    /// Weight every document's term counts by `log10(vocabulary / df)`, where
    /// `df` is the number of documents containing the word.
    pub fn from_term_counts(documents: &[Vec<u32>], vocabulary_size: usize) -> Vec<Self> {
        let width = documents.iter().map(Vec::len).max().unwrap_or(0);
        let mut document_frequency = vec![0usize; width];
        for counts in documents {
            for (word, &count) in counts.iter().enumerate() {
                if count > 0 {
                    document_frequency[word] += 1;
                }
            }
        }

        documents
            .iter()
            .map(|counts| {
                let weights = counts
                    .iter()
                    .enumerate()
                    .map(|(word, &count)| {
                        if count == 0 {
                            return 0.0;
                        }
                        let ratio = vocabulary_size as f64 / document_frequency[word] as f64;
                        let idf = ratio.log10();
                        count as f64 * idf
                    })
                    .collect();
                Self { weights }
            })
            .collect()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Total weighted mass.
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> Array2<f32> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ]
    }

    #[test]
    fn test_fit_separates_blobs() {
        let data = two_blobs();
        let vocabulary = VisualVocabulary::fit(data.view(), 2, &KMeansConfig::default()).unwrap();
        let labels = vocabulary.predict(data.view());

        assert_eq!(vocabulary.size(), 2);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let data = two_blobs();
        let config = KMeansConfig::default();
        let first = VisualVocabulary::fit(data.view(), 3, &config).unwrap();
        let second = VisualVocabulary::fit(data.view(), 3, &config).unwrap();
        assert_eq!(first.centers, second.centers);
    }

    #[test]
    fn test_vocabulary_larger_than_features() {
        let data = two_blobs();
        let result = VisualVocabulary::fit(data.view(), 7, &KMeansConfig::default());
        assert!(matches!(
            result,
            Err(MediaError::InsufficientFeatures {
                requested: 7,
                available: 6
            })
        ));
    }

    #[test]
    fn test_duplicate_points_still_fit() {
        let data = array![[1.0f32, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let vocabulary = VisualVocabulary::fit(data.view(), 3, &KMeansConfig::default()).unwrap();
        assert_eq!(vocabulary.term_counts(data.view()).iter().sum::<u32>(), 3);
    }

    #[test]
    fn test_weighted_histogram_idf() {
        // word 0 appears in both documents, word 1 only in the first
        let documents = vec![vec![2, 1, 0], vec![1, 0, 0]];
        let histograms = WeightedHistogram::from_term_counts(&documents, 3);

        let idf_shared = (3.0f64 / 2.0).log10();
        let idf_rare = 3.0f64.log10();
        assert!((histograms[0].total() - (2.0 * idf_shared + idf_rare)).abs() < 1e-9);
        assert!((histograms[1].total() - idf_shared).abs() < 1e-9);
        assert_eq!(histograms[1].weights()[2], 0.0);
    }
}
