//! TF-IDF vectors for transcript text.
//!
//! Tokens are lowercase runs of two or more word characters. Term weights are
//! raw counts times `ln(n / df) + 1`, and every row is L2-normalised, so the
//! dot product of two rows is their cosine similarity.

use ndarray::Array2;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid token pattern"));

/// Lowercased tokens of `text`, in order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A fitted TF-IDF model over a fixed document collection.
#[derive(Debug, Clone)]
pub struct TfIdf {
    /// Term to column, columns numbered in order of first occurrence
    vocabulary: HashMap<String, usize>,
    matrix: Array2<f64>,
}

impl TfIdf {
    /// Fit term weights over `documents` (one row per document).
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let mut vocabulary = HashMap::new();
        for token in tokenized.iter().flatten() {
            let next = vocabulary.len();
            vocabulary.entry(token.clone()).or_insert(next);
        }

        let rows = tokenized.len();
        let mut matrix = Array2::<f64>::zeros((rows, vocabulary.len()));
        for (row, tokens) in tokenized.iter().enumerate() {
            for token in tokens {
                if let Some(&column) = vocabulary.get(token) {
                    matrix[[row, column]] += 1.0;
                }
            }
        }

        let n = rows as f64;
        for mut column in matrix.columns_mut() {
            let df = column.iter().filter(|&&count| count > 0.0).count() as f64;
            if df > 0.0 {
                let idf = (n / df).ln() + 1.0;
                column.mapv_inplace(|count| count * idf);
            }
        }

        for mut row in matrix.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|weight| weight / norm);
            }
        }

        Self { vocabulary, matrix }
    }

    /// Weighted document-term matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Pairwise cosine similarity of every document pair.
    pub fn similarity(&self) -> Array2<f64> {
        self.matrix.dot(&self.matrix.t())
    }
}
