use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"));

/// Sparse row: `(feature index, value)` pairs sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NgramRange {
    pub min: usize,
    pub max: usize,
}

impl NgramRange {
    pub const UNIGRAMS: Self = Self { min: 1, max: 1 };
    pub const UNI_AND_BIGRAMS: Self = Self { min: 1, max: 2 };
}

pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|token| token.as_str().to_string())
        .collect()
}

fn ngrams(tokens: &[String], range: NgramRange) -> Vec<String> {
    let mut grams = Vec::new();
    for n in range.min.max(1)..=range.max {
        if n == 1 {
            grams.extend(tokens.iter().cloned());
            continue;
        }
        grams.extend(tokens.windows(n).map(|window| window.join(" ")));
    }
    grams
}

/// Term-frequency × smoothed inverse-document-frequency over word n-grams,
/// rows L2-normalised.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    ngram_range: NgramRange,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit<S: AsRef<str>>(
        documents: &[S],
        ngram_range: NgramRange,
        max_features: Option<usize>,
    ) -> Self {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut term_count: BTreeMap<String, usize> = BTreeMap::new();

        for document in documents {
            let grams = ngrams(&tokenize(document.as_ref()), ngram_range);
            let mut seen = std::collections::HashSet::new();
            for gram in grams {
                *term_count.entry(gram.clone()).or_default() += 1;
                if seen.insert(gram.clone()) {
                    *document_frequency.entry(gram).or_default() += 1;
                }
            }
        }

        let mut terms = term_count.into_iter().collect::<Vec<_>>();
        if let Some(cap) = max_features {
            if terms.len() > cap {
                // most frequent first; BTreeMap order already breaks ties alphabetically
                terms.sort_by(|(a_term, a_count), (b_term, b_count)| {
                    b_count.cmp(a_count).then_with(|| a_term.cmp(b_term))
                });
                terms.truncate(cap);
                terms.sort_by(|(a, _), (b, _)| a.cmp(b));
            }
        }

        let n_documents = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (index, (term, _)) in terms.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_documents) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Self {
            ngram_range,
            vocabulary,
            idf,
        }
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in ngrams(&tokenize(text), self.ngram_range) {
            if let Some(&index) = self.vocabulary.get(&gram) {
                *counts.entry(index).or_default() += 1.0;
            }
        }

        let mut row = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect::<SparseVector>();

        let norm = row.iter().map(|(_, value)| value * value).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in row.iter_mut() {
                *value /= norm;
            }
        }
        row
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }
}
