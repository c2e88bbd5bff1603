use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DataLoadError;
use crate::models::{IntentExample, IntentTag};

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentCorpus {
    #[serde(default)]
    pub intents: Vec<IntentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRecord {
    pub tag: IntentTag,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub responses: Option<Vec<String>>,
}

impl IntentCorpus {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|source| DataLoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the corpus, falling back to an empty one when the file is missing or malformed.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        match Self::from_path(path.as_ref()) {
            Ok(corpus) => corpus,
            Err(err) => {
                warn!(error = %err, "intent corpus unavailable, continuing with an empty corpus");
                Self::default()
            }
        }
    }

    pub fn examples(&self) -> Vec<IntentExample> {
        self.intents
            .iter()
            .flat_map(|record| {
                record
                    .patterns
                    .iter()
                    .map(|pattern| IntentExample::new(pattern.clone(), record.tag.clone()))
            })
            .collect()
    }

    pub fn tags(&self) -> BTreeSet<IntentTag> {
        self.intents.iter().map(|record| record.tag.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedReply<'a> {
    Responses(&'a [String]),
    /// The tag exists in the corpus but carries no responses.
    NoResponses,
    Unrecognized,
}

/// Canned responses for every single-turn tag of the corpus.
#[derive(Debug, Clone, Default)]
pub struct IntentBank {
    entries: HashMap<IntentTag, Vec<String>>,
}

impl IntentBank {
    pub fn from_corpus(corpus: &IntentCorpus) -> Self {
        let mut entries = HashMap::new();
        for record in corpus.intents.iter().filter(|record| !record.tag.is_bespoke()) {
            // first record wins when a tag is declared twice
            entries
                .entry(record.tag.clone())
                .or_insert_with(|| record.responses.clone().unwrap_or_default());
        }

        let bank = Self { entries };
        let silent = bank.silent_tags();
        if !silent.is_empty() {
            warn!(tags = ?silent, "intent tags without canned responses will use the fallback reply");
        }
        bank
    }

    pub fn lookup(&self, tag: &IntentTag) -> CannedReply<'_> {
        match self.entries.get(tag) {
            Some(responses) if responses.is_empty() => CannedReply::NoResponses,
            Some(responses) => CannedReply::Responses(responses),
            None => CannedReply::Unrecognized,
        }
    }

    /// Tags with no canned responses, sorted.
    pub fn silent_tags(&self) -> Vec<IntentTag> {
        let mut tags = self
            .entries
            .iter()
            .filter(|(_, responses)| responses.is_empty())
            .map(|(tag, _)| tag.clone())
            .collect::<Vec<_>>();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
