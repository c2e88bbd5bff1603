//! Staged place-name recognition: a deterministic place gazetteer, a carrier
//! list that claims airline names before anything else can, then a general
//! capitalised-span recogniser for everything the gazetteers miss.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

/// Place names the general recogniser does not reliably pick up, plus places
/// that contain a carrier name and must be claimed before the carrier stage.
pub const DEFAULT_GAZETTEER: &[&str] = &[
    "Adelaide",
    "United States",
    "United Kingdom",
    "United Arab Emirates",
];

/// Carrier and brand names that read like places to the capitalised-span stage.
pub const DEFAULT_CARRIERS: &[&str] = &[
    "Qantas", "QantasLink", "Jetstar", "Virgin Australia", "Virgin Atlantic", "Virgin", "Rex",
    "Bonza", "Delta", "American Airlines", "United Airlines", "Alaska Airlines", "Hawaiian Airlines",
    "Southwest", "JetBlue", "Air New Zealand", "Air Canada", "Air France", "British Airways",
    "Lufthansa", "KLM", "Emirates", "Etihad", "Qatar Airways", "Singapore Airlines", "Cathay Pacific",
    "Malaysia Airlines", "AirAsia", "Scoot", "Ryanair", "easyJet",
];

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}[\p{L}\-]*").expect("valid word regex"));

const LOCATION_CUES: &[&str] = &[
    "from", "to", "in", "via", "between", "and", "at", "into", "towards", "toward", "through",
];

const CONNECTORS: &[&str] = &["of", "de", "del", "la"];

const NOT_PLACES: &[&str] = &[
    "I", "Hi", "Hello", "Hey", "Thanks", "Thank", "Please", "Can", "Could", "Would", "What",
    "Which", "Where", "When", "How", "Who", "Why", "Is", "Are", "Do", "Does", "My", "Me", "We",
    "You", "The", "A", "An", "Yes", "No", "Ok", "Okay", "Monday", "Tuesday", "Wednesday",
    "Thursday", "Friday", "Saturday", "Sunday", "January", "February", "March", "April", "May",
    "June", "July", "August", "September", "October", "November", "December", "Airline",
    "Airlines", "Flight", "Flights", "Economy", "Business",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLabel {
    /// Geopolitical entity: city, region, country.
    Gpe,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub label: EntityLabel,
}

impl EntitySpan {
    fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

pub trait EntityRecognizer: Send + Sync {
    fn name(&self) -> &'static str;
    fn recognize(&self, text: &str) -> Vec<EntitySpan>;
}

/// Exact, case-sensitive phrase matcher on word boundaries.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    name: &'static str,
    entries: Vec<(String, EntityLabel)>,
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::named("gazetteer")
    }
}

impl Gazetteer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut gazetteer = Self::new();
        for place in DEFAULT_GAZETTEER {
            gazetteer.add(*place, EntityLabel::Gpe);
        }
        gazetteer
    }

    /// Airline names labelled [`EntityLabel::Other`], so they never become route stops.
    pub fn carriers() -> Self {
        let mut gazetteer = Self::named("carriers");
        for carrier in DEFAULT_CARRIERS {
            gazetteer.add(*carrier, EntityLabel::Other);
        }
        gazetteer
    }

    pub fn add(&mut self, phrase: impl Into<String>, label: EntityLabel) {
        let phrase = phrase.into().trim().to_string();
        if phrase.is_empty() || self.entries.iter().any(|(known, _)| *known == phrase) {
            return;
        }
        self.entries.push((phrase, label));
        // longest phrase first so "Alice Springs" beats "Alice"
        self.entries
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EntityRecognizer for Gazetteer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn recognize(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans: Vec<EntitySpan> = Vec::new();
        for (phrase, label) in &self.entries {
            for (start, matched) in text.match_indices(phrase.as_str()) {
                let end = start + matched.len();
                if !on_word_boundary(text, start, end) {
                    continue;
                }
                let candidate = EntitySpan {
                    start,
                    end,
                    text: matched.to_string(),
                    label: *label,
                };
                if !spans.iter().any(|span| span.overlaps(&candidate)) {
                    spans.push(candidate);
                }
            }
        }
        spans.sort_by_key(|span| span.start);
        spans
    }
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Labels runs of capitalised words as places when they follow a location
/// cue ("from", "to", ...) or sit anywhere but the start of a sentence.
///
/// It cannot tell a city from a brand, so it runs after the carrier list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapitalizedSpanRecognizer;

struct Word<'a> {
    start: usize,
    end: usize,
    text: &'a str,
}

impl CapitalizedSpanRecognizer {
    fn is_candidate(word: &str) -> bool {
        word.chars().next().is_some_and(char::is_uppercase) && !NOT_PLACES.contains(&word)
    }
}

impl EntityRecognizer for CapitalizedSpanRecognizer {
    fn name(&self) -> &'static str {
        "capitalized-span"
    }

    fn recognize(&self, text: &str) -> Vec<EntitySpan> {
        let words = WORD
            .find_iter(text)
            .map(|m| Word {
                start: m.start(),
                end: m.end(),
                text: m.as_str(),
            })
            .collect::<Vec<_>>();

        let adjacent = |left: &Word, right: &Word| text[left.end..right.start].trim().is_empty();

        let mut spans = Vec::new();
        let mut index = 0;
        while index < words.len() {
            if !Self::is_candidate(words[index].text) {
                index += 1;
                continue;
            }

            let first = index;
            let mut last = index;
            loop {
                let next = last + 1;
                if next < words.len()
                    && adjacent(&words[last], &words[next])
                    && Self::is_candidate(words[next].text)
                {
                    last = next;
                } else if next + 1 < words.len()
                    && CONNECTORS.contains(&words[next].text)
                    && adjacent(&words[last], &words[next])
                    && adjacent(&words[next], &words[next + 1])
                    && Self::is_candidate(words[next + 1].text)
                {
                    last = next + 1;
                } else {
                    break;
                }
            }

            let cued = first > 0 && {
                let previous = words[first - 1].text.to_lowercase();
                LOCATION_CUES.contains(&previous.as_str())
                    || (previous == "of" && first > 1 && words[first - 2].text.eq_ignore_ascii_case("out"))
            };
            let sentence_start = text[..words[first].start]
                .trim_end()
                .chars()
                .next_back()
                .map_or(true, |ch| matches!(ch, '.' | '!' | '?'));

            if cued || !sentence_start {
                let (start, end) = (words[first].start, words[last].end);
                spans.push(EntitySpan {
                    start,
                    end,
                    text: text[start..end].to_string(),
                    label: EntityLabel::Gpe,
                });
            }
            index = last + 1;
        }
        spans
    }
}

/// Runs recognisers in order; a later stage cannot claim text an earlier stage already tagged.
#[derive(Clone)]
pub struct EntityPipeline {
    stages: Vec<Arc<dyn EntityRecognizer>>,
}

impl Default for EntityPipeline {
    fn default() -> Self {
        Self::new()
            .with_stage(Arc::new(Gazetteer::with_defaults()))
            .with_stage(Arc::new(Gazetteer::carriers()))
            .with_stage(Arc::new(CapitalizedSpanRecognizer))
    }
}

impl EntityPipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn with_stage(mut self, stage: Arc<dyn EntityRecognizer>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn recognize(&self, text: &str) -> Vec<EntitySpan> {
        let mut accepted: Vec<EntitySpan> = Vec::new();
        for stage in &self.stages {
            for span in stage.recognize(text) {
                if !accepted.iter().any(|known| known.overlaps(&span)) {
                    accepted.push(span);
                }
            }
        }
        accepted.sort_by_key(|span| span.start);
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(spans: &[EntitySpan]) -> Vec<&str> {
        spans.iter().map(|span| span.text.as_str()).collect()
    }

    #[test]
    fn gazetteer_matches_whole_words_only() {
        let mut gazetteer = Gazetteer::with_defaults();
        gazetteer.add("Alice Springs", EntityLabel::Gpe);
        gazetteer.add("Alice", EntityLabel::Gpe);

        let spans = gazetteer.recognize("Adelaide or Alice Springs, not Adelaidean");
        assert_eq!(texts(&spans), vec!["Adelaide", "Alice Springs"]);
    }

    #[test]
    fn capitalized_spans_need_a_cue_at_sentence_start() {
        let recognizer = CapitalizedSpanRecognizer;
        assert!(recognizer.recognize("Hello there").is_empty());
        assert!(recognizer.recognize("Monday works for me").is_empty());
        assert_eq!(
            texts(&recognizer.recognize("I want to fly from Sydney to New York")),
            vec!["Sydney", "New York"]
        );
        assert_eq!(
            texts(&recognizer.recognize("Flying out of Rio de Janeiro tomorrow")),
            vec!["Rio de Janeiro"]
        );
        assert_eq!(
            texts(&recognizer.recognize("is there a route between Perth and Darwin?")),
            vec!["Perth", "Darwin"]
        );
    }

    #[test]
    fn carriers_are_not_places() {
        let spans = EntityPipeline::default().recognize("Does Virgin Australia fly from Perth to Darwin?");
        assert_eq!(texts(&spans), vec!["Virgin Australia", "Perth", "Darwin"]);
        assert_eq!(spans[0].label, EntityLabel::Other);
        assert!(spans[1..].iter().all(|span| span.label == EntityLabel::Gpe));
        let spans = EntityPipeline::default().recognize("Emirates from the United Arab Emirates to Delta");
        assert_eq!(texts(&spans), vec!["Emirates", "United Arab Emirates", "Delta"]);
        assert_eq!(spans[1].label, EntityLabel::Gpe);
        assert_eq!(
            EntityPipeline::default().stage_names(),
            vec!["gazetteer", "carriers", "capitalized-span"]
        );
    }

    #[test]
    fn earlier_stages_win_overlaps() {
        struct Everything;
        impl EntityRecognizer for Everything {
            fn name(&self) -> &'static str {
                "everything"
            }
            fn recognize(&self, text: &str) -> Vec<EntitySpan> {
                vec![EntitySpan {
                    start: 0,
                    end: text.len(),
                    text: text.to_string(),
                    label: EntityLabel::Other,
                }]
            }
        }

        let pipeline = EntityPipeline::new()
            .with_stage(Arc::new(Gazetteer::with_defaults()))
            .with_stage(Arc::new(Everything));
        let spans = pipeline.recognize("off to Adelaide");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].label, EntityLabel::Gpe);
        assert_eq!(pipeline.stage_names(), vec!["gazetteer", "everything"]);
    }
}
