mod entities;
mod extract;
mod matcher;
mod sentiment;
mod tables;

pub use entities::{
    CapitalizedSpanRecognizer, EntityLabel, EntityPipeline, EntityRecognizer, EntitySpan, Gazetteer,
    DEFAULT_CARRIERS, DEFAULT_GAZETTEER,
};
pub use extract::{airport_codes, RouteExtraction, RouteExtractor, RouteTier};
pub use matcher::{match_airlines, ReferenceTable};
pub use sentiment::{CsvSentimentSource, SentimentSource, SentimentTable, StaticSentimentSource};
