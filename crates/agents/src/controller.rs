use std::sync::Arc;

use aero_core::replies::{
    ensure_reply, multi_airline_reply, recommendation_reply, single_airline_reply, DEFAULT_REPLY,
    MULTI_AIRLINE_TEMPLATES, NOT_ENOUGH_INFORMATION, NO_AIRLINES_FOUND, NO_CLEAR_BEST_AIRLINE,
    RECOMMENDATION_TEMPLATES, ROUTE_CLARIFICATION_TEMPLATES, TURN_FAILURE, UNRECOGNIZED_TAG,
};
use aero_core::{
    normalize_text, CannedReply, ConversationState, IntentBank, IntentTag, Route, TurnError,
    TurnResult,
};
use aero_ml::Scorer;
use aero_observability::AppMetrics;
use aero_routes::{ReferenceTable, RouteExtractor, SentimentSource};
use anyhow::Result;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tracing::{debug, error, instrument, warn};

/// Turns one utterance plus the caller's conversation state into a reply and
/// the next state.
///
/// Everything it holds is read-only after construction except the template
/// RNG, so one controller serves every session.
pub struct DialogueController {
    scorer: Arc<dyn Scorer>,
    extractor: Arc<RouteExtractor>,
    reference: Arc<ReferenceTable>,
    sentiment: Arc<dyn SentimentSource>,
    bank: Arc<IntentBank>,
    rng: Mutex<StdRng>,
    metrics: Arc<AppMetrics>,
}

impl DialogueController {
    pub fn new(
        scorer: Arc<dyn Scorer>,
        extractor: Arc<RouteExtractor>,
        reference: Arc<ReferenceTable>,
        sentiment: Arc<dyn SentimentSource>,
        bank: Arc<IntentBank>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            scorer,
            extractor,
            reference,
            sentiment,
            bank,
            rng: Mutex::new(StdRng::from_os_rng()),
            metrics,
        }
    }

    /// Makes template selection reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn model_name(&self) -> &str {
        self.scorer.model_name()
    }

    pub fn metrics(&self) -> Arc<AppMetrics> {
        self.metrics.clone()
    }

    /// Runs a single turn.
    ///
    /// `state` is never modified in place. On an internal failure the reply
    /// is a generic apology and the returned state equals the input state.
    #[instrument(skip(self, utterance, state), fields(tag))]
    pub fn process_turn(
        &self,
        utterance: &str,
        state: &ConversationState,
    ) -> Result<TurnResult, TurnError> {
        let text = normalize_text(utterance);
        if text.is_empty() {
            return Err(TurnError::EmptyInput);
        }

        let tag = self.scorer.predict(&text);
        self.metrics.inc_classifier_inference();
        tracing::Span::current().record("tag", tag.as_str());

        // computed every turn, whichever branch ends up using it
        let route = self.extractor.extract_route(&text);
        debug!(route = %route, "route extracted");

        let mut next = state.clone();
        match self.dispatch(&tag, route, &mut next) {
            Ok(reply) => {
                if reply.trim().is_empty() {
                    self.metrics.inc_fallback();
                }
                Ok(TurnResult {
                    response: ensure_reply(reply),
                    state: next,
                    tag: Some(tag),
                })
            }
            Err(err) => {
                self.metrics.inc_turn_failure();
                error!(tag = %tag, error = ?err, "turn failed, conversation state left unchanged");
                Ok(TurnResult {
                    response: TURN_FAILURE.to_string(),
                    state: state.clone(),
                    tag: Some(tag),
                })
            }
        }
    }

    fn dispatch(&self, tag: &IntentTag, route: Route, state: &mut ConversationState) -> Result<String> {
        if tag.as_str() == IntentTag::AIRLINE {
            Ok(self.airline_reply(tag, route, state))
        } else if tag.as_str() == IntentTag::RECOMMENDED_AIRLINES {
            self.recommendation(route, state)
        } else {
            Ok(self.canned_reply(tag))
        }
    }

    fn airline_reply(&self, tag: &IntentTag, route: Route, state: &mut ConversationState) -> String {
        let airlines = self.reference.airlines_for(&route);
        self.metrics.record_airline_lookup(!airlines.is_empty());

        match airlines.as_slice() {
            [] => self.pick(&ROUTE_CLARIFICATION_TEMPLATES).to_string(),
            [only] => {
                let reply = single_airline_reply(only);
                state.record_airline_match(route, airlines, tag.clone());
                reply
            }
            many => {
                let reply = multi_airline_reply(self.pick(&MULTI_AIRLINE_TEMPLATES), many);
                state.record_airline_match(route, airlines, tag.clone());
                reply
            }
        }
    }

    fn recommendation(&self, route: Route, state: &mut ConversationState) -> Result<String> {
        let (route, airlines) = match state.known_route_and_airlines() {
            Some((known_route, known_airlines)) => (known_route.clone(), known_airlines.clone()),
            None => {
                let airlines = self.reference.airlines_for(&route);
                self.metrics.record_airline_lookup(!airlines.is_empty());
                state.route = (!route.is_empty()).then(|| route.clone());
                state.airlines = (!airlines.is_empty()).then(|| airlines.clone());
                (route, airlines)
            }
        };

        if airlines.is_empty() {
            return Ok(NO_AIRLINES_FOUND.to_string());
        }

        let table = self.sentiment.load()?;
        match table.best_for(&route, &airlines) {
            Some(best) => {
                self.metrics.inc_recommendation();
                Ok(recommendation_reply(
                    self.pick(&RECOMMENDATION_TEMPLATES),
                    &best.airline,
                ))
            }
            None => Ok(NO_CLEAR_BEST_AIRLINE.to_string()),
        }
    }

    fn canned_reply(&self, tag: &IntentTag) -> String {
        match self.bank.lookup(tag) {
            CannedReply::Responses(responses) => self.pick(responses).to_string(),
            CannedReply::NoResponses => NOT_ENOUGH_INFORMATION.to_string(),
            CannedReply::Unrecognized => {
                warn!(tag = %tag, "predicted tag has no intent bank entry");
                UNRECOGNIZED_TAG.to_string()
            }
        }
    }

    fn pick<'a, S: AsRef<str>>(&self, options: &'a [S]) -> &'a str {
        let mut rng = self.rng.lock();
        options
            .choose(&mut *rng)
            .map(|option| option.as_ref())
            .unwrap_or(DEFAULT_REPLY)
    }
}
