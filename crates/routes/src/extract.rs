use std::sync::Arc;

use aero_core::Route;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::{CapitalizedSpanRecognizer, EntityLabel, EntityPipeline, Gazetteer};

static AIRPORT_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{3}\b").expect("valid airport code regex"));

/// Three-uppercase-letter codes in order of appearance.
pub fn airport_codes(text: &str) -> Vec<&str> {
    AIRPORT_CODE.find_iter(text).map(|m| m.as_str()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTier {
    AirportCodes,
    NamedEntities,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteExtraction {
    pub route: Route,
    pub tier: RouteTier,
}

#[derive(Clone, Default)]
pub struct RouteExtractor {
    pipeline: EntityPipeline,
}

impl RouteExtractor {
    pub fn new(pipeline: EntityPipeline) -> Self {
        Self { pipeline }
    }

    /// Default pipeline with additional gazetteer places.
    pub fn with_extra_places<I, S>(places: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_known_names(places, Vec::<String>::new())
    }

    /// Default pipeline with additional places and additional carrier names,
    /// typically every airline in the reference table.
    pub fn with_known_names<P, PS, C, CS>(places: P, carriers: C) -> Self
    where
        P: IntoIterator<Item = PS>,
        PS: Into<String>,
        C: IntoIterator<Item = CS>,
        CS: Into<String>,
    {
        let mut place_stage = Gazetteer::with_defaults();
        for place in places {
            place_stage.add(place, EntityLabel::Gpe);
        }
        let mut carrier_stage = Gazetteer::carriers();
        for carrier in carriers {
            carrier_stage.add(carrier, EntityLabel::Other);
        }
        let pipeline = EntityPipeline::new()
            .with_stage(Arc::new(place_stage))
            .with_stage(Arc::new(carrier_stage))
            .with_stage(Arc::new(CapitalizedSpanRecognizer));
        Self { pipeline }
    }

    pub fn extract_route(&self, utterance: &str) -> Route {
        self.extract(utterance).route
    }

    pub fn extract(&self, utterance: &str) -> RouteExtraction {
        let codes = airport_codes(utterance);
        if !codes.is_empty() {
            return RouteExtraction {
                route: Route::from_locations(codes),
                tier: RouteTier::AirportCodes,
            };
        }

        let places = self
            .pipeline
            .recognize(utterance)
            .into_iter()
            .filter(|span| span.label == EntityLabel::Gpe)
            .map(|span| span.text)
            .collect::<Vec<_>>();
        if !places.is_empty() {
            return RouteExtraction {
                route: Route::from_locations(places),
                tier: RouteTier::NamedEntities,
            };
        }

        RouteExtraction {
            route: Route::empty(),
            tier: RouteTier::Unresolved,
        }
    }
}
