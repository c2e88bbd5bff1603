mod config;
mod controller;
mod gate;

use std::sync::Arc;
use std::time::Instant;

use aero_core::{ChatInput, ChatReply, ConversationSession, ConversationState, ConversationTurn};
use aero_observability::AppMetrics;
use aero_storage::SessionRepository;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub use config::{build_controller, AppConfig};
pub use controller::DialogueController;
pub use gate::{SessionGate, SessionPermit};

/// Most recent turns kept per session.
pub const MAX_HISTORY_TURNS: usize = 40;

/// Session-aware front of the dialogue controller: loads the caller's state,
/// runs the turn under that session's lock and stores the outcome.
pub struct AirlineAgent<S>
where
    S: SessionRepository,
{
    controller: Arc<DialogueController>,
    store: Arc<S>,
    gate: SessionGate,
    metrics: Arc<AppMetrics>,
    session_ttl: Duration,
}

impl<S> Clone for AirlineAgent<S>
where
    S: SessionRepository,
{
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            store: self.store.clone(),
            gate: self.gate.clone(),
            metrics: self.metrics.clone(),
            session_ttl: self.session_ttl,
        }
    }
}

impl<S> AirlineAgent<S>
where
    S: SessionRepository,
{
    pub fn new(controller: Arc<DialogueController>, store: Arc<S>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            controller,
            store,
            gate: SessionGate::new(),
            metrics,
            session_ttl: Duration::hours(24),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn controller(&self) -> &DialogueController {
        &self.controller
    }

    /// Handles one message. A missing session id starts a new session.
    ///
    /// Empty input fails with [`aero_core::TurnError::EmptyInput`] and touches
    /// nothing. The dialogue step runs on the blocking pool, and the stored
    /// session is only written after it completes, so dropping this future
    /// early leaves the previous state in place.
    #[instrument(skip(self, input))]
    pub async fn handle_chat(&self, input: ChatInput) -> Result<ChatReply> {
        let started = Instant::now();
        self.metrics.inc_turn();

        let session_id = input
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let _turn_guard = self.gate.acquire(&session_id).await;

        let mut session = self
            .store
            .load_session(&session_id)
            .await?
            .filter(|session| session.expires_at > Utc::now())
            .unwrap_or_else(|| ConversationSession {
                session_id: session_id.clone(),
                state: ConversationState::default(),
                expires_at: Utc::now() + self.session_ttl,
                turns: Vec::new(),
            });

        let turn = {
            let controller = self.controller.clone();
            let text = input.text.clone();
            let state = session.state.clone();
            tokio::task::spawn_blocking(move || controller.process_turn(&text, &state))
                .await
                .context("dialogue step did not complete")??
        };

        session.state = turn.state;
        session.expires_at = Utc::now() + self.session_ttl;
        session.turns.push(ConversationTurn {
            at: Utc::now(),
            user_text: input.text.trim().to_string(),
            assistant_text: turn.response.clone(),
            tag: turn.tag.clone(),
        });
        if session.turns.len() > MAX_HISTORY_TURNS {
            let keep_from = session.turns.len() - MAX_HISTORY_TURNS;
            session.turns = session.turns.split_off(keep_from);
        }

        self.store.upsert_session(&session).await?;

        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %session_id,
            tag = ?turn.tag,
            route = ?session.state.route,
            "chat handled"
        );

        Ok(ChatReply {
            session_id,
            message: turn.response,
            tag: turn.tag,
        })
    }

    pub async fn load_session(&self, session_id: &str) -> Result<Option<ConversationSession>> {
        self.store.load_session(session_id).await
    }

    /// Discards the session's state and history.
    pub async fn end_session(&self, session_id: &str) -> Result<bool> {
        let removed = {
            let _turn_guard = self.gate.acquire(session_id).await;
            self.store.delete_session(session_id).await?
        };
        info!(session_id, removed, "session ended");
        Ok(removed)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        self.store.purge_expired(Utc::now()).await
    }

    /// Purges expired sessions every `every` until the future is dropped.
    pub async fn run_session_purge(&self, every: std::time::Duration) {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match self.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "expired sessions purged"),
                Err(err) => warn!(error = ?err, "session purge failed"),
            }
        }
    }
}
