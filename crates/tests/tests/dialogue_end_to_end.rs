use std::path::PathBuf;
use std::sync::Arc;

use aero_agents::{build_controller, AirlineAgent, AppConfig, DialogueController};
use aero_core::replies::{MULTI_AIRLINE_TEMPLATES, NOT_ENOUGH_INFORMATION};
use aero_core::{AirlineSet, ChatInput, ConversationState, IntentTag, Route};
use aero_ml::TrainingReport;
use aero_observability::AppMetrics;
use aero_storage::Store;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

fn trained() -> (DialogueController, TrainingReport) {
    let config = AppConfig {
        template_seed: Some(42),
        ..AppConfig::with_data_dir(data_dir())
    };
    build_controller(&config, AppMetrics::shared()).expect("controller should build")
}

#[test]
fn training_report_covers_the_full_grid() {
    let (_, report) = trained();
    assert_eq!(report.tags.len(), 8);
    assert_eq!(report.folds, Some(6));
    assert_eq!(report.candidates.len(), 24);
    let accuracy = report.cv_accuracy.expect("cross-validated");
    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn airline_then_recommendation_with_the_trained_model() {
    let (controller, _) = trained();

    let first = controller
        .process_turn("I want to fly from SYD to MEL", &ConversationState::default())
        .unwrap();
    assert_eq!(first.tag, Some(IntentTag::from(IntentTag::AIRLINE)));
    let expected = MULTI_AIRLINE_TEMPLATES
        .iter()
        .map(|template| template.replace("{airlines}", "Qantas or Jetstar"))
        .collect::<Vec<_>>();
    assert!(expected.contains(&first.response), "{}", first.response);
    assert_eq!(
        first.state,
        ConversationState {
            route: Some(Route::from("SYD to MEL")),
            airlines: Some(["Qantas", "Jetstar"].into_iter().collect::<AirlineSet>()),
            last_tag: Some(IntentTag::from(IntentTag::AIRLINE)),
        }
    );

    let second = controller
        .process_turn("what do you recommend", &first.state)
        .unwrap();
    assert_eq!(second.tag, Some(IntentTag::from(IntentTag::RECOMMENDED_AIRLINES)));
    assert!(second.response.contains("Jetstar"), "{}", second.response);
    assert_eq!(second.state, first.state);
}

#[test]
fn silent_tag_never_yields_an_empty_reply() {
    let (controller, _) = trained();
    let result = controller
        .process_turn("What is the weather like?", &ConversationState::default())
        .unwrap();
    assert_eq!(result.response, NOT_ENOUGH_INFORMATION);
}

#[test]
fn every_reply_is_non_empty() {
    let (controller, _) = trained();
    for utterance in [
        "Hi",
        "asdf qwerty",
        "?",
        "Which airlines fly from SYD to LAX?",
        "Thanks a lot",
        "How much baggage can I bring?",
    ] {
        let result = controller
            .process_turn(utterance, &ConversationState::default())
            .unwrap();
        assert!(!result.response.trim().is_empty(), "{utterance}");
    }
}

#[tokio::test]
async fn sqlite_sessions_survive_an_agent_restart() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("sessions.db").display());

    let session_id = {
        let (controller, _) = trained();
        let store = Store::sqlite(&url).await.unwrap();
        let agent = AirlineAgent::new(Arc::new(controller), Arc::new(store), AppMetrics::shared());
        agent
            .handle_chat(ChatInput {
                session_id: None,
                text: "I want to fly from SYD to MEL".to_string(),
            })
            .await
            .unwrap()
            .session_id
    };

    let (controller, _) = trained();
    let store = Store::sqlite(&url).await.unwrap();
    let agent = AirlineAgent::new(Arc::new(controller), Arc::new(store), AppMetrics::shared());
    let reply = agent
        .handle_chat(ChatInput {
            session_id: Some(session_id),
            text: "what do you recommend".to_string(),
        })
        .await
        .unwrap();
    assert!(reply.message.contains("Jetstar"), "{}", reply.message);
}
