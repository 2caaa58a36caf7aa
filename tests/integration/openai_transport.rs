//! OpenAI transport against a mock HTTP server.

use std::sync::Arc;

use serde_json::{Value, json};
use wingman::llm::{
    LlmError, LlmTransport, Message, ModelRef, OpenAiConfig, OpenAiTransport, ToolDefinition,
};
use wingman::router::commands::CommandRunner;
use wingman::router::{ToolCallDispatcher, TurnOrchestrator, TurnOutcome};
use wingman::services::keybindings::KeybindingCatalog;
use wingman::services::keypress::DryRunKeypress;
use wingman::services::trading::PriceTable;
use wingman::Persona;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{RecordingSpeech, SAMPLE_PRICES, sample_config};

fn transport(server: &MockServer) -> OpenAiTransport {
    OpenAiTransport::new(OpenAiConfig::new("sk-test").with_base_url(server.uri()))
        .expect("transport builds")
}

fn text_reply(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    })
}

fn tool_reply(id: &str, name: &str, arguments: &str) -> Value {
    json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": { "name": name, "arguments": arguments }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.body_json::<Value>().expect("request body is JSON"))
        .collect()
}

// ── Transport ─────────────────────────────────────────────────

#[tokio::test]
async fn text_completion_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Hello, Commander.")))
        .expect(1)
        .mount(&server)
        .await;

    let tools = vec![ToolDefinition::new(
        "switch_context",
        "The context of the player request",
        json!({"type": "object", "properties": {}}),
    )];
    let completion = transport(&server)
        .ask(
            &[Message::system("sys"), Message::user("hello")],
            &tools,
            &ModelRef::new("gpt-4o-mini"),
        )
        .await
        .expect("completion");

    assert_eq!(completion.message.body(), "Hello, Commander.");
    assert_eq!(completion.model.as_deref(), Some("gpt-4o-mini"));

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["model"], "gpt-4o-mini");
    assert_eq!(bodies[0]["messages"][1]["content"], "hello");
    assert_eq!(bodies[0]["tools"][0]["function"]["name"], "switch_context");
    assert_eq!(bodies[0]["tool_choice"], "auto");
}

#[tokio::test]
async fn tool_call_completion_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_reply(
            "call_1",
            "execute_command",
            r#"{"command_name":"LandingGear"}"#,
        )))
        .mount(&server)
        .await;

    let completion = transport(&server)
        .ask(&[Message::user("gear")], &[], &ModelRef::new("gpt-4o-mini"))
        .await
        .expect("completion");
    let calls = completion.requested_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call_id, "call_1");
    assert_eq!(calls[0].function_name, "execute_command");
}

#[tokio::test]
async fn http_errors_map_to_llm_errors() {
    for (status, check) in [
        (401_u16, "AUTH_FAILED"),
        (429, "REQUEST_FAILED"),
        (503, "PROVIDER_ERROR"),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({"error": {"message": "nope"}})),
            )
            .mount(&server)
            .await;

        let err = transport(&server)
            .ask(&[Message::user("hi")], &[], &ModelRef::new("gpt-4o-mini"))
            .await
            .expect_err("error status");
        assert_eq!(err.code(), check);
        assert!(err.message().contains("nope"));
    }
}

#[tokio::test]
async fn malformed_body_is_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = transport(&server)
        .ask(&[Message::user("hi")], &[], &ModelRef::new("gpt-4o-mini"))
        .await
        .expect_err("invalid body");
    assert!(matches!(err, LlmError::ResponseError(_)));
}

// ── Full turn over HTTP ───────────────────────────────────────

#[tokio::test]
async fn orchestrator_switches_context_over_http() {
    let server = MockServer::start().await;
    // Responses are served in mount order, each one used once.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_reply(
            "call_switch",
            "switch_context",
            r#"{"context_name":"TradeAndDevelopmentDivisionRequests"}"#,
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(text_reply("Medical Supplies to Port Olisar.")),
        )
        .mount(&server)
        .await;

    let config = Arc::new(sample_config());
    let prices = PriceTable::from_toml_str(SAMPLE_PRICES).expect("prices parse");
    let catalog = Arc::new(KeybindingCatalog::new(&config.keybindings, &config.avoid_commands));
    let runner = CommandRunner::new(Arc::new(DryRunKeypress), catalog);
    let dispatcher = ToolCallDispatcher::new(Arc::clone(&config), Arc::new(prices), runner);
    let speech = Arc::new(RecordingSpeech::default());
    let mut orchestrator =
        TurnOrchestrator::new(config, Arc::new(transport(&server)), speech.clone(), dispatcher);

    let outcome = orchestrator
        .handle_transcript("what's the best trade from Lorville")
        .await;
    assert_eq!(
        outcome,
        TurnOutcome::ToolSummary {
            text: "Medical Supplies to Port Olisar.".into(),
            tool_calls: 1,
        }
    );
    assert_eq!(orchestrator.session().persona, Persona::TradeDivision);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    let second = bodies[1]["messages"].as_array().expect("messages");
    assert_eq!(second.len(), 4);
    assert_eq!(second[0]["role"], "system");
    assert_eq!(second[2]["tool_calls"][0]["id"], "call_switch");
    assert_eq!(second[3]["role"], "tool");
    assert_eq!(second[3]["tool_call_id"], "call_switch");
    assert_eq!(speech.texts(), vec!["Medical Supplies to Port Olisar."]);
}
