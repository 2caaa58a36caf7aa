//! End-to-end turns through the orchestrator with scripted collaborators.

use serde_json::Value;
use wingman::Persona;
use wingman::llm::{AssistantToolCall, Completion, Role};
use wingman::router::TurnOutcome;

use crate::helpers::{call, harness, harness_with, sample_config, switch_to};

const TRADE: &str = "TradeAndDevelopmentDivisionRequests";
const COMPANION: &str = "CoraInteractionRequests";

fn payload(body: &str) -> Value {
    serde_json::from_str(body).expect("tool result is JSON")
}

// ── Instant commands ──────────────────────────────────────────

#[tokio::test]
async fn instant_phrase_runs_without_model() {
    let mut h = harness(vec![]);
    let outcome = h.orchestrator.handle_transcript("go to port olisar").await;

    assert_eq!(
        outcome,
        TurnOutcome::Instant {
            command: "QuantumTravel".into(),
            response: "Plotting a course to Port Olisar".into(),
        }
    );
    assert!(h.transport.requests().is_empty());
    assert_eq!(h.keypress.names(), vec!["QuantumTravel"]);
    let lines = h.speech.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].1.voice, "nova");
    assert_eq!(h.orchestrator.session().messages().len(), 1);
}

#[tokio::test]
async fn silent_instant_command_presses_modifier_only_binding() {
    let mut h = harness(vec![]);
    let outcome = h.orchestrator.handle_transcript("Afterburner on").await;

    assert_eq!(
        outcome,
        TurnOutcome::Acknowledged {
            command: "Afterburner".into()
        }
    );
    let executed = h.keypress.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].strokes[0].modifiers, vec!["altleft"]);
    assert_eq!(executed[0].strokes[0].key, "shiftleft");
    assert!(h.speech.lines().is_empty());
    assert!(h.transport.requests().is_empty());
}

// ── Context switching ─────────────────────────────────────────

#[tokio::test]
async fn trade_question_switches_to_trade_division() {
    let mut h = harness(vec![
        switch_to("c1", TRADE),
        call(
            "c2",
            "find_best_trade_route_from_location",
            r#"{"location_name":"Lorville"}"#,
        ),
        Completion::text("Buy Medical Supplies in Lorville and sell them at Port Olisar."),
    ]);
    let transcript = "what's the best trade from Lorville";
    let outcome = h.orchestrator.handle_transcript(transcript).await;

    assert_eq!(
        outcome,
        TurnOutcome::ToolSummary {
            text: "Buy Medical Supplies in Lorville and sell them at Port Olisar.".into(),
            tool_calls: 2,
        }
    );

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].tool_names, vec!["execute_command", "switch_context"]);
    let companion_prompt = requests[0].messages[0].body().to_string();
    assert!(companion_prompt.contains("Mara"));

    // The trade division never sees the companion's system prompt.
    for request in &requests[1..] {
        assert!(request.messages.iter().all(|m| m.body() != companion_prompt));
        assert!(request.messages[0].body().contains("Trade and Development Division"));
        assert!(
            request
                .tool_names
                .contains(&"find_best_trade_route_from_location".to_string())
        );
    }
    assert!(
        h.orchestrator
            .session()
            .messages()
            .iter()
            .all(|m| m.body() != companion_prompt)
    );

    let second = &requests[1].messages;
    assert_eq!(second.len(), 4);
    assert_eq!(second[1].body(), transcript);
    assert!(second[2].has_tool_calls());
    assert!(second[3].body().starts_with("switched to context TradeAndDevelopmentDivisionRequests"));

    let trade_result = payload(requests[2].messages.last().expect("tool result").body());
    assert_eq!(trade_result["success"], true);
    assert_eq!(
        trade_result["trade_routes"][0]["sell_at_tradeport_name"],
        "Port Olisar"
    );

    let lines = h.speech.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].1.voice, "onyx");
    assert!(lines[0].1.effects.radio);

    let saved = h.orchestrator.switcher().store().get(Persona::Companion);
    assert_eq!(saved.map(|s| s.messages.len()), Some(1));
}

#[tokio::test]
async fn detour_through_trade_division_restores_companion_history() {
    let mut h = harness(vec![
        Completion::text("All systems nominal."),
        switch_to("s1", TRADE),
        Completion::text("Trade division, how can I help?"),
        switch_to("s2", COMPANION),
        call("g1", "execute_command", r#"{"command_name":"LandingGear"}"#),
    ]);

    let _ = h.orchestrator.handle_transcript("status report").await;
    let before = h.orchestrator.session().messages().to_vec();
    assert_eq!(before.len(), 3);

    let _ = h.orchestrator.handle_transcript("connect me to trading").await;
    assert_eq!(h.orchestrator.session().persona, Persona::TradeDivision);

    let outcome = h.orchestrator.handle_transcript("Cora, gear down please").await;
    assert_eq!(
        outcome,
        TurnOutcome::ToolSummary {
            text: "Gear down".into(),
            tool_calls: 2,
        }
    );

    let session = h.orchestrator.session();
    assert_eq!(session.persona, Persona::Companion);
    let messages = session.messages();
    assert_eq!(&messages[..before.len()], &before[..]);
    assert_eq!(messages.len(), before.len() + 5);
    assert_eq!(messages[3].body(), "Cora, gear down please");
    assert_eq!(messages[5].call_id(), Some("s2"));
    assert_eq!(messages[7].body(), "Gear down");

    let trade = h.orchestrator.switcher().store().get(Persona::TradeDivision);
    assert_eq!(trade.map(|s| s.messages.len()), Some(5));

    assert_eq!(h.keypress.names(), vec!["v_toggle_landing_gear"]);
    let last = h.speech.lines().pop().expect("gear reply spoken");
    assert_eq!(last.0, "Gear down");
    assert!(last.1.effects.robot);
}

#[tokio::test]
async fn second_switch_in_one_turn_is_refused() {
    let mut h = harness(vec![
        switch_to("s1", TRADE),
        switch_to("s2", COMPANION),
        Completion::text("Staying on the trade channel."),
    ]);
    let outcome = h.orchestrator.handle_transcript("trading, then back to Cora").await;

    assert_eq!(outcome.text(), Some("Staying on the trade channel."));
    assert_eq!(h.orchestrator.session().persona, Persona::TradeDivision);
    let requests = h.transport.requests();
    assert_eq!(requests.len(), 3);
    let refused = payload(requests[2].messages.last().expect("tool result").body());
    assert_eq!(refused["success"], false);
}

#[tokio::test]
async fn employee_switch_changes_trade_voice() {
    let mut h = harness(vec![
        switch_to("s1", TRADE),
        call("e1", "switch_tdd_employee", r#"{"employee_id":"echo"}"#),
        Completion::text("Vex here, Lorville office."),
    ]);
    let _ = h.orchestrator.handle_transcript("put me through to the Lorville office").await;

    let lines = h.speech.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].1.voice, "echo");
    assert_eq!(
        h.orchestrator.session().sub_role_voice(Persona::TradeDivision),
        Some("echo")
    );
}

// ── Tool dispatch ─────────────────────────────────────────────

#[tokio::test]
async fn sequential_calls_leave_contiguous_results() {
    let calls = vec![
        AssistantToolCall::new("a", "execute_command", r#"{"command_name":"Boost"}"#),
        AssistantToolCall::new(
            "b",
            "find_best_selling_location_for_commodity",
            r#"{"commodity_name":"Medical Supplies"}"#,
        ),
        AssistantToolCall::new("c", "execute_command", r#"{"command_name":"Boost"}"#),
    ];
    let mut h = harness(vec![
        Completion::tool_calls(calls),
        Completion::text("Boosted twice."),
    ]);
    let outcome = h.orchestrator.handle_transcript("boost, check meds, boost").await;

    assert_eq!(
        outcome,
        TurnOutcome::ToolSummary {
            text: "Boosted twice.".into(),
            tool_calls: 3,
        }
    );
    let requests = h.transport.requests();
    assert_eq!(requests.len(), 2);
    let messages = &requests[1].messages;
    let n = messages.len();
    assert_eq!(messages[n - 4].role, Role::Assistant);
    let ids: Vec<Option<&str>> = messages[n - 3..].iter().map(|m| m.call_id()).collect();
    assert_eq!(ids, vec![Some("a"), Some("b"), Some("c")]);
    assert_eq!(h.keypress.names(), vec!["v_afterburner", "v_afterburner"]);
    assert_eq!(h.speech.texts(), vec!["Boosted twice."]);
}

#[tokio::test]
async fn avoided_command_is_refused_and_announced() {
    let mut h = harness(vec![call(
        "x",
        "execute_command",
        r#"{"command_name":"v_self_destruct"}"#,
    )]);
    let outcome = h.orchestrator.handle_transcript("self destruct").await;

    assert_eq!(
        outcome,
        TurnOutcome::ToolSummary {
            text: "Command not allowed v_self_destruct".into(),
            tool_calls: 1,
        }
    );
    assert!(h.keypress.names().is_empty());
    let result = h
        .orchestrator
        .session()
        .messages()
        .last()
        .map(|m| payload(m.body()))
        .expect("tool result");
    assert_eq!(result["success"], false);
    assert_eq!(h.transport.requests().len(), 1);
}

#[tokio::test]
async fn keybinding_ack_is_not_spoken() {
    let mut h = harness(vec![call(
        "k",
        "execute_command",
        r#"{"command_name":"v_toggle_landing_gear"}"#,
    )]);
    let outcome = h.orchestrator.handle_transcript("toggle the gear").await;
    assert_eq!(outcome.text(), Some("Ok"));
    assert!(h.speech.lines().is_empty());
    assert_eq!(h.keypress.names(), vec!["v_toggle_landing_gear"]);
}

#[tokio::test]
async fn instant_commands_are_not_offered_to_the_model() {
    let mut h = harness(vec![Completion::text("Standing by.")]);
    let _ = h.orchestrator.handle_transcript("anything new").await;

    let requests = h.transport.requests();
    let tools = h.orchestrator.session().state.tools.clone();
    let execute = tools
        .iter()
        .find(|t| t.name == "execute_command")
        .expect("execute_command offered");
    let names: Vec<String> = execute.parameters["properties"]["command_name"]["enum"]
        .as_array()
        .expect("command enum")
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    assert!(names.contains(&"LandingGear".to_string()));
    assert!(names.contains(&"Boost".to_string()));
    assert!(!names.contains(&"QuantumTravel".to_string()));
    assert!(!names.contains(&"Afterburner".to_string()));
    assert_eq!(requests.len(), 1);
}

// ── Failures and retention ────────────────────────────────────

#[tokio::test]
async fn transport_failure_means_no_response() {
    let mut h = harness(vec![]);
    let outcome = h.orchestrator.handle_transcript("how much fuel is left").await;
    assert_eq!(outcome, TurnOutcome::NoResponse);
    assert!(h.speech.lines().is_empty());
    assert_eq!(h.transport.requests().len(), 1);
}

#[tokio::test]
async fn companion_history_stays_within_retention() {
    let replies = (0..14)
        .map(|i| Completion::text(format!("Reply {i}")))
        .collect();
    let mut h = harness(replies);
    for i in 0..14 {
        let _ = h.orchestrator.handle_transcript(&format!("question number {i}")).await;
    }

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 14);
    for request in &requests {
        assert!(request.messages.len() <= 2 * 10 + 2);
        assert_eq!(request.messages[0].role, Role::System);
    }
    let last = &requests[13].messages;
    assert_eq!(last.last().map(|m| m.body()), Some("question number 13"));
    assert_eq!(last[1].body(), "question number 3");
}

#[tokio::test]
async fn speak_responses_off_keeps_quiet() {
    let mut config = sample_config();
    config.features.speak_responses = false;
    let mut h = harness_with(config, vec![Completion::text("All quiet.")]);
    let outcome = h.orchestrator.handle_transcript("anything on radar").await;
    assert_eq!(outcome.text(), Some("All quiet."));
    assert!(h.speech.lines().is_empty());
}
