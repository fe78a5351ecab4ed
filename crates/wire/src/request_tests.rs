// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

use super::*;

#[test]
fn envelope_round_trips() {
    let envelope = ToolEnvelope {
        session_id: SessionId::new("sess-1"),
        transport: TransportHint::Push,
        tool: "orchestrate".to_string(),
        arguments: serde_json::json!({"tasks": []}),
    };
    let json = serde_json::to_string(&Request::Invoke { envelope: envelope.clone() }).unwrap();
    assert!(json.contains("\"type\":\"Invoke\""));
    assert!(json.contains("\"transport\":\"push\""));
    let parsed: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, Request::Invoke { envelope });
}

#[test]
fn task_spec_defaults_are_lenient() {
    let spec: TaskSpec = serde_json::from_value(serde_json::json!({
        "title": "write parser",
        "type": "development",
    }))
    .unwrap();
    assert_eq!(spec.priority, TaskPriority::Medium);
    assert!(spec.depends_on.is_empty());
    assert!(spec.required_capabilities.is_empty());
}

#[test]
fn heartbeat_optional_fields_are_omitted() {
    let request = Request::Heartbeat {
        agent_id: AgentId::new("agent-1"),
        activity: None,
        progress: None,
        expected_duration_ms: None,
    };
    let json = serde_json::to_string(&request).unwrap();
    assert!(!json.contains("activity"));
    assert!(!json.contains("progress"));
}

#[test]
fn unknown_request_type_fails_parse() {
    let result: Result<Request, _> =
        serde_json::from_str(r#"{"type": "MakeCoffee", "sugar": true}"#);
    assert!(result.is_err());
}
