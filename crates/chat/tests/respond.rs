#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use {
    axum::{Router, http::StatusCode, routing::post},
    hinata_chat::ConversationSession,
    hinata_config::ChatConfig,
    secrecy::Secret,
    serde_json::{Value, json},
};

/// OpenRouter stand-in. Replies with the number of messages it received,
/// or 500 when the last message mentions "outage".
async fn start_openrouter_mock() -> (String, Arc<Mutex<Vec<Value>>>) {
    let bodies: Arc<Mutex<Vec<Value>>> = Arc::default();
    let captured = Arc::clone(&bodies);
    let app = Router::new().route(
        "/chat/completions",
        post(move |body: axum::Json<Value>| {
            let captured = Arc::clone(&captured);
            async move {
                let messages = body.0["messages"].as_array().cloned().unwrap_or_default();
                captured.lock().unwrap().push(body.0);
                let last = messages
                    .last()
                    .and_then(|m| m["content"].as_str())
                    .unwrap_or_default()
                    .to_string();
                if last.contains("outage") {
                    return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(json!({"error": "down"})));
                }
                let reply = format!("saw {} messages", messages.len());
                (
                    StatusCode::OK,
                    axum::Json(json!({"choices": [{"message": {"content": reply}}]})),
                )
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), bodies)
}

fn config(base: String) -> ChatConfig {
    ChatConfig {
        api_key: Some(Secret::new("sk-or-test".into())),
        base_url: base,
        history_limit: 4,
        ..ChatConfig::default()
    }
}

#[tokio::test]
async fn conversation_grows_then_trims() {
    let (base, bodies) = start_openrouter_mock().await;
    let session = ConversationSession::from_config(&config(base));
    session.activate(100);

    assert_eq!(session.respond("hi", 100, "Hinata fan").await.unwrap(), "saw 2 messages");
    assert_eq!(session.respond("again", 100, "Hinata fan").await.unwrap(), "saw 4 messages");
    // History is capped at 4 turns, plus the system preamble.
    assert_eq!(session.respond("third", 100, "Hinata fan").await.unwrap(), "saw 5 messages");

    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies[0]["model"], "google/gemma-3n-e4b-it:free");
    assert_eq!(bodies[0]["messages"][1]["content"], "Hinata fan: hi");
    assert_eq!(bodies[2]["messages"][0]["role"], "system");
    assert_eq!(session.history(100).len(), 4);
}

#[tokio::test]
async fn provider_outage_degrades_to_canned_reply() {
    let (base, _) = start_openrouter_mock().await;
    let cfg = config(base);
    let session = ConversationSession::from_config(&cfg);

    let reply = session.respond("is there an outage?", 5, "Kiba").await.unwrap();

    assert_eq!(reply, cfg.failure_reply);
    assert_eq!(session.history(5).len(), 1);
}

#[tokio::test]
async fn without_key_nothing_is_sent() {
    let (base, bodies) = start_openrouter_mock().await;
    let mut cfg = config(base);
    cfg.api_key = None;
    let session = ConversationSession::from_config(&cfg);

    let err = session.respond("hi", 1, "Shino").await.unwrap_err();

    assert_eq!(err.to_string(), cfg.unconfigured_reply);
    assert!(bodies.lock().unwrap().is_empty());
}
