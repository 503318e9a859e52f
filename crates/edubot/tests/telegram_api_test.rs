//! Bot API calls made by the sender and the webhook bootstrap, checked
//! against a mock Telegram server
//!
//! Run with: cargo test -p edubot --test telegram_api_test

use std::collections::HashMap;

use edubot::telegram::{create_bot, register_webhook, MessageSender, OutboundMessage, ReplyKeyboard, TelegramSender};
use educore::Config;
use serde_json::Value;
use wiremock::matchers::{body_string_contains, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_telegram() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("^/bot[^/]+/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "result": true})))
        .mount(&server)
        .await;
    server
}

fn config_for(server: &MockServer, extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("BOT_TOKEN".to_string(), "123456:TEST".to_string()),
        ("BOT_API_URL".to_string(), server.uri()),
    ]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// Raw bodies of the requests whose path ends with `api_method` (any case).
async fn raw_calls(server: &MockServer, api_method: &str) -> Vec<Vec<u8>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().to_lowercase().ends_with(&api_method.to_lowercase()))
        .map(|r| r.body)
        .collect()
}

/// JSON bodies of the requests whose path ends with `api_method`.
async fn calls(server: &MockServer, api_method: &str) -> Vec<Value> {
    raw_calls(server, api_method)
        .await
        .iter()
        .map(|body| serde_json::from_slice(body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_sender_posts_send_message_with_keyboard_and_html() {
    let server = mock_telegram().await;
    let bot = create_bot(&config_for(&server, &[])).unwrap();
    let sender = TelegramSender::new(bot);

    let message = OutboundMessage::html(42, "<b>hi</b>").with_keyboard(ReplyKeyboard::menu(["أ", "ب", "ج"]));
    // The canned response is not a Message, so only the request is checked
    let _ = sender.send(&message).await;

    let bodies = calls(&server, "/sendmessage").await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["chat_id"], 42);
    assert_eq!(body["text"], "<b>hi</b>");
    assert_eq!(body["parse_mode"], "HTML");
    assert_eq!(body["reply_markup"]["resize_keyboard"], true);
    assert_eq!(body["reply_markup"]["keyboard"].as_array().unwrap().len(), 3);
    assert_eq!(body["reply_markup"]["keyboard"][2][0]["text"], "رجوع ↩️");
}

#[tokio::test]
async fn test_plain_message_has_no_parse_mode() {
    let server = mock_telegram().await;
    let sender = TelegramSender::new(create_bot(&config_for(&server, &[])).unwrap());

    let _ = sender.send(&OutboundMessage::text(7, "a < b")).await;

    let bodies = calls(&server, "/sendmessage").await;
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].get("parse_mode").is_none());
    assert!(bodies[0].get("reply_markup").is_none());
}

#[tokio::test]
async fn test_register_webhook_sends_url_and_secret() {
    let server = mock_telegram().await;
    let config = config_for(
        &server,
        &[("APP_URL", "https://edu.example.com"), ("WEBHOOK_SECRET", "s3cret")],
    );
    let bot = create_bot(&config).unwrap();

    register_webhook(&bot, &config).await.unwrap();

    // setWebhook goes out as multipart/form-data, one part per field
    let bodies = raw_calls(&server, "/setwebhook").await;
    assert_eq!(bodies.len(), 1);
    let form = String::from_utf8_lossy(&bodies[0]);
    assert!(form.contains(r#"name="url""#), "form: {}", form);
    assert!(form.contains("https://edu.example.com/webhook"), "form: {}", form);
    assert!(form.contains(r#"name="secret_token""#), "form: {}", form);
    assert!(form.contains("s3cret"), "form: {}", form);
}

#[tokio::test]
async fn test_register_webhook_matches_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("(?i)^/bot[^/]+/setwebhook$"))
        .and(body_string_contains("https://edu.example.com/webhook"))
        .and(body_string_contains("s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "result": true})))
        .expect(1)
        .mount(&server)
        .await;
    let config = config_for(
        &server,
        &[("APP_URL", "https://edu.example.com"), ("WEBHOOK_SECRET", "s3cret")],
    );
    let bot = create_bot(&config).unwrap();

    register_webhook(&bot, &config).await.unwrap();

    server.verify().await;
}
