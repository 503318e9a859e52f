//! Test fixtures: a small catalog, seeded stores and a running gateway

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use edubot::gateway::{serve, Gateway};
use edubot::navigation::build_dispatcher;
use edubot::telegram::Update;
use educore::storage::CatalogSeed;
use educore::Store;

use super::RecordingSender;

pub const SMALL_CATALOG: &str = r#"{
  "stages": [
    {"name": "الابتدائية", "terms": [
      {"name": "الفصل الأول", "grades": [
        {"name": "الصف الأول", "subjects": [
          {"name": "الرياضيات", "options": [
            {"name": "مذكرات", "sections": [
              {"name": "المذكرة الشاملة", "resources": [
                {"title": "مذكرة الرياضيات", "url": "https://example.com/math.pdf"}
              ]},
              {"name": "ملخصات", "resources": []}
            ]},
            {"name": "اختبارات", "sections": [
              {"name": "فاينال", "resources": [
                {"title": "فاينال 2024", "url": "https://example.com/final.pdf?year=2024&term=1"}
              ]}
            ]}
          ]},
          {"name": "العلوم", "options": []}
        ]},
        {"name": "الصف الثاني", "subjects": []}
      ]},
      {"name": "الفصل الثاني", "grades": [
        {"name": "الصف الأول", "subjects": []}
      ]}
    ]},
    {"name": "المتوسطة", "terms": [
      {"name": "الفصل الأول", "grades": [
        {"name": "الصف السادس", "subjects": []}
      ]}
    ]},
    {"name": "الثانوية", "terms": []}
  ]
}"#;

/// In-memory store holding [`SMALL_CATALOG`].
pub fn seeded_store() -> Store {
    let store = Store::in_memory().unwrap();
    store
        .seed_catalog(&CatalogSeed::from_json_str(SMALL_CATALOG).unwrap())
        .unwrap();
    store
}

/// Text message update from a user with a profile.
pub fn text_update(chat_id: i64, text: &str) -> Update {
    serde_json::from_value(serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 10,
            "chat": {"id": chat_id, "type": "private"},
            "from": {"id": chat_id, "is_bot": false, "first_name": "Sara", "username": "sara_k"},
            "text": text
        }
    }))
    .unwrap()
}

/// Gateway served on an ephemeral local port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub store: Store,
    pub sender: Arc<RecordingSender>,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestGateway {
    pub async fn start(store: Store, secret: Option<&str>) -> Self {
        let sender = Arc::new(RecordingSender::new());
        let dispatcher = Arc::new(build_dispatcher(store.clone()));
        let mut gateway = Gateway::new(dispatcher, sender.clone());
        if let Some(secret) = secret {
            gateway = gateway.with_secret(SecretString::from(secret.to_string()));
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, gateway.router(), async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            store,
            sender,
            client: reqwest::Client::new(),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_webhook(&self, body: impl Into<reqwest::Body>) -> reqwest::Response {
        self.client
            .post(self.url("/webhook"))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_webhook_with_secret(&self, body: impl Into<reqwest::Body>, secret: &str) -> reqwest::Response {
        self.client
            .post(self.url("/webhook"))
            .header("Content-Type", "application/json")
            .header("X-Telegram-Bot-Api-Secret-Token", secret)
            .body(body)
            .send()
            .await
            .unwrap()
    }

    /// Stops the server and waits for it to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
    }
}
