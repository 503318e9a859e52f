//! Integration tests for the catalog conversation, driven through the
//! production dispatcher
//!
//! Run with: cargo test -p edubot --test navigation_test

mod common;

use common::{seeded_store, text_update};
use edubot::navigation::{build_dispatcher, NO_CONTENT_REPLY, SECTION_NOT_FOUND_REPLY, UNKNOWN_COMMAND_REPLY};
use edubot::telegram::{OutboundMessage, BACK_BUTTON};
use edubot::Dispatcher;
use educore::{ChatUpdate, Store};
use pretty_assertions::assert_eq;

const CHAT: i64 = 777;

struct Conversation {
    dispatcher: Dispatcher,
    store: Store,
}

impl Conversation {
    fn new() -> Self {
        let store = seeded_store();
        Self {
            dispatcher: build_dispatcher(store.clone()),
            store,
        }
    }

    async fn say(&self, text: &str) -> Vec<OutboundMessage> {
        self.dispatcher.dispatch(&text_update(CHAT, text)).await
    }

    /// Sends `text` and returns the single reply's text and buttons.
    async fn menu(&self, text: &str) -> (String, Vec<String>) {
        let replies = self.say(text).await;
        assert_eq!(replies.len(), 1, "expected one reply to {:?}", text);
        let reply = &replies[0];
        let buttons = reply
            .keyboard
            .as_ref()
            .map(|k| k.buttons().map(str::to_string).collect())
            .unwrap_or_default();
        (reply.text.clone(), buttons)
    }

    fn status(&self) -> String {
        self.store.get_chat(CHAT).unwrap().unwrap().status
    }
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_full_walk_to_resources() {
    let chat = Conversation::new();

    let (text, buttons) = chat.menu("/start").await;
    assert_eq!(text, "اختر المرحلة:");
    assert_eq!(buttons, labels(&["الابتدائية", "المتوسطة", "الثانوية", BACK_BUTTON]));

    // Terms are listed last-first
    let (text, buttons) = chat.menu("الابتدائية").await;
    assert_eq!(text, "اختر الفصل:");
    assert_eq!(buttons, labels(&["الفصل الثاني", "الفصل الأول", BACK_BUTTON]));
    assert_eq!(chat.status(), "term");

    let (text, buttons) = chat.menu("الفصل الأول").await;
    assert_eq!(text, "اختر الصف:");
    assert_eq!(buttons, labels(&["الصف الأول", "الصف الثاني", BACK_BUTTON]));

    let (text, buttons) = chat.menu("الصف الأول").await;
    assert_eq!(text, "اختر المادة:");
    assert_eq!(buttons, labels(&["الرياضيات", "العلوم", BACK_BUTTON]));

    let (text, buttons) = chat.menu("الرياضيات").await;
    assert_eq!(text, "اختر نوع المحتوى:");
    assert_eq!(buttons, labels(&["مذكرات", "اختبارات", BACK_BUTTON]));
    assert_eq!(chat.status(), "option");

    let (text, buttons) = chat.menu("اختبارات").await;
    assert_eq!(text, "اختر القسم الفرعي:");
    assert_eq!(buttons, labels(&["فاينال", BACK_BUTTON]));
    assert_eq!(chat.status(), "suboption");

    let replies = chat.say("فاينال").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].html);
    assert_eq!(
        replies[0].text,
        "📘 <b>المحتوى المتاح:</b>\n\n📌 <b>فاينال 2024</b>\n🔗 https://example.com/final.pdf?year=2024&amp;term=1\n\n"
    );

    // Listing resources keeps the chat on the section menu
    let record = chat.store.get_chat(CHAT).unwrap().unwrap();
    assert_eq!(record.status, "suboption");
    assert!(record.stage_id.is_some());
    assert!(record.option_id.is_some());
    assert_eq!(record.username.as_deref(), Some("sara_k"));
    assert_eq!(record.first_name.as_deref(), Some("Sara"));
}

#[tokio::test]
async fn test_back_walks_up_each_step() {
    let chat = Conversation::new();
    for step in ["/start", "الابتدائية", "الفصل الأول", "الصف الأول", "الرياضيات", "مذكرات"] {
        chat.say(step).await;
    }
    assert_eq!(chat.status(), "suboption");

    let expected = [
        ("option", "اختر نوع المحتوى:"),
        ("subject", "اختر المادة:"),
        ("grade", "اختر الصف:"),
        ("term", "اختر الفصل:"),
        ("stage", "اختر المرحلة:"),
        // From the first step, back behaves like /start
        ("stage", "اختر المرحلة:"),
    ];
    for (status, prompt) in expected {
        let (text, _) = chat.menu(BACK_BUTTON).await;
        assert_eq!(text, prompt);
        assert_eq!(chat.status(), status);
    }
}

#[tokio::test]
async fn test_back_then_pick_again_uses_new_branch() {
    let chat = Conversation::new();
    for step in ["/start", "الابتدائية", "الفصل الأول"] {
        chat.say(step).await;
    }
    chat.say(BACK_BUTTON).await;
    chat.say(BACK_BUTTON).await;

    let (_, buttons) = chat.menu("المتوسطة").await;
    assert_eq!(buttons, labels(&["الفصل الأول", BACK_BUTTON]));

    let (_, buttons) = chat.menu("الفصل الأول").await;
    assert_eq!(buttons, labels(&["الصف السادس", BACK_BUTTON]));
}

#[tokio::test]
async fn test_unknown_name_is_ignored() {
    let chat = Conversation::new();
    chat.say("/start").await;
    chat.say("الابتدائية").await;

    // A grade name is not a term
    assert!(chat.say("الصف الأول").await.is_empty());
    assert_eq!(chat.status(), "term");

    let (text, _) = chat.menu("الفصل الأول").await;
    assert_eq!(text, "اختر الصف:");
}

#[tokio::test]
async fn test_names_are_scoped_to_the_current_selection() {
    let chat = Conversation::new();
    for step in ["/start", "المتوسطة", "الفصل الأول"] {
        chat.say(step).await;
    }

    // "الصف الأول" exists, but under the primary stage only
    assert!(chat.say("الصف الأول").await.is_empty());
    assert_eq!(chat.status(), "grade");
}

#[tokio::test]
async fn test_section_edge_cases() {
    let chat = Conversation::new();
    for step in ["/start", "الابتدائية", "الفصل الأول", "الصف الأول", "الرياضيات", "مذكرات"] {
        chat.say(step).await;
    }

    let replies = chat.say("قسم غير معروف").await;
    assert_eq!(replies[0].text, SECTION_NOT_FOUND_REPLY);

    let replies = chat.say("ملخصات").await;
    assert_eq!(replies[0].text, NO_CONTENT_REPLY);
    assert!(!replies[0].html);

    assert_eq!(chat.status(), "suboption");
}

#[tokio::test]
async fn test_unknown_chat_gets_start_flow() {
    let chat = Conversation::new();

    let (text, _) = chat.menu("مرحبا").await;

    assert_eq!(text, "اختر المرحلة:");
    assert_eq!(chat.status(), "stage");
}

#[tokio::test]
async fn test_start_resets_selection() {
    let chat = Conversation::new();
    for step in ["/start", "الابتدائية", "الفصل الأول", "الصف الأول"] {
        chat.say(step).await;
    }

    chat.say("/START").await;

    let record = chat.store.get_chat(CHAT).unwrap().unwrap();
    assert_eq!(record.status, "stage");
    assert_eq!(record.stage_id, None);
    assert_eq!(record.grade_id, None);
}

#[tokio::test]
async fn test_commands_other_than_start() {
    let chat = Conversation::new();

    let replies = chat.say("/help").await;
    assert!(replies[0].text.contains("/start"));

    let replies = chat.say("/settings").await;
    assert_eq!(replies[0].text, UNKNOWN_COMMAND_REPLY);
}

#[tokio::test]
async fn test_stale_selection_restarts() {
    let chat = Conversation::new();
    chat.store.upsert_chat(CHAT, &ChatUpdate::status("subject")).unwrap();

    let (text, _) = chat.menu("الرياضيات").await;

    assert_eq!(text, "اختر المرحلة:");
    assert_eq!(chat.status(), "stage");
}

#[tokio::test]
async fn test_chats_do_not_share_state() {
    let chat = Conversation::new();
    chat.say("/start").await;
    chat.say("الابتدائية").await;

    let other = chat.dispatcher.dispatch(&text_update(CHAT + 1, "/start")).await;
    assert_eq!(other[0].chat_id, CHAT + 1);

    assert_eq!(chat.status(), "term");
    assert_eq!(chat.store.get_chat(CHAT + 1).unwrap().unwrap().status, "stage");
}
