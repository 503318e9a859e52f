//! Navigation handlers: `/start`, `/help`, the back button, and picking
//! menu entries

use indoc::indoc;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;

use educore::{AppResult, CatalogItem, ChatRecord, ChatUpdate, Resource, Store};

use super::steps::{descend, menu_items, render_menu, Step};
use crate::dispatcher::{HandlerContext, HandlerResult};
use crate::telegram::{Command, OutboundMessage, TextUpdate};

pub const UNKNOWN_COMMAND_REPLY: &str = "لا أعرف هذا الأمر. أرسل /start للبدء.";
pub const SECTION_NOT_FOUND_REPLY: &str = "❌ القسم غير موجود!";
pub const NO_CONTENT_REPLY: &str = "❌ لا يوجد محتوى حتى الآن.";

const HELP_TEXT: &str = indoc! {"
    📚 تصفّح المحتوى التعليمي خطوة بخطوة:
    المرحلة ← الفصل ← الصف ← المادة ← نوع المحتوى ← القسم.

    اضغط على الأزرار للاختيار، وزر «رجوع ↩️» للعودة خطوة للخلف."};

/// `/start`: resets the walk and shows the stages.
pub async fn start(cx: HandlerContext, update: TextUpdate) -> HandlerResult {
    Ok(restart(&cx.store, &update)?)
}

pub async fn help(cx: HandlerContext, _update: TextUpdate) -> HandlerResult {
    let text = format!("{}\n\n{}", HELP_TEXT, Command::descriptions());
    Ok(vec![OutboundMessage::text(cx.chat_id, text)])
}

pub async fn unknown_command(cx: HandlerContext, update: TextUpdate) -> HandlerResult {
    log::debug!("Unknown command from chat {}: {}", cx.chat_id, update.text);
    Ok(vec![OutboundMessage::text(cx.chat_id, UNKNOWN_COMMAND_REPLY)])
}

/// Back button: one step up, or a restart from the first step.
pub async fn back(cx: HandlerContext, update: TextUpdate) -> HandlerResult {
    let store = &cx.store;
    let Some(chat) = store.get_chat(cx.chat_id)? else {
        return Ok(restart(store, &update)?);
    };
    let Some(parent) = Step::from_status(&chat.status).and_then(Step::parent) else {
        return Ok(restart(store, &update)?);
    };

    let fields = ChatUpdate::status(parent.to_string()).with_profile(update.username(), update.first_name());
    let chat = store.upsert_chat(cx.chat_id, &fields)?;
    Ok(show_menu(store, parent, &chat, &update)?)
}

/// Any other text: a pick from the menu of the chat's current step.
///
/// Text that names nothing in the current menu is ignored.
pub async fn select(cx: HandlerContext, update: TextUpdate) -> HandlerResult {
    let store = &cx.store;
    if store.get_chat(cx.chat_id)?.is_none() {
        return Ok(restart(store, &update)?);
    }
    let chat = store.upsert_chat(
        cx.chat_id,
        &ChatUpdate::default().with_profile(update.username(), update.first_name()),
    )?;
    let Some(step) = Step::from_status(&chat.status) else {
        log::warn!("Chat {} has unknown status '{}', restarting", chat.chat_id, chat.status);
        return Ok(restart(store, &update)?);
    };

    if step == Step::Section {
        return Ok(list_resources(store, &chat, &update)?);
    }

    let picked = match find_entry(store, step, &chat, &update.text)? {
        Lookup::Found(item) => item,
        Lookup::NotFound => return Ok(Vec::new()),
        Lookup::MissingSelection => return Ok(restart(store, &update)?),
    };
    let Some(next) = step.next() else {
        return Ok(Vec::new());
    };

    log::debug!("Chat {} picked '{}' at {}", chat.chat_id, picked.name, step);
    let chat = store.upsert_chat(chat.chat_id, &descend(step, picked.id))?;
    Ok(show_menu(store, next, &chat, &update)?)
}

enum Lookup {
    Found(CatalogItem),
    NotFound,
    MissingSelection,
}

impl From<Option<CatalogItem>> for Lookup {
    fn from(item: Option<CatalogItem>) -> Self {
        item.map_or(Lookup::NotFound, Lookup::Found)
    }
}

/// Looks `name` up among the children of the current selection.
fn find_entry(store: &Store, step: Step, chat: &ChatRecord, name: &str) -> AppResult<Lookup> {
    let lookup = match step {
        Step::Stage => store.stage_by_name(name)?.into(),
        Step::Term => match chat.stage_id {
            Some(id) => store.term_by_name(id, name)?.into(),
            None => Lookup::MissingSelection,
        },
        Step::Grade => match chat.term_id {
            Some(id) => store.grade_by_name(id, name)?.into(),
            None => Lookup::MissingSelection,
        },
        Step::Subject => match chat.grade_id {
            Some(id) => store.subject_by_name(id, name)?.into(),
            None => Lookup::MissingSelection,
        },
        Step::ContentOption => match chat.subject_id {
            Some(id) => store.option_by_name(id, name)?.into(),
            None => Lookup::MissingSelection,
        },
        Step::Section => match (chat.subject_id, chat.option_id) {
            (Some(subject_id), Some(option_id)) => store.child_by_name(subject_id, option_id, name)?.into(),
            _ => Lookup::MissingSelection,
        },
    };
    Ok(lookup)
}

fn list_resources(store: &Store, chat: &ChatRecord, update: &TextUpdate) -> AppResult<Vec<OutboundMessage>> {
    let (Some(subject_id), Some(option_id)) = (chat.subject_id, chat.option_id) else {
        return restart(store, update);
    };
    let Some(section) = store.child_by_name(subject_id, option_id, &update.text)? else {
        return Ok(vec![OutboundMessage::text(chat.chat_id, SECTION_NOT_FOUND_REPLY)]);
    };

    let resources = store.resources(subject_id, option_id, section.id)?;
    if resources.is_empty() {
        return Ok(vec![OutboundMessage::text(chat.chat_id, NO_CONTENT_REPLY)]);
    }
    Ok(vec![OutboundMessage::html(chat.chat_id, format_resources(&resources))])
}

/// Resource list as Telegram HTML.
pub fn format_resources(resources: &[Resource]) -> String {
    let mut text = String::from("📘 <b>المحتوى المتاح:</b>\n\n");
    for resource in resources {
        text.push_str(&format!(
            "📌 {}\n🔗 {}\n\n",
            html::bold(&html::escape(&resource.title)),
            html::escape(&resource.url)
        ));
    }
    text
}

fn show_menu(store: &Store, step: Step, chat: &ChatRecord, update: &TextUpdate) -> AppResult<Vec<OutboundMessage>> {
    match menu_items(store, step, chat)? {
        Some(items) => Ok(vec![render_menu(chat.chat_id, step, items)]),
        None => {
            log::warn!("Chat {} is at {} without a selection, restarting", chat.chat_id, step);
            restart(store, update)
        }
    }
}

fn restart(store: &Store, update: &TextUpdate) -> AppResult<Vec<OutboundMessage>> {
    let fields = ChatUpdate::status(Step::Stage.to_string())
        .with_profile(update.username(), update.first_name())
        .clear_selection();
    store.upsert_chat(update.chat_id, &fields)?;

    Ok(vec![render_menu(update.chat_id, Step::Stage, store.stages()?)])
}
