//! Navigation steps and the menu shown at each of them

use strum::{AsRefStr, Display, EnumString};

use educore::storage::FieldUpdate;
use educore::{AppResult, CatalogItem, ChatRecord, ChatUpdate, Store};

use crate::telegram::{OutboundMessage, ReplyKeyboard};

/// Where a chat is in the catalog walk.
///
/// The string form is what gets stored in the chat's `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Step {
    Stage,
    Term,
    Grade,
    Subject,
    #[strum(serialize = "option")]
    ContentOption,
    #[strum(serialize = "suboption")]
    Section,
}

impl Step {
    /// Step reached by picking an entry of this step's menu.
    pub fn next(self) -> Option<Step> {
        match self {
            Step::Stage => Some(Step::Term),
            Step::Term => Some(Step::Grade),
            Step::Grade => Some(Step::Subject),
            Step::Subject => Some(Step::ContentOption),
            Step::ContentOption => Some(Step::Section),
            Step::Section => None,
        }
    }

    /// Step the back button returns to.
    pub fn parent(self) -> Option<Step> {
        match self {
            Step::Stage => None,
            Step::Term => Some(Step::Stage),
            Step::Grade => Some(Step::Term),
            Step::Subject => Some(Step::Grade),
            Step::ContentOption => Some(Step::Subject),
            Step::Section => Some(Step::ContentOption),
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Step::Stage => "اختر المرحلة:",
            Step::Term => "اختر الفصل:",
            Step::Grade => "اختر الصف:",
            Step::Subject => "اختر المادة:",
            Step::ContentOption => "اختر نوع المحتوى:",
            Step::Section => "اختر القسم الفرعي:",
        }
    }

    /// Parses a stored status; anything unknown is `None`.
    pub fn from_status(status: &str) -> Option<Step> {
        status.parse().ok()
    }

    /// Index of the selection column this step fills, in
    /// stage/term/grade/subject/option order.
    fn depth(self) -> usize {
        match self {
            Step::Stage => 0,
            Step::Term => 1,
            Step::Grade => 2,
            Step::Subject => 3,
            Step::ContentOption => 4,
            Step::Section => 5,
        }
    }
}

/// Fields recording that `id` was picked at `step`: the matching selection
/// column is set, the deeper ones cleared, the status moved on.
pub fn descend(step: Step, id: i64) -> ChatUpdate {
    let mut fields = ChatUpdate::default();
    let depth = step.depth();
    let mut slots = [
        &mut fields.stage_id,
        &mut fields.term_id,
        &mut fields.grade_id,
        &mut fields.subject_id,
        &mut fields.option_id,
    ];
    for (index, slot) in slots.iter_mut().enumerate() {
        if index == depth {
            **slot = FieldUpdate::Set(id);
        } else if index > depth {
            **slot = FieldUpdate::Clear;
        }
    }
    fields.status = step.next().map(|next| next.to_string());
    fields
}

/// Entries of the menu for `step`, given what `chat` selected so far.
///
/// `None` when a selection the menu depends on is missing, which only
/// happens when a stored record is out of step with its status.
pub fn menu_items(store: &Store, step: Step, chat: &ChatRecord) -> AppResult<Option<Vec<CatalogItem>>> {
    let items = match step {
        Step::Stage => Some(store.stages()?),
        Step::Term => match chat.stage_id {
            Some(stage_id) => {
                // Second term on the right for right-to-left readers
                let mut terms = store.terms(stage_id)?;
                terms.reverse();
                Some(terms)
            }
            None => None,
        },
        Step::Grade => chat.term_id.map(|id| store.grades(id)).transpose()?,
        Step::Subject => chat.grade_id.map(|id| store.subjects(id)).transpose()?,
        Step::ContentOption => chat.subject_id.map(|id| store.options_for_subject(id)).transpose()?,
        Step::Section => match (chat.subject_id, chat.option_id) {
            (Some(subject_id), Some(option_id)) => Some(store.children_for(subject_id, option_id)?),
            _ => None,
        },
    };
    Ok(items)
}

/// The prompt for `step` with its entries as a reply keyboard.
pub fn render_menu(chat_id: i64, step: Step, items: Vec<CatalogItem>) -> OutboundMessage {
    OutboundMessage::text(chat_id, step.prompt()).with_keyboard(ReplyKeyboard::menu(items.into_iter().map(|i| i.name)))
}
