//! Reply keyboards
//!
//! Menus are sent as persistent reply keyboards (not inline buttons): the
//! button text comes back to the bot as a plain message, which is what the
//! navigation handler matches on.

use teloxide::types::{KeyboardButton, KeyboardMarkup};

/// Label of the back button, always alone on the last row.
pub const BACK_BUTTON: &str = "رجوع ↩️";

/// Buttons per row.
const ROW_WIDTH: usize = 2;

/// Rows of button labels, independent of the Telegram types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    /// Lays `options` out two per row and appends the back button row.
    pub fn menu<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        let mut rows: Vec<Vec<String>> = options.chunks(ROW_WIDTH).map(<[String]>::to_vec).collect();
        rows.push(vec![BACK_BUTTON.to_string()]);
        Self { rows }
    }

    /// Every label, row by row.
    pub fn buttons(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }

    pub fn to_markup(&self) -> KeyboardMarkup {
        KeyboardMarkup::new(
            self.rows
                .iter()
                .map(|row| row.iter().map(|label| KeyboardButton::new(label.clone())).collect::<Vec<_>>()),
        )
        .resize_keyboard()
    }
}
