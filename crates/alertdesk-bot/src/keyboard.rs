//! Inline keyboards.

use alertdesk_core::Page;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::token::{SEPARATOR, Token};

/// A button carrying a workflow token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Text shown on the button.
    pub label: String,
    /// Stage prefix.
    pub prefix: String,
    /// Token fields.
    pub payload: String,
}

impl Button {
    /// Creates a button for `token`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::TooLong` if the token does not fit in callback
    /// data.
    pub fn new(label: impl Into<String>, token: &Token) -> Result<Self, TokenError> {
        token.encode()?;
        Ok(Self {
            label: label.into(),
            prefix: token.prefix().to_string(),
            payload: token.payload(),
        })
    }

    /// Callback data sent back when the button is pressed.
    #[must_use]
    pub fn data(&self) -> String {
        format!("{}{SEPARATOR}{}", self.prefix, self.payload)
    }
}

/// Rows of buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyboard {
    rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// An empty keyboard.
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Whether there are no buttons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// The rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Button>] {
        &self.rows
    }

    /// Appends a row, ignoring empty ones.
    pub fn push_row(&mut self, row: Vec<Button>) {
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    /// Appends `« Prev` / `Next »` buttons for a page, when there is
    /// anywhere to go.
    ///
    /// # Errors
    ///
    /// Returns an error if a page token does not fit.
    pub fn push_pagination<T>(
        &mut self,
        page: &Page<T>,
        token: impl Fn(usize) -> Token,
    ) -> Result<(), TokenError> {
        let mut row = Vec::new();
        if page.has_prev() {
            // Jump back into range from a stale page past the end.
            let prev = page.page.min(page.total_pages) - 1;
            row.push(Button::new("« Prev", &token(prev))?);
        }
        if page.has_next() {
            row.push(Button::new("Next »", &token(page.page.saturating_add(1)))?);
        }
        self.push_row(row);
        Ok(())
    }

    /// Removes every row holding a button whose payload equals `payload`.
    #[must_use]
    pub fn without_payload(&self, payload: &str) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| !row.iter().any(|b| b.payload == payload))
                .cloned()
                .collect(),
        }
    }
}

impl From<Vec<Vec<Button>>> for Keyboard {
    fn from(rows: Vec<Vec<Button>>) -> Self {
        let mut keyboard = Self::new();
        for row in rows {
            keyboard.push_row(row);
        }
        keyboard
    }
}
