//! Workflow tokens.
//!
//! Every button carries a `prefix|field|field...` string of at most
//! [`MAX_TOKEN_LEN`] bytes. The prefix names the workflow stage; the fields
//! carry just enough to redo the stage against fresh backend state. Nothing
//! is stored server-side.

use std::fmt;
use std::time::Duration;

use alertdesk_core::{format_duration, normalize, parse_duration};

use crate::error::TokenError;

/// Longest callback data a chat button can carry.
pub const MAX_TOKEN_LEN: usize = 64;

/// Field separator.
pub const SEPARATOR: char = '|';

/// Stage prefixes.
pub mod prefix {
    /// Alerts page.
    pub const ALERTS_PAGE: &str = "al_p";
    /// Silences page of one manager.
    pub const SILENCES_PAGE: &str = "sl_p";
    /// Dashboards page.
    pub const DASHBOARDS_PAGE: &str = "db_p";
    /// Choose the alert instance to silence.
    pub const CHOOSE_ALERT: &str = "sil_a";
    /// Confirm a silence duration for one instance.
    pub const CONFIRM_SILENCE: &str = "sil_d";
    /// Expire a silence.
    pub const UNSILENCE: &str = "unsil";
    /// Drop the follow-up buttons of a created silence.
    pub const CLEAR: &str = "clr";
}

/// A decoded workflow token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `al_p|<page>`
    AlertsPage {
        /// Zero-based page.
        page: usize,
    },
    /// `sl_p|<manager index>|<page>`
    SilencesPage {
        /// Index into the silence manager table.
        manager: usize,
        /// Zero-based page.
        page: usize,
    },
    /// `db_p|<page>|<normalized query>`
    DashboardsPage {
        /// Zero-based page.
        page: usize,
        /// Normalized title filter, possibly empty.
        query: String,
    },
    /// `sil_a|<normalized rule name>`
    ChooseAlert {
        /// Normalized `group + rule` name, possibly truncated.
        query: String,
    },
    /// `sil_d|<duration>|<fingerprint>`
    ConfirmSilence {
        /// Silence length.
        duration: Duration,
        /// Alert instance fingerprint.
        fingerprint: String,
    },
    /// `unsil|<silence id>|<matching alerts>`
    Unsilence {
        /// Silence ID.
        id: String,
        /// Alerts matched when the button was drawn.
        count: usize,
    },
    /// `clr|<silence id>|<matching alerts>`
    Clear {
        /// Silence ID.
        id: String,
        /// Alerts matched when the button was drawn.
        count: usize,
    },
}

/// Truncates an ASCII-normalized query so the encoded token fits.
fn fit_query(prefix: &str, fixed: usize, query: &str) -> String {
    let mut query = normalize(query);
    let room = MAX_TOKEN_LEN.saturating_sub(prefix.len() + 1 + fixed);
    query.truncate(room);
    query
}

impl Token {
    /// Choose-alert token for a rule, truncating the name to fit.
    ///
    /// A truncated name is a prefix of the full one, so substring lookup
    /// still finds the rule.
    #[must_use]
    pub fn choose_alert(name: &str) -> Self {
        Self::ChooseAlert {
            query: fit_query(prefix::CHOOSE_ALERT, 0, name),
        }
    }

    /// Dashboards page token, truncating the query to fit.
    #[must_use]
    pub fn dashboards_page(page: usize, query: &str) -> Self {
        let fixed = page.to_string().len() + 1;
        Self::DashboardsPage {
            page,
            query: fit_query(prefix::DASHBOARDS_PAGE, fixed, query),
        }
    }

    /// Stage prefix.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::AlertsPage { .. } => prefix::ALERTS_PAGE,
            Self::SilencesPage { .. } => prefix::SILENCES_PAGE,
            Self::DashboardsPage { .. } => prefix::DASHBOARDS_PAGE,
            Self::ChooseAlert { .. } => prefix::CHOOSE_ALERT,
            Self::ConfirmSilence { .. } => prefix::CONFIRM_SILENCE,
            Self::Unsilence { .. } => prefix::UNSILENCE,
            Self::Clear { .. } => prefix::CLEAR,
        }
    }

    /// Fields after the prefix, joined by [`SEPARATOR`].
    #[must_use]
    pub fn payload(&self) -> String {
        match self {
            Self::AlertsPage { page } => page.to_string(),
            Self::SilencesPage { manager, page } => format!("{manager}{SEPARATOR}{page}"),
            Self::DashboardsPage { page, query } => format!("{page}{SEPARATOR}{query}"),
            Self::ChooseAlert { query } => query.clone(),
            Self::ConfirmSilence {
                duration,
                fingerprint,
            } => format!("{}{SEPARATOR}{fingerprint}", format_duration(*duration)),
            Self::Unsilence { id, count } | Self::Clear { id, count } => {
                format!("{id}{SEPARATOR}{count}")
            }
        }
    }

    /// Encodes the token, checking the length limit.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::TooLong` if the encoded form exceeds
    /// [`MAX_TOKEN_LEN`] bytes.
    pub fn encode(&self) -> Result<String, TokenError> {
        let encoded = format!("{}{SEPARATOR}{}", self.prefix(), self.payload());
        if encoded.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong {
                len: encoded.len(),
                max: MAX_TOKEN_LEN,
            });
        }
        Ok(encoded)
    }

    /// Parses `prefix|payload` callback data.
    ///
    /// # Errors
    ///
    /// Returns an error for oversized data, an unknown prefix or a payload
    /// that does not fit the prefix.
    pub fn parse(data: &str) -> Result<Self, TokenError> {
        if data.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong {
                len: data.len(),
                max: MAX_TOKEN_LEN,
            });
        }
        let (prefix, payload) = data
            .split_once(SEPARATOR)
            .ok_or_else(|| TokenError::Malformed(data.to_string()))?;
        Self::decode(prefix, payload)
    }

    /// Decodes a token from its prefix and payload.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown prefix or a payload that does not fit
    /// the prefix.
    pub fn decode(prefix: &str, payload: &str) -> Result<Self, TokenError> {
        match prefix {
            prefix::ALERTS_PAGE => Ok(Self::AlertsPage {
                page: number("page", payload)?,
            }),
            prefix::SILENCES_PAGE => {
                let (manager, page) = two_fields(payload)?;
                Ok(Self::SilencesPage {
                    manager: number("manager", manager)?,
                    page: number("page", page)?,
                })
            }
            prefix::DASHBOARDS_PAGE => {
                let (page, query) = two_fields(payload)?;
                Ok(Self::DashboardsPage {
                    page: number("page", page)?,
                    query: query.to_string(),
                })
            }
            prefix::CHOOSE_ALERT => Ok(Self::ChooseAlert {
                query: payload.to_string(),
            }),
            prefix::CONFIRM_SILENCE => {
                let (duration, fingerprint) = two_fields(payload)?;
                let duration = parse_duration(duration).map_err(|_| TokenError::InvalidField {
                    field: "duration",
                    value: duration.to_string(),
                })?;
                Ok(Self::ConfirmSilence {
                    duration,
                    fingerprint: non_empty("fingerprint", fingerprint)?,
                })
            }
            prefix::UNSILENCE | prefix::CLEAR => {
                let (id, count) = two_fields(payload)?;
                let id = non_empty("id", id)?;
                let count = number("count", count)?;
                Ok(if prefix == prefix::UNSILENCE {
                    Self::Unsilence { id, count }
                } else {
                    Self::Clear { id, count }
                })
            }
            other => Err(TokenError::UnknownPrefix(other.to_string())),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.prefix(), self.payload())
    }
}

fn two_fields(payload: &str) -> Result<(&str, &str), TokenError> {
    payload
        .split_once(SEPARATOR)
        .ok_or_else(|| TokenError::Malformed(payload.to_string()))
}

fn number(field: &'static str, raw: &str) -> Result<usize, TokenError> {
    raw.parse().map_err(|_| TokenError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

fn non_empty(field: &'static str, raw: &str) -> Result<String, TokenError> {
    if raw.is_empty() {
        return Err(TokenError::InvalidField {
            field,
            value: String::new(),
        });
    }
    Ok(raw.to_string())
}
