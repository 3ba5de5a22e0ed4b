//! Alerting domain model for alertdesk.
//!
//! `alertdesk-core` holds the backend-independent pieces of the alerting
//! chat interface: rule and silence snapshots, the free-text matcher
//! language, loose name lookup and page slicing.
//!
//! # Matchers
//!
//! ```rust
//! use alertdesk_core::{parse_matchers, MatchOp};
//!
//! let matchers = parse_matchers("host=test job=~api.* HighCPU");
//! assert_eq!(matchers.len(), 3);
//! assert_eq!(matchers[1].op(), MatchOp::RegexMatch);
//! assert_eq!(matchers[2].name, "alertname");
//! ```
//!
//! # Silences
//!
//! ```rust
//! use alertdesk_core::{parse_duration, parse_matchers, Silence};
//! use chrono::Utc;
//!
//! let silence = Silence::new(
//!     parse_matchers("host=test"),
//!     Utc::now(),
//!     parse_duration("2h").unwrap(),
//!     "ops",
//!     "Maintenance window",
//! )
//! .unwrap();
//! assert_eq!(silence.matcher_text(), "host=\"test\"");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod duration;
pub mod error;
pub mod matcher;
pub mod names;
pub mod paging;
pub mod types;

// Re-export main types at crate root
pub use duration::{format_duration, parse_duration};
pub use error::{CoreError, Result};
pub use matcher::{
    ALERTNAME_LABEL, MatchOp, Matcher, filter_query, matchers_from_labels, parse_matchers,
    same_matchers,
};
pub use names::{Named, RuleRef, filter_by_name, find_by_name, find_rule, normalize, rule_refs};
pub use paging::{Page, paginate, total_pages};
pub use types::{
    Alert, AlertGroup, AlertRule, MatchingAlert, MatchingAlertStatus, RuleState, Silence,
    SilenceState, SilenceStatus, fingerprint_labels,
};
