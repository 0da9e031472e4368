//! Delay conditions for staged bundles
//!
//! A staged bundle can be held back until the app goes to background, is
//! killed, changes native version, or a given date passes. Background and
//! kill are host events; only the date and native-version kinds can be
//! evaluated here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DelayKind {
    Background,
    Kill,
    NativeVersion,
    Date,
}

impl DelayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelayKind::Background => "background",
            DelayKind::Kill => "kill",
            DelayKind::NativeVersion => "nativeVersion",
            DelayKind::Date => "date",
        }
    }

    /// Background and kill are reported by the host, not evaluated here
    pub fn is_host_event(&self) -> bool {
        matches!(self, DelayKind::Background | DelayKind::Kill)
    }

    /// Unrecognized kinds are treated as `Background`
    pub fn parse(s: &str) -> Self {
        match s {
            "kill" => DelayKind::Kill,
            "nativeVersion" => DelayKind::NativeVersion,
            "date" => DelayKind::Date,
            _ => DelayKind::Background,
        }
    }
}

impl From<String> for DelayKind {
    fn from(s: String) -> Self {
        DelayKind::parse(&s)
    }
}

impl From<DelayKind> for String {
    fn from(kind: DelayKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DelayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayCondition {
    pub kind: DelayKind,
    #[serde(default)]
    pub value: Option<String>,
}

impl DelayCondition {
    pub fn new(kind: &str, value: Option<String>) -> Self {
        Self {
            kind: DelayKind::parse(kind),
            value,
        }
    }

    /// Whether this condition no longer holds the staged bundle back.
    pub fn is_met(&self, now: DateTime<Utc>, native_version: &str) -> bool {
        match self.kind {
            DelayKind::Date => match self.value.as_deref().map(DateTime::parse_from_rfc3339) {
                Some(Ok(until)) => now >= until.with_timezone(&Utc),
                _ => true,
            },
            DelayKind::NativeVersion => match self.value.as_deref() {
                Some(recorded) => recorded != native_version,
                None => true,
            },
            DelayKind::Background | DelayKind::Kill => false,
        }
    }
}

/// Whether the evaluable conditions in `conditions` all allow the staged
/// bundle through. Host-event conditions are skipped: the host signals them
/// by choosing when to apply.
pub fn all_met(conditions: &[DelayCondition], now: DateTime<Utc>, native_version: &str) -> bool {
    conditions
        .iter()
        .filter(|c| !c.kind.is_host_event())
        .all(|c| c.is_met(now, native_version))
}
