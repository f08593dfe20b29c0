use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The human-readable label of a store path.
///
/// A `StorePathName` always matches `[A-Za-z0-9+\-_?=][A-Za-z0-9+\-._?=]*`:
/// it is non-empty and never starts with `.`. The only way to obtain one is
/// [`StorePathName::validate`] (or the parsing wrappers built on it), so any
/// value of this type is known to be well-formed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePathName(String);

impl StorePathName {
    /// Check `text` against the name grammar.
    ///
    /// Returns `None` when the text is empty, starts with `.`, or contains a
    /// character outside the allowed set.
    pub fn validate(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let first = chars.next()?;
        if first == '.' || !is_name_char(first) {
            return None;
        }
        if !chars.all(is_name_char) {
            return None;
        }
        Some(Self(text.to_owned()))
    }

    /// The original text, exactly as validated.
    pub fn contents(&self) -> &str {
        &self.0
    }

    /// Consume the name, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

fn is_name_char(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '+' | '-' | '.' | '_' | '?' | '=')
}

impl AsRef<str> for StorePathName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StorePathName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePathName({})", self.0)
    }
}

impl fmt::Display for StorePathName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StorePathName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s).ok_or_else(|| TypeError::InvalidName(s.to_owned()))
    }
}

impl TryFrom<String> for StorePathName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::validate(&value).is_some() {
            Ok(Self(value))
        } else {
            Err(TypeError::InvalidName(value))
        }
    }
}

impl From<StorePathName> for String {
    fn from(name: StorePathName) -> Self {
        name.0
    }
}
