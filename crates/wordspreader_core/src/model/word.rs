//! Word domain model.
//!
//! # Responsibility
//! - Define the entry record shared by the store and its callers.
//! - Describe partial updates without `None`-vs-empty ambiguity.
//!
//! # Invariants
//! - `name` is the natural key. Empty names and blank tags are refused as
//!   input hygiene (`WordValidationError`), not by the schema.
//! - `tags` holds names only; tag rows are resolved by the repository.
//! - Names and tags are stored verbatim (no trimming or case folding).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Named text snippet with an unordered set of tag names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Unique, mutable natural key.
    pub name: String,
    /// Body text. May be empty.
    pub content: String,
    /// Tag names, iterated in ascending order.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Word {
    /// Creates a word from name, content and any iterable of tag names.
    pub fn new<I, S>(name: impl Into<String>, content: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            content: content.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks name and tag constraints before persistence.
    pub fn validate(&self) -> Result<(), WordValidationError> {
        validate_name(&self.name)?;
        validate_tags(&self.tags)
    }

    /// Returns whether this word carries the exact tag name.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Rejected caller input.
///
/// These are entry-form hygiene rules checked on the way in, not schema
/// constraints. The tables accept empty names and blank tags; rows read back
/// that break these rules surface as `RepoError::InvalidData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordValidationError {
    /// An entry form would not submit a word without a name.
    EmptyName,
    /// An entry form drops empty or whitespace-only tag tokens.
    BlankTag(String),
}

impl Display for WordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "word name cannot be empty"),
            Self::BlankTag(tag) => write!(f, "invalid tag: `{tag}`"),
        }
    }
}

impl Error for WordValidationError {}

/// Validates one word name.
pub fn validate_name(name: &str) -> Result<(), WordValidationError> {
    if name.is_empty() {
        return Err(WordValidationError::EmptyName);
    }
    Ok(())
}

/// Validates a tag set; rejects the first blank tag in iteration order.
pub fn validate_tags<'a>(
    tags: impl IntoIterator<Item = &'a String>,
) -> Result<(), WordValidationError> {
    match tags.into_iter().find(|tag| tag.trim().is_empty()) {
        Some(tag) => Err(WordValidationError::BlankTag(tag.clone())),
        None => Ok(()),
    }
}

/// Tri-state change request for one field of a word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    /// Leave the stored value untouched.
    #[default]
    Keep,
    /// Reset to the empty value (`""` or no tags).
    Clear,
    /// Replace with the given value.
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Returns whether this update changes the stored value.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Keep)
    }

    /// Resolves the new value, with `Clear` mapped to `T::default()`.
    pub fn into_value(self) -> Option<T>
    where
        T: Default,
    {
        match self {
            Self::Keep => None,
            Self::Clear => Some(T::default()),
            Self::Set(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Set(value),
            None => Self::Keep,
        }
    }
}

/// Composite update request.
///
/// Content and tag changes are applied together, then `new_name` is applied as
/// a separate rename step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordUpdate {
    pub content: FieldUpdate<String>,
    pub tags: FieldUpdate<BTreeSet<String>>,
    pub new_name: Option<String>,
}

impl WordUpdate {
    /// Update that only replaces content.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: FieldUpdate::Set(content.into()),
            ..Self::default()
        }
    }

    /// Update that only replaces the tag set. An empty set clears all tags.
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: FieldUpdate::Set(tags.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Update that only renames.
    pub fn rename(new_name: impl Into<String>) -> Self {
        Self {
            new_name: Some(new_name.into()),
            ..Self::default()
        }
    }

    /// Returns whether content or tags are touched.
    pub fn changes_fields(&self) -> bool {
        self.content.is_change() || self.tags.is_change()
    }
}
