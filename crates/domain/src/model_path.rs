use std::fmt::{Display, Formatter};
use std::str::FromStr;

use formweave_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a model path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Object member access.
    Key(String),
    /// Array element access.
    Index(usize),
}

/// Normalized address of one value inside the logical form document.
///
/// Accepts dot and bracket syntax (`address.lines[0].street`,
/// `address['lines'][0]`) and always displays in the canonical
/// `a.b[0].c` form, so two spellings of the same location compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelPath {
    segments: Vec<PathSegment>,
}

impl ModelPath {
    /// Returns the empty path addressing the whole document.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dot/bracket path.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::Validation(
                "model path must not be empty".to_owned(),
            ));
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars().peekable();
        let mut after_dot = false;
        let mut after_bracket = false;

        while let Some(character) = chars.next() {
            match character {
                '.' => {
                    if current.is_empty() && !after_bracket {
                        return Err(invalid_path(raw, "empty segment"));
                    }
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }
                    after_dot = true;
                    after_bracket = false;
                }
                '[' => {
                    if current.is_empty() && after_dot {
                        return Err(invalid_path(raw, "empty segment before '['"));
                    }
                    if !current.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut current)));
                    }

                    let mut inner = String::new();
                    let mut closed = false;
                    let quote = chars.peek().copied().filter(|next| matches!(next, '\'' | '"'));
                    if let Some(quote) = quote {
                        chars.next();
                        let mut terminated = false;
                        for quoted in chars.by_ref() {
                            if quoted == quote {
                                terminated = true;
                                break;
                            }
                            inner.push(quoted);
                        }
                        if !terminated || chars.next() != Some(']') {
                            return Err(invalid_path(raw, "unterminated quoted key"));
                        }
                        segments.push(PathSegment::Key(inner));
                        closed = true;
                    } else {
                        for bracketed in chars.by_ref() {
                            if bracketed == ']' {
                                closed = true;
                                break;
                            }
                            inner.push(bracketed);
                        }
                        if closed {
                            let inner = inner.trim();
                            if inner.is_empty() {
                                return Err(invalid_path(raw, "empty brackets"));
                            }
                            match inner.parse::<usize>() {
                                Ok(index) => segments.push(PathSegment::Index(index)),
                                Err(_) => segments.push(PathSegment::Key(inner.to_owned())),
                            }
                        }
                    }

                    if !closed {
                        return Err(invalid_path(raw, "missing ']'"));
                    }
                    after_dot = false;
                    after_bracket = true;
                }
                ']' => return Err(invalid_path(raw, "unexpected ']'")),
                other => {
                    if after_bracket && !after_dot {
                        return Err(invalid_path(raw, "expected '.' or '[' after ']'"));
                    }
                    current.push(other);
                    after_dot = false;
                    after_bracket = false;
                }
            }
        }

        if after_dot {
            return Err(invalid_path(raw, "trailing '.'"));
        }
        if !current.is_empty() {
            segments.push(PathSegment::Key(current));
        }

        Ok(Self { segments })
    }

    /// Returns path segments in order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns whether this is the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a child path addressing an object member.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.into()));
        Self { segments }
    }

    /// Returns a child path addressing an array element.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Appends every segment of `other` to this path.
    #[must_use]
    pub fn join(&self, other: &ModelPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Returns whether `prefix` addresses this path or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &ModelPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns the path relative to `prefix` when `prefix` is an ancestor.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &ModelPath) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self {
                segments: rest.to_vec(),
            })
    }

    /// Returns the parent path; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.segments.split_last().map(|(_, rest)| Self {
            segments: rest.to_vec(),
        })
    }

    /// Returns the last segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Resolves the path inside a document with exact key matching.
    #[must_use]
    pub fn lookup<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |current, segment| match segment {
                PathSegment::Key(key) => current.as_object()?.get(key),
                PathSegment::Index(index) => current.as_array()?.get(*index),
            })
    }

    /// Resolves the path inside a document, matching object keys
    /// case-insensitively when no exact key exists.
    #[must_use]
    pub fn lookup_case_insensitive<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |current, segment| match segment {
                PathSegment::Key(key) => {
                    let object = current.as_object()?;
                    object.get(key).or_else(|| {
                        let wanted = key.to_lowercase();
                        object
                            .iter()
                            .find(|(candidate, _)| candidate.to_lowercase() == wanted)
                            .map(|(_, value)| value)
                    })
                }
                PathSegment::Index(index) => current.as_array()?.get(*index),
            })
    }
}

fn invalid_path(raw: &str, reason: &str) -> AppError {
    AppError::Validation(format!("invalid model path '{raw}': {reason}"))
}

fn key_needs_quoting(key: &str) -> bool {
    key.is_empty()
        || key.trim() != key
        || key.chars().any(|character| matches!(character, '.' | '[' | ']'))
        || key.parse::<usize>().is_ok()
}

impl Display for ModelPath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if key_needs_quoting(key) => {
                    write!(formatter, "['{key}']")?;
                }
                PathSegment::Key(key) if position == 0 => formatter.write_str(key)?,
                PathSegment::Key(key) => write!(formatter, ".{key}")?,
                PathSegment::Index(index) => write!(formatter, "[{index}]")?,
            }
        }

        Ok(())
    }
}

impl FromStr for ModelPath {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for ModelPath {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<ModelPath> for String {
    fn from(value: ModelPath) -> Self {
        value.to_string()
    }
}
