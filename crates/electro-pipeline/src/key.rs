//! Registry keys and placement requests.

use std::fmt;

/// Identifies a registry slot.
///
/// Ordinal keys are slot numbers: registering under an ordinal that exists
/// overwrites that slot in place. Name keys are unique within a plain
/// registry and serve as anchors for other registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A slot number, auto-assigned unless given explicitly.
    Ordinal(u64),
    /// A caller-chosen name (a route pattern, in route tables).
    Name(String),
}

impl Key {
    /// Creates a name key.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Returns the name, if this is a name key.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Ordinal(_) => None,
        }
    }

    /// Returns true for ordinal keys.
    #[must_use]
    pub const fn is_ordinal(&self) -> bool {
        matches!(self, Self::Ordinal(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordinal(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for Key {
    fn from(n: u64) -> Self {
        Self::Ordinal(n)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool {
        self.as_name() == Some(other)
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        self.as_name() == Some(*other)
    }
}

/// Positions a new entry next to an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Insert immediately before the first entry with this key.
    Before(Key),
    /// Insert immediately after the first entry with this key.
    After(Key),
}

impl Anchor {
    /// Anchors before `key`.
    #[must_use]
    pub fn before(key: impl Into<Key>) -> Self {
        Self::Before(key.into())
    }

    /// Anchors after `key`.
    #[must_use]
    pub fn after(key: impl Into<Key>) -> Self {
        Self::After(key.into())
    }

    /// The key this anchor refers to.
    #[must_use]
    pub fn key(&self) -> &Key {
        match self {
            Self::Before(key) | Self::After(key) => key,
        }
    }
}

/// Where and under which key to register a handler.
///
/// At most one anchor can be set; setting another replaces it.
///
/// # Example
///
/// ```
/// use electro_pipeline::{Anchor, Key, Placement};
///
/// let placement = Placement::keyed("csrf").before("router");
/// assert_eq!(placement.key(), Some(&Key::name("csrf")));
/// assert_eq!(placement.anchor(), Some(&Anchor::before("router")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    key: Option<Key>,
    anchor: Option<Anchor>,
}

impl Placement {
    /// Append under the next free ordinal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `key`.
    #[must_use]
    pub fn keyed(key: impl Into<Key>) -> Self {
        Self {
            key: Some(key.into()),
            anchor: None,
        }
    }

    /// Sets the key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Inserts before the entry keyed `anchor`.
    #[must_use]
    pub fn before(self, anchor: impl Into<Key>) -> Self {
        self.anchored(Anchor::before(anchor))
    }

    /// Inserts after the entry keyed `anchor`.
    #[must_use]
    pub fn after(self, anchor: impl Into<Key>) -> Self {
        self.anchored(Anchor::after(anchor))
    }

    /// Sets the anchor.
    #[must_use]
    pub fn anchored(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// The requested key.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The requested anchor.
    #[must_use]
    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Option<Key>, Option<Anchor>) {
        (self.key, self.anchor)
    }
}
