//! Named values bound by route patterns.
//!
//! Requests rarely carry more than a handful of bindings, so they live inline
//! in a `SmallVec` until that is exceeded.

use smallvec::SmallVec;

const INLINE_BINDINGS: usize = 4;

/// Name/value bindings in the order they were made.
///
/// A route pattern [`push`](Params::push)es each placeholder as it matches;
/// request attributes use [`insert`](Params::insert) so a nested table can
/// rebind a name the outer table already set.
///
/// ```rust
/// use electro_router::Params;
///
/// let mut params = Params::new();
/// params.push("org", "acme");
/// params.push("file", "logo.png");
///
/// assert_eq!(params.get("org"), Some("acme"));
/// assert_eq!(params.get("user"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    bindings: SmallVec<[(String, String); INLINE_BINDINGS]>,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for `capacity` bindings.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: SmallVec::with_capacity(capacity),
        }
    }

    /// Appends a binding. Names are not checked for repeats.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.bindings.push((name.into(), value.into()));
    }

    /// Binds `name`, overwriting an earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(binding) = self.bindings.iter_mut().find(|(bound, _)| *bound == name) {
            binding.1 = value;
        } else {
            self.bindings.push((name, value));
        }
    }

    /// Folds `other` in; its values win.
    pub fn merge(&mut self, other: Params) {
        other
            .bindings
            .into_iter()
            .for_each(|(name, value)| self.insert(name, value));
    }

    /// The value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find_map(|(bound, value)| (bound == name).then_some(value.as_str()))
    }

    /// Whether `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Bindings in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
