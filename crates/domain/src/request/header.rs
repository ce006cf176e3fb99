//! HTTP header types
//!
//! Header names are matched case-insensitively while the original spelling
//! and insertion order are preserved.

use serde::{Deserialize, Serialize};

/// A single HTTP header with name and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// The header name as written by the user.
    pub name: String,
    /// The header value.
    pub value: String,
    /// Whether this header is sent.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Header {
    /// Creates a new enabled header.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a new disabled header.
    #[must_use]
    pub fn disabled(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(name, value)
        }
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// An ordered, case-insensitive header collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    items: Vec<Header>,
}

impl Headers {
    /// Creates an empty header collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a header without replacing existing ones of the same name.
    pub fn add(&mut self, header: Header) {
        self.items.push(header);
    }

    /// Returns the first enabled value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.enabled()
            .find(|h| h.is_named(name))
            .map(|h| h.value.as_str())
    }

    /// Returns every enabled value for `name`, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.enabled()
            .filter(|h| h.is_named(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    /// Whether an enabled header named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets `name` to `value`.
    ///
    /// The first header with that name keeps its position and takes the new
    /// value; further duplicates are removed. Unknown names are appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let mut seen = false;
        self.items.retain_mut(|h| {
            if !h.is_named(&name) {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            h.value.clone_from(&value);
            h.enabled = true;
            true
        });
        if !seen {
            self.items.push(Header::new(name, value));
        }
    }

    /// Removes every header named `name`. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|h| !h.is_named(name));
        before != self.items.len()
    }

    /// Returns an iterator over enabled headers.
    pub fn enabled(&self) -> impl Iterator<Item = &Header> {
        self.items.iter().filter(|h| h.enabled)
    }

    /// Returns all headers (enabled and disabled).
    #[must_use]
    pub fn all(&self) -> &[Header] {
        &self.items
    }

    /// Mutable access to every header.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Header> {
        self.items.iter_mut()
    }

    /// Merges `other` over `self`: enabled headers of `other` replace same-named ones.
    pub fn merge_from(&mut self, other: &Self) {
        for header in other.enabled() {
            self.set(header.name.clone(), header.value.clone());
        }
    }

    /// Returns the number of headers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        iter.into_iter().map(|(n, v)| Header::new(n, v)).collect()
    }
}
