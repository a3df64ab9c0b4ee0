//! Destination - named logical sink
//!
//! Destinations are declared statically per route. The well-known names are
//! `const` so rule tables can be built without allocation; names read from
//! configuration are owned.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Named downstream sink, opaque to the routing core.
///
/// # Examples
/// ```
/// use contracts::Destination;
///
/// let configured: Destination = "update-index".into();
/// assert_eq!(configured, Destination::UPDATE_INDEX);
/// assert_eq!(Destination::DELETE_INDEX.as_str(), "delete-index");
/// ```
#[derive(Clone)]
pub struct Destination(Cow<'static, str>);

impl Destination {
    pub const UPDATE_INDEX: Destination = Destination::from_static("update-index");
    pub const DELETE_INDEX: Destination = Destination::from_static("delete-index");
    pub const FORWARD_HTTP: Destination = Destination::from_static("forward-http");
    pub const UPDATE_METADATA: Destination = Destination::from_static("update-metadata");
    pub const UPDATE_BINARY: Destination = Destination::from_static("update-binary");
    pub const DELETE_METADATA: Destination = Destination::from_static("delete-metadata");
    pub const DELETE_BINARY: Destination = Destination::from_static("delete-binary");
    pub const FIXITY_SUCCESS: Destination = Destination::from_static("fixity-success");
    pub const FIXITY_FAILURE: Destination = Destination::from_static("fixity-failure");
    /// Receives messages whose destination could not be resolved from configuration.
    pub const MISCONFIGURED: Destination = Destination::from_static("misconfigured");

    /// Create a destination from a static name.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Get the underlying name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Destination {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Destination {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Destination {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Destination {
    fn from(s: &str) -> Self {
        Self(Cow::Owned(s.to_string()))
    }
}

impl From<String> for Destination {
    fn from(s: String) -> Self {
        Self(Cow::Owned(s))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Destination({:?})", self.0)
    }
}

impl PartialEq for Destination {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Destination {}

impl PartialEq<str> for Destination {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Destination {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialOrd for Destination {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Destination {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

// Same as str hash so maps keyed by Destination can be queried with &str
impl Hash for Destination {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl Serialize for Destination {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Destination {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
