//! ResourceFetcher trait - repository lookup interface
//!
//! The repository client is an external collaborator; the routing core only
//! reads the descriptions it returns.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::RouterError;

/// Type vocabulary used when classifying fetched descriptions
pub mod types {
    pub const BINARY: &str = "http://fedora.info/definitions/v4/repository#Binary";
    pub const INDEXABLE: &str = "http://fedora.info/definitions/v4/indexing#Indexable";
    pub const CONTAINER: &str = "http://fedora.info/definitions/v4/repository#Container";
}

/// Outcome literal the repository reports for a passing fixity check
pub const FIXITY_SUCCESS: &str = "SUCCESS";

/// Resource description (server-managed triples reduced to the type set)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceDescription {
    pub identifier: String,
    pub types: BTreeSet<String>,
}

impl ResourceDescription {
    pub fn new<I, S>(identifier: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifier: identifier.into(),
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_type(&self, uri: &str) -> bool {
        self.types.contains(uri)
    }
}

/// Result of a repository-side fixity computation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixityReport {
    /// Outcome literal, e.g. `SUCCESS`, `BAD_CHECKSUM`
    pub outcome: String,
    pub digest: Option<String>,
    pub size: Option<u64>,
}

impl FixityReport {
    /// Exact, case-sensitive match against the success literal
    pub fn is_success(&self) -> bool {
        self.outcome == FIXITY_SUCCESS
    }
}

/// Repository lookup
///
/// Implementations must be safe for concurrent use by several workers.
#[trait_variant::make(ResourceFetcher: Send)]
pub trait LocalResourceFetcher {
    /// Fetch the description of `identifier`
    ///
    /// # Errors
    /// `Fetch` on 404, network failure or an unreadable response
    async fn describe(
        &self,
        base_url: &str,
        identifier: &str,
    ) -> Result<ResourceDescription, RouterError>;

    /// Ask the repository to compute fixity for `identifier`
    ///
    /// # Errors
    /// `Fetch` on 404, network failure or an unreadable response
    async fn check_fixity(&self, base_url: &str, identifier: &str)
        -> Result<FixityReport, RouterError>;
}
