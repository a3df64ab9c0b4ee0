//! Routing fact derivation

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use contracts::{
    kinds, EventRecord, ResourceDescription, ResourceFetcher, RouterError, RoutingFacts,
};

use crate::exclusion::ExclusionList;

/// Whether a route's next step depends on the resource's type set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRequirement {
    /// Decide from the record alone
    NotNeeded,
    /// Fetch the description unless the event is excluded or a delete
    Required,
}

/// Per-route classifier.
///
/// Configuration is read-only after construction and safe to share across
/// workers.
#[derive(Debug, Clone)]
pub struct Classifier {
    exclusions: ExclusionList,
    binary_type: String,
    indexable_type: String,
    indexing_is_unconditional: bool,
}

impl Classifier {
    pub fn new(
        exclusions: ExclusionList,
        binary_type: impl Into<String>,
        indexable_type: impl Into<String>,
    ) -> Self {
        Self {
            exclusions,
            binary_type: binary_type.into(),
            indexable_type: indexable_type.into(),
            indexing_is_unconditional: false,
        }
    }

    /// Treat every resource as indexable
    pub fn with_unconditional_indexing(mut self, unconditional: bool) -> Self {
        self.indexing_is_unconditional = unconditional;
        self
    }

    pub fn indexing_is_unconditional(&self) -> bool {
        self.indexing_is_unconditional
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    /// Derive facts from `record` and an optional fetched description.
    ///
    /// Without a description, the types carried on the notification are used.
    pub fn classify(
        &self,
        record: &EventRecord,
        fetched: Option<&ResourceDescription>,
    ) -> RoutingFacts {
        let types: &BTreeSet<String> = match fetched {
            Some(description) => &description.types,
            None => record.resource_types(),
        };

        RoutingFacts {
            is_delete: record.has_event_kind(kinds::NODE_REMOVED),
            is_binary: types.contains(&self.binary_type),
            is_indexable: self.indexing_is_unconditional || types.contains(&self.indexable_type),
            is_under_excluded_container: self.exclusions.matches(record.identifier()),
        }
    }

    /// Classify, fetching the description first when `requirement` asks for
    /// types and the event can still reach a type-dependent branch.
    ///
    /// # Errors
    /// The fetch error, unchanged. Facts are never defaulted on failure.
    #[instrument(
        name = "classifier_classify",
        skip(self, record, fetcher),
        fields(identifier = %record.identifier())
    )]
    pub async fn classify_with<F>(
        &self,
        record: &EventRecord,
        fetcher: &F,
        requirement: TypeRequirement,
    ) -> Result<RoutingFacts, RouterError>
    where
        F: ResourceFetcher + Sync,
    {
        let facts = self.classify(record, None);
        if requirement == TypeRequirement::NotNeeded
            || facts.is_under_excluded_container
            || facts.is_delete
        {
            return Ok(facts);
        }

        let description = fetcher
            .describe(record.base_url(), record.identifier())
            .await?;
        debug!(types = description.types.len(), "fetched resource types");
        Ok(self.classify(record, Some(&description)))
    }
}
