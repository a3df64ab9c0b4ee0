//! # Integration Tests
//!
//! End-to-end checks across crates:
//! - routing scenarios through full route pipelines (classifier, rule
//!   table, dispatcher, sink workers)
//! - routing properties (reindex default, idempotence, retry bound, fixity
//!   outcomes, exclusion)
//! - config-driven runs: TOML blueprint, JSON-lines ingestion, file sinks

#[cfg(test)]
mod fixtures {
    use std::sync::Arc;

    use classifier::{Classifier, ExclusionList};
    use contracts::repository::types;
    use contracts::{Destination, EventRecord, RouteId};
    use dispatcher::{CollectingDeadLetterHook, Dispatcher, MemorySink, Recorded, RetryPolicy};
    use repository::MockRepository;
    use routes::{
        forwarding, indexing, serialization, FixitySequence, Pipeline, ProcessOutcome, RouteLogic,
    };

    pub const BASE: &str = "http://localhost:8080/rest";

    /// One route with a memory sink behind every destination it can select
    pub struct Harness {
        pub pipeline: Pipeline<MockRepository>,
        pub sinks: Vec<(Destination, Recorded)>,
        pub hook: Arc<CollectingDeadLetterHook>,
    }

    impl Harness {
        pub fn build(
            route: RouteId,
            classifier: Classifier,
            logic: RouteLogic,
            repo: Arc<MockRepository>,
            retry: RetryPolicy,
        ) -> Self {
            let hook = Arc::new(CollectingDeadLetterHook::new());
            let mut sinks = Vec::new();
            let mut builder = Dispatcher::builder(route)
                .retry(retry)
                .dead_letter_hook(hook.clone());
            for destination in route.destinations() {
                let sink = MemorySink::new(destination.as_str());
                sinks.push((destination.clone(), sink.written()));
                builder = builder.sink(destination.clone(), sink, 16).unwrap();
            }
            Self {
                pipeline: Pipeline::new(classifier, logic, builder.build(), repo),
                sinks,
                hook,
            }
        }

        pub fn written(&self, destination: &Destination) -> &Recorded {
            &self
                .sinks
                .iter()
                .find(|(d, _)| d == destination)
                .unwrap()
                .1
        }

        pub fn total_written(&self) -> usize {
            self.sinks.iter().map(|(_, r)| r.len()).sum()
        }
    }

    pub fn classifier(excluded: &[&str], unconditional: bool) -> Classifier {
        Classifier::new(ExclusionList::new(excluded), types::BINARY, types::INDEXABLE)
            .with_unconditional_indexing(unconditional)
    }

    pub fn indexing(unconditional: bool, excluded: &[&str], repo: Arc<MockRepository>) -> Harness {
        Harness::build(
            RouteId::Indexing,
            classifier(excluded, unconditional),
            RouteLogic::Table {
                rules: indexing::rules(),
                requirement: indexing::type_requirement(unconditional),
            },
            repo,
            RetryPolicy::new(2),
        )
    }

    pub fn forwarding(excluded: &[&str], repo: Arc<MockRepository>) -> Harness {
        Harness::build(
            RouteId::Forwarding,
            classifier(excluded, false),
            RouteLogic::Table {
                rules: forwarding::rules(),
                requirement: forwarding::type_requirement(),
            },
            repo,
            RetryPolicy::new(2),
        )
    }

    pub fn serialization(
        include_binaries: bool,
        excluded: &[&str],
        repo: Arc<MockRepository>,
    ) -> Harness {
        Harness::build(
            RouteId::Serialization,
            classifier(excluded, false),
            RouteLogic::Table {
                rules: serialization::rules(include_binaries),
                requirement: serialization::type_requirement(include_binaries),
            },
            repo,
            RetryPolicy::new(2),
        )
    }

    pub fn fixity(excluded: &[&str], repo: Arc<MockRepository>) -> Harness {
        Harness::build(
            RouteId::Fixity,
            classifier(excluded, false),
            RouteLogic::Fixity(FixitySequence::default()),
            repo,
            RetryPolicy::new(2),
        )
    }

    pub fn record(identifier: &str, kind: Option<&str>) -> EventRecord {
        let builder = EventRecord::builder(BASE, identifier);
        let builder = match kind {
            Some(kind) => builder.event_type(kind),
            None => builder,
        };
        builder.build().unwrap()
    }

    /// Destinations selected by one processing run, in selection order
    pub fn destinations(outcome: &ProcessOutcome) -> Vec<Destination> {
        match outcome {
            ProcessOutcome::Dispatched(report) => report
                .outcomes
                .iter()
                .map(|o| o.destination.clone())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;

    use contracts::repository::types;
    use contracts::{kinds, Destination};
    use repository::MockRepository;
    use routes::ProcessOutcome;

    use crate::fixtures::*;

    #[tokio::test]
    async fn test_unconditional_indexing_added_node_updates_index() {
        let repo = Arc::new(MockRepository::new());
        let route = indexing(true, &[], repo.clone());

        let outcome = route
            .pipeline
            .process(&record("/foo", Some(kinds::NODE_ADDED)))
            .await;

        assert_eq!(destinations(&outcome), vec![Destination::UPDATE_INDEX]);
        assert_eq!(route.written(&Destination::UPDATE_INDEX).identifiers(), vec!["/foo"]);
        assert_eq!(repo.describe_calls(), 0);
    }

    #[tokio::test]
    async fn test_removed_node_deletes_from_index_regardless_of_marker() {
        for unconditional in [true, false] {
            for marker in [types::INDEXABLE, types::CONTAINER] {
                let repo = Arc::new(MockRepository::new().with_resource("/foo", [marker]));
                let route = indexing(unconditional, &[], repo.clone());

                let outcome = route
                    .pipeline
                    .process(&record("/foo", Some(kinds::NODE_REMOVED)))
                    .await;

                assert_eq!(destinations(&outcome), vec![Destination::DELETE_INDEX]);
                assert_eq!(repo.describe_calls(), 0, "deletes never fetch");
            }
        }
    }

    #[tokio::test]
    async fn test_excluded_container_dropped_by_every_route() {
        let repo = Arc::new(
            MockRepository::new()
                .with_resource("/audit/1", [types::BINARY, types::INDEXABLE])
                .with_fixity("/audit/1", "SUCCESS"),
        );
        let excluded = ["/audit"];
        let routes = [
            indexing(false, &excluded, repo.clone()),
            forwarding(&excluded, repo.clone()),
            serialization(true, &excluded, repo.clone()),
            fixity(&excluded, repo.clone()),
        ];

        for route in &routes {
            for kind in [None, Some(kinds::NODE_ADDED), Some(kinds::NODE_REMOVED)] {
                let outcome = route.pipeline.process(&record("/audit/1", kind)).await;
                assert_eq!(outcome, ProcessOutcome::Excluded);
            }
            assert_eq!(route.total_written(), 0);
            assert!(route.hook.letters().is_empty());
        }
        assert_eq!(repo.describe_calls(), 0);
        assert_eq!(repo.fixity_calls(), 0);
    }

    #[tokio::test]
    async fn test_sibling_prefix_is_not_excluded() {
        let repo = Arc::new(MockRepository::new().with_resource("/audit2", [types::INDEXABLE]));
        let route = indexing(false, &["/audit"], repo);

        let outcome = route.pipeline.process(&record("/audit2", None)).await;
        assert_eq!(destinations(&outcome), vec![Destination::UPDATE_INDEX]);
    }

    #[tokio::test]
    async fn test_binary_delete_fans_out_without_include_binaries() {
        let repo = Arc::new(MockRepository::new().with_resource("/bin", [types::BINARY]));
        let route = serialization(false, &[], repo.clone());

        let outcome = route
            .pipeline
            .process(&record("/bin", Some(kinds::NODE_REMOVED)))
            .await;

        assert_eq!(
            destinations(&outcome),
            vec![Destination::DELETE_METADATA, Destination::DELETE_BINARY]
        );
        assert_eq!(route.written(&Destination::DELETE_METADATA).len(), 1);
        assert_eq!(route.written(&Destination::DELETE_BINARY).len(), 1);
        assert_eq!(repo.describe_calls(), 0);
    }

    #[tokio::test]
    async fn test_binary_update_gated_by_include_binaries() {
        let repo = Arc::new(MockRepository::new().with_resource("/bin", [types::BINARY]));

        let without = serialization(false, &[], repo.clone());
        let outcome = without.pipeline.process(&record("/bin", None)).await;
        assert_eq!(destinations(&outcome), vec![Destination::UPDATE_METADATA]);

        let with = serialization(true, &[], repo.clone());
        let outcome = with.pipeline.process(&record("/bin", None)).await;
        assert_eq!(
            destinations(&outcome),
            vec![Destination::UPDATE_METADATA, Destination::UPDATE_BINARY]
        );
    }

    #[tokio::test]
    async fn test_forwarding_carries_update_for_untyped_events() {
        let route = forwarding(&[], Arc::new(MockRepository::new()));

        route.pipeline.process(&record("/foo", None)).await;

        let messages = route.written(&Destination::FORWARD_HTTP).messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].event_types.contains(kinds::UPDATE));
        assert_eq!(messages[0].resource_url, "http://localhost:8080/rest/foo");
    }

    fn activity_delete() -> ingestion::RawMessage {
        let body = r#"{
            "type": "Delete",
            "object": {
                "id": "http://localhost:8080/rest/gone",
                "type": "http://fedora.info/definitions/v4/repository#Binary",
                "isPartOf": "http://localhost:8080/rest"
            }
        }"#;
        ingestion::RawMessage::new().with_body(body.to_string())
    }

    #[tokio::test]
    async fn test_body_only_delete_classified_without_fetch() {
        let record = ingestion::normalize(&activity_delete()).unwrap();
        let repo = MockRepository::new();
        let classifier = classifier::Classifier::new(
            classifier::ExclusionList::default(),
            types::BINARY,
            types::INDEXABLE,
        );

        let facts = classifier
            .classify_with(&record, &repo, classifier::TypeRequirement::Required)
            .await
            .unwrap();

        assert!(facts.is_delete);
        assert_eq!(repo.describe_calls(), 0);
    }

    #[tokio::test]
    async fn test_body_only_delete_removed_from_index() {
        let record = ingestion::normalize(&activity_delete()).unwrap();
        let repo = Arc::new(MockRepository::new());
        let route = indexing(true, &[], repo.clone());

        let outcome = route.pipeline.process(&record).await;

        assert_eq!(destinations(&outcome), vec![Destination::DELETE_INDEX]);
        assert!(route.written(&Destination::UPDATE_INDEX).is_empty());
        assert_eq!(repo.describe_calls(), 0);
    }
}

#[cfg(test)]
mod property_tests {
    use std::sync::Arc;

    use contracts::repository::types;
    use contracts::{kinds, RouteId};
    use dispatcher::{MemorySink, RetryPolicy};
    use repository::MockRepository;
    use routes::{fixity::extras, ProcessOutcome};

    use crate::fixtures::*;

    #[tokio::test]
    async fn test_untyped_event_routes_like_explicit_update() {
        let repo = Arc::new(
            MockRepository::new()
                .with_resource("/marked", [types::INDEXABLE])
                .with_resource("/plain", [types::CONTAINER])
                .with_resource("/bin", [types::BINARY]),
        );
        let routes = [
            indexing(false, &[], repo.clone()),
            indexing(true, &[], repo.clone()),
            forwarding(&[], repo.clone()),
            serialization(false, &[], repo.clone()),
            serialization(true, &[], repo.clone()),
        ];

        for route in &routes {
            for identifier in ["/marked", "/plain", "/bin"] {
                let defaulted = route.pipeline.process(&record(identifier, None)).await;
                let explicit = route
                    .pipeline
                    .process(&record(identifier, Some(kinds::UPDATE)))
                    .await;
                assert_eq!(
                    destinations(&defaulted),
                    destinations(&explicit),
                    "{} on {}",
                    identifier,
                    route.pipeline.route_id()
                );
                assert!(!destinations(&defaulted).is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_indexing_is_idempotent() {
        let repo = Arc::new(
            MockRepository::new()
                .with_resource("/marked", [types::INDEXABLE])
                .with_resource("/plain", [types::CONTAINER]),
        );
        let route = indexing(false, &[], repo);

        for kind in [None, Some(kinds::NODE_ADDED), Some(kinds::NODE_REMOVED)] {
            for identifier in ["/marked", "/plain"] {
                let event = record(identifier, kind);
                let first = route.pipeline.process(&event).await;
                let second = route.pipeline.process(&event).await;
                assert_eq!(destinations(&first), destinations(&second));
            }
        }
    }

    #[tokio::test]
    async fn test_failing_sink_attempted_exactly_n_plus_one_times() {
        for max_redeliveries in 0..4u32 {
            let sink = MemorySink::new("forward-http").always_failing();
            let written = sink.written();
            let hook = Arc::new(dispatcher::CollectingDeadLetterHook::new());
            let dispatcher = dispatcher::Dispatcher::builder(RouteId::Forwarding)
                .sink(contracts::Destination::FORWARD_HTTP, sink, 4)
                .unwrap()
                .retry(RetryPolicy::new(max_redeliveries))
                .dead_letter_hook(hook.clone())
                .build();
            let pipeline = routes::Pipeline::new(
                classifier(&[], false),
                routes::RouteLogic::Table {
                    rules: routes::forwarding::rules(),
                    requirement: routes::forwarding::type_requirement(),
                },
                dispatcher,
                Arc::new(MockRepository::new()),
            );

            pipeline.process(&record("/foo", None)).await;

            assert_eq!(written.attempts(), u64::from(max_redeliveries) + 1);
            assert!(written.is_empty());
            let letters = hook.letters();
            assert_eq!(letters.len(), 1);
            assert_eq!(letters[0].attempts, max_redeliveries + 1);
        }
    }

    #[tokio::test]
    async fn test_failing_fetch_attempted_exactly_n_plus_one_times() {
        let repo = Arc::new(MockRepository::new());
        let route = indexing(false, &[], repo.clone());

        let outcome = route.pipeline.process(&record("/missing", None)).await;

        assert_eq!(outcome, ProcessOutcome::DeadLettered);
        assert_eq!(repo.describe_calls(), 3);
        assert_eq!(route.total_written(), 0);
        assert_eq!(route.hook.letters()[0].destination, None);
    }

    #[tokio::test]
    async fn test_transient_fetch_failure_recovers() {
        let repo = Arc::new(MockRepository::new().with_resource("/flaky", [types::INDEXABLE]));
        repo.fail_times("/flaky", 2);
        let route = indexing(false, &[], repo.clone());

        let outcome = route.pipeline.process(&record("/flaky", None)).await;

        assert_eq!(destinations(&outcome), vec![contracts::Destination::UPDATE_INDEX]);
        assert_eq!(repo.describe_calls(), 3);
        assert!(route.hook.letters().is_empty());
    }

    #[tokio::test]
    async fn test_fixity_outcome_literals() {
        let cases = [
            ("SUCCESS", contracts::Destination::FIXITY_SUCCESS),
            ("", contracts::Destination::FIXITY_FAILURE),
            ("FAILURE", contracts::Destination::FIXITY_FAILURE),
            ("PARTIAL_SUCCESS", contracts::Destination::FIXITY_FAILURE),
            ("success", contracts::Destination::FIXITY_FAILURE),
        ];

        for (literal, expected) in cases {
            let repo = Arc::new(
                MockRepository::new()
                    .with_resource("/bin", [types::BINARY])
                    .with_fixity("/bin", literal),
            );
            let route = fixity(&[], repo);

            let outcome = route.pipeline.process(&record("/bin", None)).await;
            assert_eq!(destinations(&outcome), vec![expected.clone()], "literal {literal:?}");

            let messages = route.written(&expected).messages();
            assert_eq!(
                messages[0].extras.get(extras::OUTCOME).map(String::as_str),
                Some(literal)
            );
        }
    }

    #[tokio::test]
    async fn test_fixity_non_binary_has_no_destinations() {
        let repo = Arc::new(
            MockRepository::new()
                .with_resource("/c", [types::CONTAINER])
                .with_fixity("/c", "SUCCESS"),
        );
        let route = fixity(&[], repo.clone());

        let outcome = route.pipeline.process(&record("/c", None)).await;

        assert_eq!(outcome, ProcessOutcome::NotBinary);
        assert_eq!(route.total_written(), 0);
        assert_eq!(repo.fixity_calls(), 0);
        assert_eq!(route.pipeline.stats().snapshot().not_binary, 1);
    }

    #[tokio::test]
    async fn test_fixity_skips_deleted_resource() {
        let repo = Arc::new(MockRepository::new());
        let route = fixity(&[], repo.clone());

        let outcome = route
            .pipeline
            .process(&record("/gone", Some(contracts::kinds::NODE_REMOVED)))
            .await;

        assert_eq!(outcome, ProcessOutcome::Removed);
        assert_eq!(repo.describe_calls(), 0);
        assert_eq!(repo.fixity_calls(), 0);
        assert_eq!(route.total_written(), 0);
        assert!(route.hook.letters().is_empty());
        assert_eq!(route.pipeline.stats().snapshot().dead_lettered, 0);
    }
}

#[cfg(test)]
mod exclusion_properties {
    use classifier::ExclusionList;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_exclusion_is_path_segment_safe(
            prefix in "/[a-z]{1,8}",
            child in "[a-z0-9]{1,8}",
            suffix in "[a-z0-9]{1,4}",
        ) {
            let list = ExclusionList::new([prefix.as_str()]);
            prop_assert!(list.matches(&prefix));
            let nested = format!("{prefix}/{child}");
            let sibling = format!("{prefix}{suffix}");
            prop_assert!(list.matches(&nested));
            prop_assert!(!list.matches(&sibling));
        }
    }
}

#[cfg(test)]
mod config_driven_tests {
    use std::io::Write;
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::repository::types;
    use contracts::RouteId;
    use ingestion::{headers, IngestionPipeline, JsonLinesSource, LineInput, RawMessage};
    use repository::MockRepository;
    use routes::Router;

    fn blueprint(archive: &std::path::Path) -> contracts::RouterBlueprint {
        let config = format!(
            r#"
[repository]
base_url = "http://localhost:8080/rest"

[defaults]
max_redeliveries = 1
excluded_containers = ["/audit"]

[serialization]
include_binaries = true
concurrent_consumers = 2

[[serialization.destinations]]
name = "update-metadata"
sink_type = "file"
params = {{ base_path = "{meta}" }}

[[serialization.destinations]]
name = "delete-metadata"
sink_type = "file"
params = {{ base_path = "{meta}" }}

[[serialization.destinations]]
name = "update-binary"
sink_type = "file"
params = {{ base_path = "{bin}", extension = "binary" }}

[[serialization.destinations]]
name = "delete-binary"
sink_type = "file"
params = {{ base_path = "{bin}", extension = "binary" }}
"#,
            meta = archive.join("meta").display(),
            bin = archive.join("bin").display(),
        );
        ConfigLoader::load_from_str(&config, ConfigFormat::Toml).unwrap()
    }

    fn message_line(identifier: &str, kind: &str) -> String {
        format!(
            r#"{{"headers": {{"{}": "http://localhost:8080/rest", "{}": "{identifier}", "{}": "{kind}"}}}}"#,
            headers::BASE_URL,
            headers::IDENTIFIER,
            headers::EVENT_TYPE,
        )
    }

    #[tokio::test]
    async fn test_archive_follows_create_and_delete() {
        let archive = tempfile::tempdir().unwrap();
        let repo = Arc::new(
            MockRepository::new()
                .with_resource("/col/bin", [types::BINARY])
                .with_resource("/col", [types::CONTAINER]),
        );
        let blueprint = blueprint(archive.path());

        let router = Router::from_blueprint(&blueprint, repo.clone()).unwrap();
        assert_eq!(router.routes(), vec![RouteId::Serialization]);
        for id in ["/col", "/col/bin", "/audit/x"] {
            let record = ingestion::normalize(
                &RawMessage::new()
                    .with_header(headers::BASE_URL, "http://localhost:8080/rest")
                    .with_header(headers::IDENTIFIER, id)
                    .with_header(headers::EVENT_TYPE, "NODE_ADDED"),
            )
            .unwrap();
            router.publish(record).await.unwrap();
        }
        let summary = router.shutdown().await;

        let meta = archive.path().join("meta");
        let bin = archive.path().join("bin");
        assert!(meta.join("col.json").exists());
        assert!(meta.join("col/bin.json").exists());
        assert!(bin.join("col/bin.binary").exists());
        assert!(!bin.join("col.binary").exists());
        assert!(!meta.join("audit").exists());

        let stats = summary.route(RouteId::Serialization).unwrap().stats;
        assert_eq!(stats.received, 3);
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.delivered, 3);

        // Delete both through a fresh router run
        let router = Router::from_blueprint(&blueprint, repo).unwrap();
        router
            .publish(ingestion::normalize(
                &RawMessage::new()
                    .with_header(headers::BASE_URL, "http://localhost:8080/rest")
                    .with_header(headers::IDENTIFIER, "/col/bin")
                    .with_header(headers::EVENT_TYPE, "NODE_REMOVED"),
            ).unwrap())
            .await
            .unwrap();
        let summary = router.shutdown().await;

        assert!(!meta.join("col/bin.json").exists());
        assert!(!bin.join("col/bin.binary").exists());
        assert!(meta.join("col.json").exists());
        assert_eq!(summary.total_dead_lettered(), 0);
    }

    #[tokio::test]
    async fn test_json_lines_through_ingestion_and_router() {
        let archive = tempfile::tempdir().unwrap();
        let mut input = tempfile::NamedTempFile::new().unwrap();
        writeln!(input, "{}", message_line("/a", "NODE_ADDED")).unwrap();
        writeln!(input, "not json").unwrap();
        writeln!(input, r#"{{"headers": {{"{}": "/no-base"}}}}"#, headers::IDENTIFIER).unwrap();
        writeln!(input, "{}", message_line("/a", "NODE_REMOVED")).unwrap();

        let repo = Arc::new(MockRepository::new().with_resource("/a", [types::CONTAINER]));
        let router = Router::from_blueprint(&blueprint(archive.path()), repo).unwrap();

        let (raw_tx, raw_rx) = async_channel::bounded(4);
        let mut ingestion = IngestionPipeline::new(4);
        let records = ingestion.take_receiver().unwrap();
        let ingest = ingestion.start(raw_rx);
        let metrics = ingestion.into_metrics();

        let source = JsonLinesSource::new(LineInput::File(input.path().to_path_buf()));
        let forwarded = tokio::spawn(source.run(raw_tx));

        while let Ok(record) = records.recv().await {
            router.publish(record).await.unwrap();
        }
        assert_eq!(forwarded.await.unwrap().unwrap(), 3);
        ingest.await.unwrap();
        let summary = router.shutdown().await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_received, 3);
        assert_eq!(snapshot.malformed, 1);
        assert_eq!(snapshot.events_normalized, 2);

        let stats = summary.route(RouteId::Serialization).unwrap().stats;
        assert_eq!(stats.received, 2);
        assert_eq!(stats.dead_lettered, 0);
    }
}
