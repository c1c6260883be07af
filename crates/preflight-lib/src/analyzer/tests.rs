//! End-to-end tests for the node resources analyzer
//!
//! These tests build collected bundles in memory (and on disk for the
//! directory store) and run whole analyzers against them.

#[cfg(test)]
mod bundle_tests {
    use crate::analyzer::{analyze_node_resources, Verdict};
    use crate::error::{AnalyzeError, ConditionalErrorKind};
    use crate::models::NodeProperty;
    use crate::spec::{
        AlternativeSpec, FilterSpec, GatingSpec, NodeResourcesSpec, Outcome, PreflightSpec,
        WorkloadRef,
    };
    use crate::store::{deployments_key, DirectoryStore, MemoryStore, NODES_KEY};
    use serde_json::json;
    use tempfile::TempDir;

    /// Build a collected nodes.json payload from (name, role, cpu, memory)
    fn nodes_json(nodes: &[(&str, &str, &str, &str)]) -> String {
        let nodes: Vec<_> = nodes
            .iter()
            .map(|(name, role, cpu, memory)| {
                json!({
                    "metadata": {"name": name, "labels": {"role": role}},
                    "status": {
                        "capacity": {"cpu": cpu, "memory": memory, "pods": "110"},
                        "allocatable": {"cpu": cpu, "memory": memory, "pods": "100"}
                    }
                })
            })
            .collect();
        serde_json::to_string(&nodes).unwrap()
    }

    fn three_node_store() -> MemoryStore {
        MemoryStore::new().with_file(
            NODES_KEY,
            nodes_json(&[
                ("cp-1", "control-plane", "2", "4Gi"),
                ("worker-1", "worker", "4", "16Gi"),
                ("worker-2", "worker", "8", "32Gi"),
            ]),
        )
    }

    fn node_count_spec() -> NodeResourcesSpec {
        NodeResourcesSpec {
            check_name: "Node count".into(),
            outcomes: vec![
                Outcome::fail("count() < 3", "This application requires at least 3 nodes")
                    .with_uri("https://kurl.sh/docs/install-with-kurl/adding-nodes"),
                Outcome::warn("count() < 5", "This application recommends at least 5 nodes"),
                Outcome::pass("", "This cluster has enough nodes"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_node_count_warns() {
        let result = analyze_node_resources(&node_count_spec(), &three_node_store()).unwrap();

        assert_eq!(result.title, "Node count");
        assert_eq!(result.verdict, Some(Verdict::Warn));
        assert_eq!(result.message, "This application recommends at least 5 nodes");
        assert_eq!(result.uri, None);
    }

    #[test]
    fn test_threshold_filter_feeds_aggregates() {
        let spec = NodeResourcesSpec {
            filters: Some(FilterSpec::default().with_threshold(NodeProperty::CpuCapacity, "4")),
            outcomes: vec![
                Outcome::fail("min(memoryCapacity) < 16Gi", "memory too small"),
                Outcome::fail("count() < 2", "need two 4-core nodes"),
                Outcome::pass("sum(cpuCapacity) >= 12", "enough cpu"),
            ],
            ..Default::default()
        };
        let result = analyze_node_resources(&spec, &three_node_store()).unwrap();

        assert_eq!(result.title, "Node Resources");
        assert!(result.is_pass());
        assert_eq!(result.message, "enough cpu");
    }

    #[test]
    fn test_no_matching_outcome_is_inconclusive() {
        let spec = NodeResourcesSpec {
            outcomes: vec![Outcome::fail("count() > 10", "too many")],
            ..Default::default()
        };
        let result = analyze_node_resources(&spec, &three_node_store()).unwrap();
        assert!(result.is_inconclusive());
    }

    #[test]
    fn test_label_selector_mismatch_fails_analyzer() {
        let spec = NodeResourcesSpec {
            filters: Some(FilterSpec::default().with_label("role", "worker")),
            outcomes: vec![Outcome::pass("", "ok")],
            ..Default::default()
        };
        let err = analyze_node_resources(&spec, &three_node_store()).unwrap_err();
        assert!(matches!(err, AnalyzeError::Filter { ref label } if label == "role"));
    }

    #[test]
    fn test_label_selector_matching_every_node() {
        let store = MemoryStore::new().with_file(
            NODES_KEY,
            nodes_json(&[("w1", "worker", "4", "8Gi"), ("w2", "worker", "4", "8Gi")]),
        );
        let spec = NodeResourcesSpec {
            filters: Some(FilterSpec::default().with_label("role", "worker")),
            outcomes: vec![Outcome::pass("== 2", "two workers")],
            ..Default::default()
        };
        assert!(analyze_node_resources(&spec, &store).unwrap().is_pass());
    }

    #[test]
    fn test_min_over_empty_matching_set_errors() {
        let spec = NodeResourcesSpec {
            filters: Some(FilterSpec::default().with_threshold(NodeProperty::CpuCapacity, "64")),
            outcomes: vec![Outcome::fail("min(cpuCapacity) < 64", "too small")],
            ..Default::default()
        };
        let err = analyze_node_resources(&spec, &three_node_store()).unwrap_err();
        let AnalyzeError::Conditional(err) = err else {
            panic!("expected conditional error, got {err}");
        };
        assert_eq!(err.kind, ConditionalErrorKind::NoValue("cpuCapacity".into()));
    }

    #[test]
    fn test_missing_nodes_file_is_fetch_error() {
        let err = analyze_node_resources(&node_count_spec(), &MemoryStore::new()).unwrap_err();
        assert!(matches!(err, AnalyzeError::Fetch { ref key, .. } if key == NODES_KEY));
    }

    #[test]
    fn test_malformed_nodes_file_is_decode_error() {
        let store = MemoryStore::new().with_file(NODES_KEY, "not json");
        let err = analyze_node_resources(&node_count_spec(), &store).unwrap_err();
        assert!(matches!(err, AnalyzeError::Decode { .. }));
    }

    fn gated_spec(
        on_install: Option<AlternativeSpec>,
        on_update: Option<AlternativeSpec>,
    ) -> NodeResourcesSpec {
        NodeResourcesSpec {
            gating: GatingSpec {
                deployment: Some(WorkloadRef {
                    namespace: "default".into(),
                    name: "kotsadm".into(),
                }),
                on_install,
                on_update,
            },
            ..node_count_spec()
        }
    }

    fn with_deployments(store: MemoryStore, names: &[&str]) -> MemoryStore {
        let deployments: Vec<_> = names
            .iter()
            .map(|name| json!({"metadata": {"name": name, "namespace": "default"}}))
            .collect();
        let payload = serde_json::to_string(&deployments).unwrap();
        store.with_file(deployments_key("default"), payload)
    }

    #[test]
    fn test_gate_present_without_update_specs_skips() {
        let store = with_deployments(three_node_store(), &["kotsadm"]);
        let result = analyze_node_resources(&gated_spec(None, None), &store).unwrap();

        assert_eq!(result.title, "Skipped: Node count");
        assert!(result.skipped);
        assert_eq!(result.verdict, Some(Verdict::Warn));
        assert!(!result.is_fail());
        assert!(result.message.contains("Deployment kotsadm found in the cluster"));
    }

    #[test]
    fn test_gate_skip_does_not_decode_nodes() {
        let store = MemoryStore::new().with_file(NODES_KEY, "garbage");
        let store = with_deployments(store, &["kotsadm"]);
        let result = analyze_node_resources(&gated_spec(None, None), &store).unwrap();
        assert!(result.is_warn());
    }

    #[test]
    fn test_gate_absent_without_install_specs_keeps_original() {
        let store = with_deployments(three_node_store(), &["something-else"]);
        let update = AlternativeSpec {
            filters: None,
            outcomes: vec![Outcome::pass("", "update path")],
        };
        let result = analyze_node_resources(&gated_spec(None, Some(update)), &store).unwrap();

        assert_eq!(result.verdict, Some(Verdict::Warn));
        assert_eq!(result.message, "This application recommends at least 5 nodes");
        assert!(!result.skipped);
    }

    #[test]
    fn test_gate_substitutes_filters_and_outcomes() {
        let install = AlternativeSpec {
            filters: Some(
                FilterSpec::default().with_threshold(NodeProperty::MemoryCapacity, "16Gi"),
            ),
            outcomes: vec![
                Outcome::fail("count() < 2", "install needs two large nodes"),
                Outcome::pass("", "install ok"),
            ],
        };
        let update = AlternativeSpec {
            filters: None,
            outcomes: vec![Outcome::pass("count() >= 1", "update ok")],
        };

        let spec = gated_spec(Some(install), Some(update));

        let absent = with_deployments(three_node_store(), &[]);
        let result = analyze_node_resources(&spec, &absent).unwrap();
        assert_eq!(result.message, "install ok");

        let present = with_deployments(three_node_store(), &["kotsadm"]);
        let result = analyze_node_resources(&spec, &present).unwrap();
        assert_eq!(result.message, "update ok");
    }

    #[test]
    fn test_gate_missing_deployments_file_fails() {
        let err = analyze_node_resources(&gated_spec(None, None), &three_node_store()).unwrap_err();
        assert!(
            matches!(err, AnalyzeError::Fetch { ref key, .. } if key == &deployments_key("default"))
        );
    }

    #[test]
    fn test_directory_bundle_with_yaml_spec() {
        let temp_dir = TempDir::new().unwrap();
        let resources = temp_dir.path().join("cluster-resources");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(
            resources.join("nodes.json"),
            nodes_json(&[("a", "worker", "4", "8Gi"), ("b", "worker", "2", "8Gi")]),
        )
        .unwrap();

        let spec = PreflightSpec::from_yaml_str(
            r#"
spec:
  analyzers:
    - nodeResources:
        checkName: CPU cores
        outcomes:
          - fail:
              when: "min(cpuCapacity) < 4"
              message: Every node needs at least 4 cores
          - pass:
              message: All nodes have at least 4 cores
"#,
        )
        .unwrap();
        let analyzer = spec.analyzers()[0].node_resources.as_ref().unwrap();

        let store = DirectoryStore::new(temp_dir.path());
        let result = analyze_node_resources(analyzer, &store).unwrap();
        assert!(result.is_fail());
        assert_eq!(result.message, "Every node needs at least 4 cores");
    }
}
