// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `bootstrap.rs`

#[cfg(test)]
mod tests {
    use super::super::{decide, decide_from, declared_regions, BootstrapReason};
    use crate::crd::{ManagedRegion, Region, RegionKind, UnmanagedRegion};
    use crate::reconcilers::test_support::{test_cluster, FakeProber, MemoryStore, NAMESPACE};
    use k8s_openapi::api::core::v1::PersistentVolumeClaim;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    const R1: &str = "cc-cassandra-prober-db.eu.example.com";
    const R2: &str = "cc-cassandra-prober-db.us.example.com";

    fn managed(name: &str) -> Region {
        Region {
            name: name.to_string(),
            kind: RegionKind::Managed,
        }
    }

    fn claim(name: &str) -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            ..PersistentVolumeClaim::default()
        }
    }

    #[test]
    fn test_fresh_cluster_with_unready_region_uses_default() {
        let ready = BTreeMap::from([("R1".to_string(), false)]);

        let decision = decide_from(false, &[managed("R1")], &ready);

        assert!(!decision.use_provided_credentials);
        assert_eq!(decision.reason, BootstrapReason::FreshCluster);
    }

    #[test]
    fn test_existing_storage_always_uses_provided() {
        let unmanaged = Region {
            name: "unmanaged-0".to_string(),
            kind: RegionKind::Unmanaged,
        };
        let inputs: [(Vec<Region>, BTreeMap<String, bool>); 3] = [
            (vec![], BTreeMap::new()),
            (vec![managed("R1")], BTreeMap::from([("R1".to_string(), false)])),
            (vec![managed("R1"), unmanaged], BTreeMap::new()),
        ];

        for (regions, ready) in inputs {
            let decision = decide_from(true, &regions, &ready);
            assert!(decision.use_provided_credentials);
            assert_eq!(decision.reason, BootstrapReason::StorageExists);
        }
    }

    #[test]
    fn test_unmanaged_region_uses_provided() {
        let regions = [Region {
            name: "unmanaged-0".to_string(),
            kind: RegionKind::Unmanaged,
        }];

        let decision = decide_from(false, &regions, &BTreeMap::new());

        assert!(decision.use_provided_credentials);
        assert_eq!(decision.reason, BootstrapReason::UnmanagedRegionDeclared);
    }

    #[test]
    fn test_any_ready_managed_region_uses_provided() {
        let ready = BTreeMap::from([("R1".to_string(), false), ("R2".to_string(), true)]);

        let decision = decide_from(false, &[managed("R1"), managed("R2")], &ready);

        assert!(decision.use_provided_credentials);
        assert_eq!(
            decision.reason,
            BootstrapReason::ManagedRegionReady("R2".to_string())
        );
    }

    #[test]
    fn test_declared_regions_names() {
        let mut cluster = test_cluster(&[("dc1", 1)]);
        cluster.spec.external_regions.managed = vec![
            ManagedRegion {
                domain: "eu.example.com".to_string(),
                namespace: None,
            },
            ManagedRegion {
                domain: "us.example.com".to_string(),
                namespace: Some("cassandra".to_string()),
            },
        ];
        cluster.spec.external_regions.unmanaged = vec![UnmanagedRegion::default()];

        let regions = declared_regions(&cluster, NAMESPACE);

        assert_eq!(
            regions,
            vec![
                managed(R1),
                managed("cc-cassandra-prober-cassandra.us.example.com"),
                Region {
                    name: "unmanaged-0".to_string(),
                    kind: RegionKind::Unmanaged,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_storage_skips_probes() {
        let store = MemoryStore::new();
        store.insert(NAMESPACE, claim("data-cc-cassandra-dc1-0"));
        let prober = FakeProber::default();
        let mut cluster = test_cluster(&[("dc1", 3)]);
        cluster.spec.external_regions.managed = vec![ManagedRegion {
            domain: "eu.example.com".to_string(),
            namespace: None,
        }];

        let decision = decide(&store, &prober, &cluster).await.unwrap();

        assert!(decision.use_provided_credentials);
        assert!(prober.probed().is_empty());
    }

    #[tokio::test]
    async fn test_storage_of_any_dc_counts() {
        let store = MemoryStore::new();
        store.insert(NAMESPACE, claim("data-cc-cassandra-dc2-0"));
        let cluster = test_cluster(&[("dc1", 3), ("dc2", 3)]);

        let decision = decide(&store, &FakeProber::default(), &cluster)
            .await
            .unwrap();

        assert_eq!(decision.reason, BootstrapReason::StorageExists);
    }

    #[tokio::test]
    async fn test_unreachable_region_is_not_ready() {
        let store = MemoryStore::new();
        let prober = FakeProber::default();
        let mut cluster = test_cluster(&[("dc1", 3)]);
        cluster.spec.external_regions.managed = vec![ManagedRegion {
            domain: "eu.example.com".to_string(),
            namespace: None,
        }];

        let decision = decide(&store, &prober, &cluster).await.unwrap();

        assert!(!decision.use_provided_credentials);
        assert_eq!(prober.probed(), vec![R1.to_string()]);
    }

    #[tokio::test]
    async fn test_probing_stops_at_first_ready_region() {
        let store = MemoryStore::new();
        let prober = FakeProber::default();
        prober.set_ready(R1, true);
        prober.set_ready(R2, true);
        let mut cluster = test_cluster(&[("dc1", 3)]);
        cluster.spec.external_regions.managed = vec![
            ManagedRegion {
                domain: "eu.example.com".to_string(),
                namespace: None,
            },
            ManagedRegion {
                domain: "us.example.com".to_string(),
                namespace: None,
            },
        ];

        let decision = decide(&store, &prober, &cluster).await.unwrap();

        assert_eq!(
            decision.reason,
            BootstrapReason::ManagedRegionReady(R1.to_string())
        );
        assert_eq!(prober.probed(), vec![R1.to_string()]);
    }
}
