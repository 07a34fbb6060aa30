use geneclust::{
    addr_1d, CancelToken, Center, ClusterError, ClusterLifecycleManager, ClusterMethod,
    ClusterOutput, ClusterParams, ClusterRequest, DistanceMatrix, DistanceMetric, GeneVector,
    HierarchicalClusterAdapter, KMeansPartitioner, LeafOrder, Linkage, ManagerState,
    Normalization,
};
use std::collections::HashSet;

#[test]
fn addr_symmetric_for_large_indices() {
    for (x, y) in [(0, 0), (1, 0), (1000, 3), (77, 4096), (65_535, 65_534)] {
        assert_eq!(addr_1d(x, y), addr_1d(y, x));
    }
}

#[test]
fn kmeans_square_example() {
    let data = square();
    let mut manager = ClusterLifecycleManager::new(4, ClusterParams::default());
    let request = ClusterRequest::new(ClusterMethod::KMeans).k(2);
    assert!(manager.activate(&request, &data, &CancelToken::new()));

    let session = manager.session().unwrap();
    let reps: Vec<_> = session.nodes().iter().map(|n| n.gene_id).collect();
    assert_eq!(reps, vec![0, 3]);
    assert!((session.nodes()[1].seed_distance - 200.0_f64.sqrt()).abs() < 1e-9);
    // B is 10 from both A and D; the tie goes to the first node
    assert_eq!(session.assignments()[1].node_number, 1);
}

#[test]
fn kmeans_partitions_blobs() {
    let data = blobs();
    let mut manager = ClusterLifecycleManager::new(data.len(), ClusterParams::default());
    let request = ClusterRequest::new(ClusterMethod::KMeans).k(3);
    assert!(manager.activate(&request, &data, &CancelToken::new()));

    let session = manager.session().unwrap();
    let labels: Vec<_> = session.assignments().iter().map(|a| a.node_number).collect();
    assert_eq!(1, labels[..4].iter().collect::<HashSet<_>>().len());
    assert_eq!(1, labels[4..8].iter().collect::<HashSet<_>>().len());
    assert_eq!(1, labels[8..].iter().collect::<HashSet<_>>().len());
    assert_eq!(3, labels.iter().collect::<HashSet<_>>().len());

    let total: usize = session.nodes().iter().map(|n| n.n_members).sum();
    assert_eq!(total, data.len());
    for node in session.nodes() {
        assert!(node.stats.mean < 1.0);
        assert!(node.nearest_node_distance > 5.0);
    }
}

#[test]
fn kmeans_caps_node_count() {
    let data = blobs();
    let params = ClusterParams::builder().max_nodes(2).build();
    let mut manager = ClusterLifecycleManager::new(data.len(), params);
    let request = ClusterRequest::new(ClusterMethod::KMeans).k(50);
    assert!(manager.activate(&request, &data, &CancelToken::new()));
    assert_eq!(manager.session().unwrap().nodes().len(), 2);
}

#[test]
fn kmeans_with_more_nodes_than_genes() {
    let data = square();
    let mut manager = ClusterLifecycleManager::new(4, ClusterParams::default());
    let request = ClusterRequest::new(ClusterMethod::KMeans).k(6);
    assert!(manager.activate(&request, &data, &CancelToken::new()));
    let session = manager.session().unwrap();
    assert_eq!(session.nodes().len(), 4);
    match session.output() {
        ClusterOutput::KMeans(result) => {
            assert_eq!(result.seeds.len(), 6);
            assert!(result.seeds[4..].iter().all(|s| s.gene_index.is_none()));
        }
        other => panic!("unexpected output {other:?}"),
    }
}

#[test]
fn kmeans_median_centers() {
    let data = blobs();
    let distances =
        DistanceMatrix::<f64>::build(&data, &DistanceMetric::Euclidean, &CancelToken::new()).unwrap();
    let km = KMeansPartitioner::new(&data, &distances, &DistanceMetric::Euclidean, Center::Median);
    let result = km.partition(3, Some(0), &CancelToken::new()).unwrap();
    assert_eq!(result.nodes[0].gene_index, 0);
    // Four members resolve to the lower middle value in each sample
    let centroid = &result.nodes[0].centroid;
    assert!((centroid[0] - 1.0).abs() < 1e-3);
    assert!((centroid[1] - 1.0).abs() < 1e-3);
}

#[test]
fn reactivating_same_method_resets_annotations() {
    let data = blobs();
    let mut manager = ClusterLifecycleManager::new(20, ClusterParams::default());
    let cancel = CancelToken::new();
    assert!(manager.activate(&ClusterRequest::new(ClusterMethod::KMeans).k(3), &data, &cancel));
    assert!(manager.annotations().node_number(11) > 0);

    manager.teardown();
    assert!(manager.annotations().is_clear());
    assert_eq!(manager.state(), ManagerState::Inactive);

    // A smaller gene set leaves the dropped genes unannotated
    assert!(manager.activate(&ClusterRequest::new(ClusterMethod::KMeans).k(1), &data[..4], &cancel));
    assert_eq!(manager.annotations().node_number(0), 1);
    assert_eq!(manager.annotations().node_number(11), 0);
    assert_eq!(manager.annotations().member_count(11), 0);
}

#[test]
fn hierarchical_orders_leaves_by_group() {
    let data = blobs();
    let params = ClusterParams::builder()
        .linkage(Linkage::NextMinimum)
        .leaf_order(LeafOrder::LeftToRight)
        .build();
    let mut manager = ClusterLifecycleManager::new(data.len(), params);
    let request = ClusterRequest::new(ClusterMethod::Hierarchical);
    assert!(manager.activate(&request, &data, &CancelToken::new()));

    let order = manager.session().unwrap().leaf_order().unwrap().to_vec();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..data.len()).collect::<Vec<_>>());
    // Each group of four sits contiguously in the leaf order
    for chunk in order.chunks(4) {
        let groups: HashSet<_> = chunk.iter().map(|i| i / 4).collect();
        assert_eq!(1, groups.len());
    }
}

#[test]
fn hierarchical_preconditions() {
    let cancel = CancelToken::new();
    let one = vec![GeneVector::new(0, vec![1.0_f64, 2.0])];
    let mut manager = ClusterLifecycleManager::new(2, ClusterParams::default());
    assert!(!manager.activate(&ClusterRequest::new(ClusterMethod::Hierarchical), &one, &cancel));

    let no_samples: Vec<GeneVector<f64>> = vec![GeneVector::new(0, vec![]), GeneVector::new(1, vec![])];
    assert!(!manager.activate(&ClusterRequest::new(ClusterMethod::Hierarchical), &no_samples, &cancel));
    assert_eq!(manager.state(), ManagerState::Inactive);

    let data = square();
    let distances = DistanceMatrix::<f64>::build(&data, &DistanceMetric::Euclidean, &cancel).unwrap();
    let adapter = HierarchicalClusterAdapter::new(
        &data[..1],
        &distances,
        &DistanceMetric::Euclidean,
        Linkage::CentroidAverage,
        LeafOrder::RightToLeft,
    );
    assert!(matches!(adapter.validate(), Err(ClusterError::TooFewGenes { found: 1, .. })));
}

#[test]
fn hierarchical_rejects_all_genes_per_sample() {
    let data = square();
    let mut manager = ClusterLifecycleManager::new(4, ClusterParams::default());
    let request = ClusterRequest::new(ClusterMethod::Hierarchical)
        .all_genes(true)
        .normalization(Normalization::PerSample);
    assert!(!manager.activate(&request, &data, &CancelToken::new()));

    let request = request.normalization(Normalization::Global);
    assert!(manager.activate(&request, &data, &CancelToken::new()));
}

#[test]
fn correlation_distance_groups_profiles_by_shape() {
    let data: Vec<GeneVector<f64>> = vec![
        GeneVector::new(0, vec![1.0, 2.0, 3.0, 4.0]),
        GeneVector::new(1, vec![4.0, 3.0, 2.0, 1.0]),
        GeneVector::new(2, vec![10.0, 20.0, 30.0, 40.0]),
        GeneVector::new(3, vec![40.0, 30.0, 20.0, 10.0]),
    ];
    let params = ClusterParams::builder().dist_metric(DistanceMetric::Correlation).build();
    let mut manager = ClusterLifecycleManager::new(4, params);
    let request = ClusterRequest::new(ClusterMethod::KMeans).k(2).current_gene(0);
    assert!(manager.activate(&request, &data, &CancelToken::new()));
    let a = manager.annotations();
    assert_eq!(a.node_number(0), a.node_number(2));
    assert_eq!(a.node_number(1), a.node_number(3));
    assert_ne!(a.node_number(0), a.node_number(1));
}

#[test]
fn similar_gene_counts_annotate_every_gene() {
    let data = blobs();
    let params = ClusterParams::builder().similarity_threshold(1.0).build();
    let mut manager = ClusterLifecycleManager::new(data.len(), params);
    let request = ClusterRequest::new(ClusterMethod::SimilarGeneCounts);
    assert!(manager.activate(&request, &data, &CancelToken::new()));
    for id in 0..data.len() {
        assert_eq!(manager.annotations().member_count(id), 3);
    }

    manager.reset();
    assert!(manager.annotations().is_clear());
}

fn square() -> Vec<GeneVector<f64>> {
    vec![
        GeneVector::new(0, vec![0.0, 0.0]).with_name("A"),
        GeneVector::new(1, vec![10.0, 0.0]).with_name("B"),
        GeneVector::new(2, vec![0.0, 10.0]).with_name("C"),
        GeneVector::new(3, vec![10.0, 10.0]).with_name("D"),
    ]
}

fn blobs() -> Vec<GeneVector<f64>> {
    [
        [1.0, 1.0],
        [1.2, 1.1],
        [1.1, 1.3],
        [0.9, 1.0],
        [8.0, 8.0],
        [8.2, 8.1],
        [7.9, 8.3],
        [8.1, 7.8],
        [1.0, 9.0],
        [1.2, 9.1],
        [0.8, 8.9],
        [1.1, 9.2],
    ]
    .iter()
    .enumerate()
    .map(|(id, v)| GeneVector::new(id, v.to_vec()))
    .collect()
}
