use num_traits::Float;

use crate::similar::{similar_gene_counts, similar_genes};
use crate::validation::{validate_mode_combination, DataValidator};
use crate::{
    Agglomerative, Assignment, CancelToken, ClusterError, ClusterNode, ClusterParams, Distance,
    DistanceMatrix, GeneCount, GeneId, GeneVector, GeneVectorSource, HierarchicalClusterAdapter,
    HierarchicalResult, KMeansPartitioner, KMeansResult, SimilarGene, TreeBuilder,
};

/// The clustering methods a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterMethod {
    /// Genes within the similarity threshold of the current gene.
    SimilarGenes,
    /// Per-gene count of genes within the similarity threshold.
    SimilarGeneCounts,
    /// Maximin seeded K-means-like partitioning.
    KMeans,
    /// Hierarchical tree with ordered leaves.
    Hierarchical,
    /// Recognised but not implemented; requests are rejected.
    SelfOrganizingMap,
}

/// Normalization mode the gene vectors were prepared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    #[default]
    None,
    Global,
    /// Each sample normalized on its own.
    PerSample,
}

/// Whether a session is running, and which method it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Inactive,
    Active(ClusterMethod),
}

/// A single clustering request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRequest {
    pub method: ClusterMethod,
    /// Number of K-means nodes.
    pub k: usize,
    /// Gene to seed node 1 with, or to search around for similar genes.
    pub current_gene: Option<GeneId>,
    /// Whether the gene set is the full gene universe rather than a filtered list.
    pub all_genes: bool,
    pub normalization: Normalization,
    /// Tear down the active session even when it runs the same method.
    pub force_reset: bool,
}

impl ClusterRequest {
    pub fn new(method: ClusterMethod) -> Self {
        Self {
            method,
            k: 1,
            current_gene: None,
            all_genes: false,
            normalization: Normalization::None,
            force_reset: false,
        }
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn current_gene(mut self, id: GeneId) -> Self {
        self.current_gene = Some(id);
        self
    }

    pub fn all_genes(mut self, all_genes: bool) -> Self {
        self.all_genes = all_genes;
        self
    }

    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn force_reset(mut self, force_reset: bool) -> Self {
        self.force_reset = force_reset;
        self
    }
}

/// Method specific results of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterOutput<T> {
    SimilarGenes(Vec<SimilarGene<T>>),
    SimilarGeneCounts(Vec<GeneCount>),
    KMeans(KMeansResult<T>),
    Hierarchical(HierarchicalResult<T>),
}

/// All state of the one active clustering request. Owned by the
/// [`ClusterLifecycleManager`]; reporting collaborators only ever borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringSession<T> {
    method: ClusterMethod,
    genes: Vec<GeneVector<T>>,
    normalization: Normalization,
    distances: DistanceMatrix<T>,
    /// Which distance function built `distances`.
    distance_generation: usize,
    output: ClusterOutput<T>,
}

impl<T> ClusteringSession<T> {
    pub fn method(&self) -> ClusterMethod {
        self.method
    }

    pub fn genes(&self) -> &[GeneVector<T>] {
        &self.genes
    }

    /// Normalization the gene vectors were prepared under.
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn distances(&self) -> &DistanceMatrix<T> {
        &self.distances
    }

    pub fn output(&self) -> &ClusterOutput<T> {
        &self.output
    }

    /// K-means nodes; empty for other methods.
    pub fn nodes(&self) -> &[ClusterNode<T>] {
        match &self.output {
            ClusterOutput::KMeans(result) => &result.nodes,
            _ => &[],
        }
    }

    /// K-means assignments; empty for other methods.
    pub fn assignments(&self) -> &[Assignment<T>] {
        match &self.output {
            ClusterOutput::KMeans(result) => &result.assignments,
            _ => &[],
        }
    }

    /// Hierarchical leaf order as gene indices.
    pub fn leaf_order(&self) -> Option<&[usize]> {
        match &self.output {
            ClusterOutput::Hierarchical(result) => Some(&result.leaf_order),
            _ => None,
        }
    }
}

/// Per-gene annotations over the whole gene universe, indexed by [`GeneId`].
/// Only the active session writes them and they are zeroed when it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotations {
    node_number: Vec<usize>,
    member_count: Vec<usize>,
}

impl Annotations {
    fn new(universe_size: usize) -> Self {
        Self { node_number: vec![0; universe_size], member_count: vec![0; universe_size] }
    }

    /// Node the gene was assigned to, zero when unassigned.
    pub fn node_number(&self, id: GeneId) -> usize {
        self.node_number.get(id).copied().unwrap_or(0)
    }

    /// Cluster membership count recorded for the gene, zero when unset.
    pub fn member_count(&self, id: GeneId) -> usize {
        self.member_count.get(id).copied().unwrap_or(0)
    }

    pub fn universe_size(&self) -> usize {
        self.node_number.len()
    }

    pub fn is_clear(&self) -> bool {
        self.node_number.iter().chain(&self.member_count).all(|&v| v == 0)
    }

    fn clear(&mut self) {
        self.node_number.iter_mut().for_each(|v| *v = 0);
        self.member_count.iter_mut().for_each(|v| *v = 0);
    }

    fn record<T>(&mut self, output: &ClusterOutput<T>, current_gene: Option<GeneId>) {
        match output {
            ClusterOutput::KMeans(result) => {
                for a in &result.assignments {
                    self.node_number[a.gene_id] = a.node_number;
                }
                for node in &result.nodes {
                    self.member_count[node.gene_id] = node.n_members;
                }
            }
            ClusterOutput::SimilarGenes(hits) => {
                for hit in hits {
                    self.node_number[hit.gene_id] = 1;
                }
                if let Some(id) = current_gene {
                    self.member_count[id] = hits.len();
                }
            }
            ClusterOutput::SimilarGeneCounts(counts) => {
                for c in counts {
                    self.member_count[c.gene_id] = c.count;
                }
            }
            ClusterOutput::Hierarchical(_) => {}
        }
    }
}

/// External reporting collaborator. Calls are fire-and-forget; the manager
/// never waits on or inspects the outcome.
pub trait Notifier {
    /// A failed request, described for the user.
    fn notify(&mut self, _message: &str) {}

    /// Progress through a long running request.
    fn progress(&mut self, _message: &str) {}

    /// Reports and windows belonging to `method` should close.
    fn close_reports(&mut self, _method: ClusterMethod) {}
}

/// A [`Notifier`] that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {}

struct RetainedDistances<T> {
    genes: Vec<GeneVector<T>>,
    normalization: Normalization,
    matrix: DistanceMatrix<T>,
}

impl<T: PartialEq> RetainedDistances<T> {
    /// Same ids in the same order, with identical values, prepared under the
    /// same normalization.
    fn matches(&self, genes: &[GeneVector<T>], normalization: Normalization) -> bool {
        self.normalization == normalization
            && self.genes.len() == genes.len()
            && self
                .genes
                .iter()
                .zip(genes)
                .all(|(kept, gene)| kept.id == gene.id && kept.values == gene.values)
    }
}

/// A request that passed every check that needs no distances.
#[derive(Debug, Clone, Copy)]
struct Plan {
    k: usize,
    current: Option<usize>,
}

/// Runs clustering requests while guaranteeing that at most one session is
/// active. Starting a different method tears the previous session down first,
/// closing its reports and zeroing the per-gene annotations.
///
/// ```
/// use geneclust::{CancelToken, ClusterLifecycleManager, ClusterMethod, ClusterParams,
///                 ClusterRequest, GeneVector, ManagerState};
///
/// let genes: Vec<GeneVector<f64>> = vec![
///     GeneVector::new(0, vec![0.0, 0.0]),
///     GeneVector::new(1, vec![10.0, 0.0]),
///     GeneVector::new(2, vec![0.0, 10.0]),
///     GeneVector::new(3, vec![10.0, 10.0]),
/// ];
/// let mut manager = ClusterLifecycleManager::new(4, ClusterParams::default());
/// let request = ClusterRequest::new(ClusterMethod::KMeans).k(2);
/// assert!(manager.activate(&request, &genes, &CancelToken::new()));
/// assert_eq!(manager.state(), ManagerState::Active(ClusterMethod::KMeans));
/// assert_eq!(manager.annotations().node_number(3), 2);
///
/// manager.reset();
/// assert_eq!(manager.state(), ManagerState::Inactive);
/// assert!(manager.annotations().is_clear());
/// ```
pub struct ClusterLifecycleManager<T> {
    params: ClusterParams,
    dist: Box<dyn Distance<T>>,
    tree_builder: Box<dyn TreeBuilder<T>>,
    notifier: Box<dyn Notifier>,
    annotations: Annotations,
    session: Option<ClusteringSession<T>>,
    retained: Option<RetainedDistances<T>>,
    distance_generation: usize,
}

impl<T: Float + 'static> ClusterLifecycleManager<T> {
    /// # Parameters
    /// * `universe_size` - number of genes in the full gene universe. Gene ids
    ///   must be below it.
    /// * `params` - engine settings.
    pub fn new(universe_size: usize, params: ClusterParams) -> Self {
        Self {
            dist: Box::new(params.dist_metric),
            params,
            tree_builder: Box::new(Agglomerative),
            notifier: Box::new(NullNotifier),
            annotations: Annotations::new(universe_size),
            session: None,
            retained: None,
            distance_generation: 0,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the default agglomerative tree builder.
    pub fn with_tree_builder(mut self, tree_builder: Box<dyn TreeBuilder<T>>) -> Self {
        self.tree_builder = tree_builder;
        self
    }

    /// Replaces the configured distance metric with a caller supplied one.
    pub fn with_distance(mut self, dist: Box<dyn Distance<T>>) -> Self {
        self.dist = dist;
        self.retained = None;
        self.distance_generation += 1;
        self
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    pub fn state(&self) -> ManagerState {
        match &self.session {
            Some(session) => ManagerState::Active(session.method),
            None => ManagerState::Inactive,
        }
    }

    pub fn active_method(&self) -> Option<ClusterMethod> {
        self.session.as_ref().map(|s| s.method)
    }

    pub fn session(&self) -> Option<&ClusteringSession<T>> {
        self.session.as_ref()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn has_retained_distances(&self) -> bool {
        self.retained.is_some()
    }

    /// Starts a session for `request` over the genes of `source`.
    ///
    /// An active session of a different method (or any session when the request
    /// forces a reset) is torn down first. An active session of the same method
    /// survives a request rejected by its checks, and is otherwise replaced
    /// without closing its reports. Returns false when the request is rejected,
    /// fails or is cancelled. Failures are passed to the notifier, cancellation
    /// is not. A failure or cancellation after the checks leaves the manager
    /// inactive.
    pub fn activate<S>(&mut self, request: &ClusterRequest, source: &S, cancel: &CancelToken) -> bool
    where
        S: GeneVectorSource<T> + ?Sized,
    {
        let genes = source.vectors();
        let replaces_same = match self.active_method() {
            Some(previous) if previous == request.method && !request.force_reset => true,
            Some(_) => {
                self.teardown();
                false
            }
            None => false,
        };

        let plan = match self.check_request(request, genes) {
            Ok(plan) => plan,
            Err(e) => {
                self.reject(request.method, &e);
                return false;
            }
        };
        if replaces_same {
            self.release_session();
        }

        match self.run(request, genes, plan, cancel) {
            Ok(session) => {
                self.annotations.record(&session.output, request.current_gene);
                tracing::info!(method = ?request.method, genes = session.genes.len(), "clustering session active");
                self.session = Some(session);
                true
            }
            Err(ClusterError::Cancelled) => {
                tracing::info!(method = ?request.method, "clustering cancelled");
                self.teardown();
                false
            }
            Err(e) => {
                self.reject(request.method, &e);
                false
            }
        }
    }

    /// Ends the active session, if any: releases its results, zeroes the
    /// annotations and asks the notifier to close the method's reports.
    pub fn teardown(&mut self) {
        let Some(method) = self.active_method() else {
            return;
        };
        self.release_session();
        self.notifier.close_reports(method);
        tracing::info!(?method, "clustering session torn down");
    }

    /// Tears down whatever is active and clears every annotation.
    pub fn reset(&mut self) {
        self.teardown();
        self.annotations.clear();
    }

    /// Resets and resizes the gene universe. Any retained distances belong to
    /// the old universe and are dropped.
    pub fn resize_universe(&mut self, universe_size: usize) {
        self.reset();
        self.retained = None;
        self.annotations = Annotations::new(universe_size);
    }

    /// Drops retained distances so the next session rebuilds them.
    pub fn invalidate_distances(&mut self) {
        self.retained = None;
    }

    fn release_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.annotations.clear();
        if self.params.retain_distance_matrix && session.distance_generation == self.distance_generation {
            self.retained = Some(RetainedDistances {
                genes: session.genes,
                normalization: session.normalization,
                matrix: session.distances,
            });
        }
    }

    fn reject(&mut self, method: ClusterMethod, error: &ClusterError) {
        tracing::warn!(?method, %error, "clustering request rejected");
        self.notifier.notify(&error.to_string());
    }

    /// Every check that can be made before any distance is computed.
    fn check_request(
        &self,
        request: &ClusterRequest,
        genes: &[GeneVector<T>],
    ) -> Result<Plan, ClusterError> {
        let validator = DataValidator::new(genes, &self.params);
        validator.validate_gene_count()?;
        if request.method == ClusterMethod::SelfOrganizingMap {
            return Err(ClusterError::NotImplemented(request.method));
        }
        validator.validate_input_data()?;
        let k = match request.method {
            ClusterMethod::KMeans => validator.validate_node_count(request.k)?,
            _ => 0,
        };
        if request.method == ClusterMethod::Hierarchical {
            validate_mode_combination(request.all_genes, request.normalization)?;
        }
        self.check_universe(genes)?;
        let current = self.current_gene_index(request, genes)?;
        Ok(Plan { k, current })
    }

    fn run(
        &mut self,
        request: &ClusterRequest,
        genes: &[GeneVector<T>],
        plan: Plan,
        cancel: &CancelToken,
    ) -> Result<ClusteringSession<T>, ClusterError> {
        self.notifier.progress("computing gene distances");
        let distances = self.distances_for(genes, request.normalization, cancel)?;
        self.notifier.progress("clustering genes");

        match self.cluster(request, genes, &distances, plan, cancel) {
            Ok(output) => Ok(ClusteringSession {
                method: request.method,
                genes: genes.to_vec(),
                normalization: request.normalization,
                distances,
                distance_generation: self.distance_generation,
                output,
            }),
            Err(e) => {
                // The matrix is still valid for this gene set
                if self.params.retain_distance_matrix {
                    self.retained = Some(RetainedDistances {
                        genes: genes.to_vec(),
                        normalization: request.normalization,
                        matrix: distances,
                    });
                }
                Err(e)
            }
        }
    }

    fn cluster(
        &self,
        request: &ClusterRequest,
        genes: &[GeneVector<T>],
        distances: &DistanceMatrix<T>,
        plan: Plan,
        cancel: &CancelToken,
    ) -> Result<ClusterOutput<T>, ClusterError> {
        let threshold = T::from(self.params.similarity_threshold).unwrap_or_else(T::zero);
        let output = match request.method {
            ClusterMethod::KMeans => ClusterOutput::KMeans(
                KMeansPartitioner::new(genes, distances, &*self.dist, self.params.center)
                    .partition(plan.k, plan.current, cancel)?,
            ),
            ClusterMethod::Hierarchical => ClusterOutput::Hierarchical(
                HierarchicalClusterAdapter::new(
                    genes,
                    distances,
                    &*self.dist,
                    self.params.linkage,
                    self.params.leaf_order,
                )
                .with_mode(request.all_genes, request.normalization)
                .run(&*self.tree_builder, cancel)?,
            ),
            ClusterMethod::SimilarGenes => {
                let current = plan.current.ok_or_else(|| {
                    ClusterError::UnknownGene(String::from("similar genes needs a current gene"))
                })?;
                ClusterOutput::SimilarGenes(similar_genes(genes, distances, current, threshold, cancel)?)
            }
            ClusterMethod::SimilarGeneCounts => ClusterOutput::SimilarGeneCounts(
                similar_gene_counts(genes, distances, threshold, cancel)?,
            ),
            ClusterMethod::SelfOrganizingMap => return Err(ClusterError::NotImplemented(request.method)),
        };
        Ok(output)
    }

    fn check_universe(&self, genes: &[GeneVector<T>]) -> Result<(), ClusterError> {
        let universe = self.annotations.universe_size();
        let mut seen = vec![false; universe];
        for gene in genes {
            if gene.id >= universe {
                return Err(ClusterError::UnknownGene(format!(
                    "gene id {} is outside the universe of {universe} genes",
                    gene.id
                )));
            }
            if std::mem::replace(&mut seen[gene.id], true) {
                return Err(ClusterError::DuplicateGene(gene.id));
            }
        }
        Ok(())
    }

    /// Index of the request's current gene within `genes`. For similar genes
    /// an unknown current gene is an error; K-means falls back to its own
    /// choice of first node.
    fn current_gene_index(
        &self,
        request: &ClusterRequest,
        genes: &[GeneVector<T>],
    ) -> Result<Option<usize>, ClusterError> {
        let Some(id) = request.current_gene else {
            return Ok(None);
        };
        match genes.iter().position(|g| g.id == id) {
            Some(index) => Ok(Some(index)),
            None if request.method == ClusterMethod::SimilarGenes => Err(ClusterError::UnknownGene(
                format!("current gene {id} is not in the gene set"),
            )),
            None => {
                tracing::warn!(id, "current gene is not in the gene set, ignoring it");
                Ok(None)
            }
        }
    }

    fn distances_for(
        &mut self,
        genes: &[GeneVector<T>],
        normalization: Normalization,
        cancel: &CancelToken,
    ) -> Result<DistanceMatrix<T>, ClusterError> {
        if let Some(retained) = self.retained.take() {
            if retained.matches(genes, normalization) {
                tracing::debug!(genes = genes.len(), "reusing retained distance matrix");
                return Ok(retained.matrix);
            }
            tracing::debug!("gene set changed, dropping retained distance matrix");
        }
        DistanceMatrix::build(genes, &*self.dist, cancel)
    }
}
