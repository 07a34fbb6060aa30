/// Identifier of a gene within the gene universe. Annotation arrays are indexed by it.
pub type GeneId = usize;

/// A single gene's expression profile, one value per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneVector<T> {
    pub id: GeneId,
    pub name: String,
    pub values: Vec<T>,
}

impl<T> GeneVector<T> {
    pub fn new(id: GeneId, values: Vec<T>) -> Self {
        Self { id, name: format!("gene{id}"), values }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of samples in the profile.
    pub fn n_samples(&self) -> usize {
        self.values.len()
    }
}

impl<T> AsRef<[T]> for GeneVector<T> {
    fn as_ref(&self) -> &[T] {
        &self.values
    }
}

/// Supplies the ordered, already filtered and normalized set of genes to cluster.
pub trait GeneVectorSource<T> {
    fn vectors(&self) -> &[GeneVector<T>];
}

impl<T> GeneVectorSource<T> for [GeneVector<T>] {
    fn vectors(&self) -> &[GeneVector<T>] {
        self
    }
}

impl<T> GeneVectorSource<T> for Vec<GeneVector<T>> {
    fn vectors(&self) -> &[GeneVector<T>] {
        self
    }
}
