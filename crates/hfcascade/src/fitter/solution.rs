use crate::track::TrackParCov;

/// Why a fit attempt (or a single seed) produced no solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitRejection {
    /// The transverse trajectories have no usable crossing.
    NoSeed,
    /// Track z values at the seed differ by more than `max_dz_ini`.
    InitialDzExceeded,
    /// A track could not be transported to the vertex estimate.
    PropagationFailed,
    /// The normal equations are (numerically) singular.
    SingularSystem,
    /// A non-finite value appeared during iteration.
    NonFinite,
    /// Iteration budget exhausted without meeting a stopping criterion.
    NotConverged,
    /// Vertex radius exceeds `max_r`.
    RadiusExceeded,
    /// Final chi2 exceeds `max_chi2`.
    Chi2Exceeded,
}

impl FitRejection {
    pub const ALL: [FitRejection; 8] = [
        Self::NoSeed,
        Self::InitialDzExceeded,
        Self::PropagationFailed,
        Self::SingularSystem,
        Self::NonFinite,
        Self::NotConverged,
        Self::RadiusExceeded,
        Self::Chi2Exceeded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSeed => "no_seed",
            Self::InitialDzExceeded => "initial_dz_exceeded",
            Self::PropagationFailed => "propagation_failed",
            Self::SingularSystem => "singular_system",
            Self::NonFinite => "non_finite",
            Self::NotConverged => "not_converged",
            Self::RadiusExceeded => "radius_exceeded",
            Self::Chi2Exceeded => "chi2_exceeded",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for FitRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for FitRejection {}

/// One converged vertex.
#[derive(Debug, Clone)]
pub struct VertexSolution<const N: usize> {
    pub position: [f64; 3],
    /// Packed `[xx, xy, yy, xz, yz, zz]`.
    pub covariance: [f64; 6],
    pub chi2: f64,
    pub iterations: usize,
    /// Daughter states; at the vertex when `propagate_to_pca` is set,
    /// otherwise the inputs unchanged.
    pub tracks: [TrackParCov; N],
    pub(crate) tracks_at_vertex: bool,
}

impl<const N: usize> VertexSolution<N> {
    pub fn tracks_at_vertex(&self) -> bool {
        self.tracks_at_vertex
    }

    /// Daughter states evaluated at the vertex, transporting on demand.
    pub fn daughters_at_vertex(&self, bz: f64) -> Result<[TrackParCov; N], FitRejection> {
        if self.tracks_at_vertex {
            return Ok(self.tracks);
        }
        let mut out = self.tracks;
        for trk in &mut out {
            let x = trk.local_x_of([self.position[0], self.position[1]]);
            trk.propagate_to(x, bz)
                .map_err(|_| FitRejection::PropagationFailed)?;
        }
        Ok(out)
    }

    /// Global momenta of the daughters at the vertex.
    pub fn momenta(&self, bz: f64) -> Result<[[f64; 3]; N], FitRejection> {
        let tracks = self.daughters_at_vertex(bz)?;
        Ok(std::array::from_fn(|i| tracks[i].pxpypz_glo()))
    }
}

/// Outcome of one `DcaFitter::process` call.
#[derive(Debug, Clone)]
pub struct VertexFit<const N: usize> {
    /// Converged solutions ordered by ascending chi2.
    pub solutions: Vec<VertexSolution<N>>,
    /// Reason of the last seed rejection, if any seed failed.
    pub rejection: Option<FitRejection>,
}

impl<const N: usize> VertexFit<N> {
    pub fn n_solutions(&self) -> usize {
        self.solutions.len()
    }

    pub fn best(&self) -> Option<&VertexSolution<N>> {
        self.solutions.first()
    }

    pub fn into_best(self) -> Option<VertexSolution<N>> {
        self.solutions.into_iter().next()
    }
}

/// Per-reason counters accumulated over the fitter lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FitterStats {
    pub calls: u64,
    pub with_solution: u64,
    rejections: [u64; 8],
}

impl FitterStats {
    pub(crate) fn record(&mut self, reason: FitRejection) {
        self.rejections[reason.index()] += 1;
    }

    pub fn rejections(&self, reason: FitRejection) -> u64 {
        self.rejections[reason.index()]
    }

    pub fn merge(&mut self, other: &FitterStats) {
        self.calls += other.calls;
        self.with_solution += other.with_solution;
        for (a, b) in self.rejections.iter_mut().zip(other.rejections.iter()) {
            *a += b;
        }
    }
}
