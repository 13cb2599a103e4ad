//! N-prong vertex finder minimizing distances of closest approach.
//!
//! The vertex `V` is refined by Gauss-Newton steps: every daughter is
//! transported to the local x of `V` in its own frame and contributes the
//! residual `(y_trk - y_V, z_trk - z_V)`. Seeds come from the transverse
//! crossing of the first two daughters; each seed is iterated independently
//! and converged solutions are returned ordered by chi2.

mod config;
mod seed;
mod solution;


pub use config::FitterConfig;
pub use solution::{FitRejection, FitterStats, VertexFit, VertexSolution};

use nalgebra::{Matrix2, Matrix3, SMatrix, Vector2, Vector3};

use crate::track::{TrackParCov, ALMOST0};

use seed::Seed2D;

/// Smallest accepted eigenvalue ratio of the normal matrix.
const SINGULAR_RATIO: f64 = 1e-12;
/// Below this chi2 the fit is considered exact.
const CHI2_FLOOR: f64 = 1e-20;
/// Solutions closer than this multiple of `min_param_change` are merged.
const DUPLICATE_SCALE: f64 = 10.0;

/// Iterative DCA vertex fitter for `N` track-like inputs.
///
/// The fitter is cheap to clone; one instance per worker keeps its
/// counters free of contention.
#[derive(Debug, Clone)]
pub struct DcaFitter<const N: usize> {
    config: FitterConfig,
    stats: FitterStats,
    last_rejection: Option<FitRejection>,
}

/// Seed with daughters aligned to their momentum at the seed.
struct PreparedSeed<const N: usize> {
    vertex: Vector3<f64>,
    tracks: [TrackParCov; N],
    sep2: f64,
    dz2: f64,
}

struct Linearization<const N: usize> {
    tracks: [TrackParCov; N],
    jacobians: [SMatrix<f64, 2, 3>; N],
    normal: Matrix3<f64>,
    gradient: Vector3<f64>,
    chi2: f64,
}

impl<const N: usize> DcaFitter<N> {
    const ARITY_CHECK: () = assert!(N >= 2, "a vertex needs at least two prongs");

    pub fn new(config: FitterConfig) -> Self {
        let () = Self::ARITY_CHECK;
        Self {
            config,
            stats: FitterStats::default(),
            last_rejection: None,
        }
    }

    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    pub fn stats(&self) -> &FitterStats {
        &self.stats
    }

    /// Rejection reason recorded by the most recent `process` call.
    pub fn last_rejection(&self) -> Option<FitRejection> {
        self.last_rejection
    }

    /// Fit a common vertex for `tracks`. Never panics; failures yield zero
    /// solutions with the reason in [`VertexFit::rejection`].
    pub fn process(&mut self, tracks: &[TrackParCov; N]) -> VertexFit<N> {
        self.stats.calls += 1;
        self.last_rejection = None;
        let bz = self.config.bz;

        let seeds = seed::crossings(&tracks[0].trajectory_2d(bz), &tracks[1].trajectory_2d(bz));
        if seeds.is_empty() {
            self.reject(FitRejection::NoSeed);
            return VertexFit {
                solutions: Vec::new(),
                rejection: self.last_rejection,
            };
        }

        let mut prepared = Vec::with_capacity(seeds.len());
        for s in seeds {
            match self.prepare_seed(tracks, s) {
                Ok(p) => prepared.push(p),
                Err(reason) => self.reject(reason),
            }
        }
        prepared.sort_by(|a, b| a.sep2.total_cmp(&b.sep2).then(a.dz2.total_cmp(&b.dz2)));

        let mut solutions: Vec<VertexSolution<N>> = Vec::with_capacity(prepared.len());
        for p in prepared {
            match self.iterate(tracks, p) {
                Ok(sol) => solutions.push(sol),
                Err(reason) => self.reject(reason),
            }
        }
        solutions.sort_by(|a, b| a.chi2.total_cmp(&b.chi2));
        let merge_dist = DUPLICATE_SCALE * self.config.min_param_change;
        let mut unique: Vec<VertexSolution<N>> = Vec::with_capacity(solutions.len());
        for sol in solutions {
            if !unique.iter().any(|u| distance(&u.position, &sol.position) < merge_dist) {
                unique.push(sol);
            }
        }

        if !unique.is_empty() {
            self.stats.with_solution += 1;
        }
        VertexFit {
            solutions: unique,
            rejection: self.last_rejection,
        }
    }

    fn reject(&mut self, reason: FitRejection) {
        tracing::trace!("{}-prong fit seed rejected: {}", N, reason);
        self.stats.record(reason);
        self.last_rejection = Some(reason);
    }

    fn prepare_seed(
        &self,
        tracks: &[TrackParCov; N],
        s: Seed2D,
    ) -> Result<PreparedSeed<N>, FitRejection> {
        let bz = self.config.bz;
        if s.x.hypot(s.y) > self.config.max_r {
            return Err(FitRejection::RadiusExceeded);
        }
        let mut aligned = *tracks;
        for trk in aligned.iter_mut() {
            trk.align_with_momentum()
                .map_err(|_| FitRejection::PropagationFailed)?;
            trk.propagate_to(trk.local_x_of([s.x, s.y]), bz)
                .map_err(|_| FitRejection::PropagationFailed)?;
            trk.align_with_momentum()
                .map_err(|_| FitRejection::PropagationFailed)?;
        }

        let mut z_min = f64::INFINITY;
        let mut z_max = f64::NEG_INFINITY;
        let mut z_sum = 0.0;
        for trk in &aligned {
            z_min = z_min.min(trk.z());
            z_max = z_max.max(trk.z());
            z_sum += trk.z();
        }
        let spread = z_max - z_min;
        if self.config.max_dz_ini > 0.0 && spread > self.config.max_dz_ini {
            return Err(FitRejection::InitialDzExceeded);
        }
        Ok(PreparedSeed {
            vertex: Vector3::new(s.x, s.y, z_sum / N as f64),
            tracks: aligned,
            sep2: s.sep2,
            dz2: spread * spread,
        })
    }

    fn iterate(
        &self,
        inputs: &[TrackParCov; N],
        seed: PreparedSeed<N>,
    ) -> Result<VertexSolution<N>, FitRejection> {
        let cfg = &self.config;
        let mut v = seed.vertex;
        let mut lin = self.linearize(&seed.tracks, &v)?;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < cfg.max_iterations {
            iterations += 1;
            let delta = solve(&lin.normal, &lin.gradient)?;
            let v_new = v + delta;
            if v_new.iter().any(|c| !c.is_finite()) {
                return Err(FitRejection::NonFinite);
            }
            let lin_new = self.linearize(&seed.tracks, &v_new)?;
            if lin_new.chi2 > lin.chi2 {
                converged = true;
                break;
            }
            let small_step = delta.amax() < cfg.min_param_change;
            let stalled =
                lin.chi2 < CHI2_FLOOR || lin_new.chi2 > lin.chi2 * cfg.min_rel_chi2_change;
            v = v_new;
            lin = lin_new;
            if small_step || stalled {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(FitRejection::NotConverged);
        }
        if v.x.hypot(v.y) > cfg.max_r {
            return Err(FitRejection::RadiusExceeded);
        }
        if lin.chi2 > cfg.max_chi2 {
            return Err(FitRejection::Chi2Exceeded);
        }

        let covariance = vertex_covariance(&lin).ok_or(FitRejection::SingularSystem)?;
        let (tracks, tracks_at_vertex) = if cfg.propagate_to_pca {
            (lin.tracks, true)
        } else {
            (*inputs, false)
        };
        Ok(VertexSolution {
            position: [v.x, v.y, v.z],
            covariance,
            chi2: lin.chi2,
            iterations,
            tracks,
            tracks_at_vertex,
        })
    }

    fn linearize(
        &self,
        prepared: &[TrackParCov; N],
        v: &Vector3<f64>,
    ) -> Result<Linearization<N>, FitRejection> {
        let bz = self.config.bz;
        let mut tracks = *prepared;
        let mut jacobians = [SMatrix::<f64, 2, 3>::zeros(); N];
        let mut normal = Matrix3::zeros();
        let mut gradient = Vector3::zeros();
        let mut chi2 = 0.0;

        for (trk, jac_out) in tracks.iter_mut().zip(jacobians.iter_mut()) {
            let (s, c) = trk.alpha().sin_cos();
            let xv = c * v.x + s * v.y;
            let yv = -s * v.x + c * v.y;
            trk.propagate_to(xv, bz)
                .map_err(|_| FitRejection::PropagationFailed)?;
            let csp = trk.csp();
            if csp < ALMOST0 {
                return Err(FitRejection::PropagationFailed);
            }
            let ty = trk.snp() / csp;
            let tz = trk.tgl() / csp;
            let res = Vector2::new(trk.y() - yv, trk.z() - v.z);
            let jac = SMatrix::<f64, 2, 3>::new(ty * c + s, ty * s - c, 0.0, tz * c, tz * s, -1.0);
            let w = if self.config.use_abs_dca {
                Matrix2::identity()
            } else {
                track_weight(trk).ok_or(FitRejection::SingularSystem)?
            };
            let jt_w = jac.transpose() * w;
            normal += jt_w * jac;
            gradient += jt_w * res;
            chi2 += res.dot(&(w * res));
            *jac_out = jac;
        }
        if !chi2.is_finite() {
            return Err(FitRejection::NonFinite);
        }
        Ok(Linearization {
            tracks,
            jacobians,
            normal,
            gradient,
            chi2,
        })
    }
}

fn track_weight(trk: &TrackParCov) -> Option<Matrix2<f64>> {
    Matrix2::new(trk.sigma_y2(), trk.sigma_zy(), trk.sigma_zy(), trk.sigma_z2()).try_inverse()
}

fn solve(normal: &Matrix3<f64>, gradient: &Vector3<f64>) -> Result<Vector3<f64>, FitRejection> {
    let eig = normal.symmetric_eigenvalues();
    let max = eig.amax();
    if !max.is_finite() || max <= 0.0 || eig.min() <= max * SINGULAR_RATIO {
        return Err(FitRejection::SingularSystem);
    }
    let chol = normal.cholesky().ok_or(FitRejection::SingularSystem)?;
    Ok(-chol.solve(gradient))
}

/// Inverse of the error-weighted normal matrix; falls back to the fitting
/// matrix when a daughter covariance is not invertible.
fn vertex_covariance<const N: usize>(lin: &Linearization<N>) -> Option<[f64; 6]> {
    let mut weighted = Matrix3::zeros();
    let mut usable = true;
    for (trk, jac) in lin.tracks.iter().zip(lin.jacobians.iter()) {
        match track_weight(trk) {
            Some(w) => weighted += jac.transpose() * w * jac,
            None => {
                usable = false;
                break;
            }
        }
    }
    let cov = if usable {
        weighted.try_inverse().or_else(|| lin.normal.try_inverse())
    } else {
        lin.normal.try_inverse()
    }?;
    Some([
        cov[(0, 0)],
        cov[(1, 0)],
        cov[(1, 1)],
        cov[(2, 0)],
        cov[(2, 1)],
        cov[(2, 2)],
    ])
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
