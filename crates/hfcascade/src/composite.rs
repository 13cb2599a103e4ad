//! Neutral composite trajectories built from fitted vertices.
//!
//! The composite sits at the vertex with the summed daughter momentum. Its
//! 6x6 global covariance takes the vertex covariance as position block and
//! the sum of the daughters' momentum covariances as momentum block, with
//! zero position/momentum correlation. The local frame is aligned with the
//! momentum azimuth and the trajectory is a straight line.

use crate::fitter::VertexSolution;
use crate::kinematics::sum_momenta;
use crate::track::{packed_index, CascadeTrack, CompositeOrigin, TrackError, TrackOrigin, TrackParCov};

/// Build the composite of a fitted vertex.
///
/// `at_vertex` are the daughter states evaluated at the vertex; `daughters`
/// are the inputs of the fit, kept as provenance.
pub fn build_composite<const N: usize>(
    solution: &VertexSolution<N>,
    at_vertex: &[TrackParCov; N],
    daughters: &[CascadeTrack; N],
) -> Result<CascadeTrack, TrackError> {
    let momenta: [[f64; 3]; N] = std::array::from_fn(|i| at_vertex[i].pxpypz_glo());
    let momentum = sum_momenta(&momenta);

    let mut cov21 = [0.0; 21];
    cov21[..6].copy_from_slice(&solution.covariance);
    for trk in at_vertex {
        let pcov = trk.momentum_cov_glo();
        for i in 0..3 {
            for j in 0..=i {
                cov21[packed_index(i + 3, j + 3)] += pcov[(i, j)];
            }
        }
    }

    let state = TrackParCov::from_global(solution.position, momentum, &cov21, 0)?;
    let charge = daughters.iter().map(|d| d.charge).sum();
    Ok(CascadeTrack {
        state,
        charge,
        origin: TrackOrigin::Composite(Box::new(CompositeOrigin {
            vertex: solution.position,
            vertex_cov: solution.covariance,
            chi2: solution.chi2,
            daughters: daughters.to_vec(),
        })),
    })
}
