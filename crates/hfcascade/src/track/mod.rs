//! Charged/neutral track states in the rotated local frame.
//!
//! A [`TrackParCov`] is a helix (or straight line for neutral trajectories)
//! parametrized at a reference `x` in a frame rotated by `alpha` about the
//! beam axis. The five parameters are `[y, z, snp, tgl, q2pt]`; the 5x5
//! covariance is stored as a symmetric `nalgebra` matrix and exchanged as 15
//! packed lower-triangle values.
//!
//! Units: cm, kG, GeV.

mod cascade;
mod dca;
mod propagate;

#[cfg(test)]
mod tests;

use nalgebra::{Matrix3, Matrix5, SMatrix, SVector};

use crate::selector::pid::PidMeasurement;

pub use cascade::{CascadeTrack, CompositeOrigin, TrackOrigin};
pub use dca::ImpactParameter;

/// Curvature conversion constant: `crv = q2pt * bz * B2C` [cm^-1] with bz in kG.
pub const B2C: f64 = -0.299792458e-3;

pub(crate) const ALMOST0: f64 = 1e-12;
pub(crate) const ALMOST1: f64 = 1.0 - 1e-6;

/// Indices into the parameter vector.
pub mod param {
    pub const Y: usize = 0;
    pub const Z: usize = 1;
    pub const SNP: usize = 2;
    pub const TGL: usize = 3;
    pub const Q2PT: usize = 4;
}

/// Failures of track construction and transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackError {
    /// A parameter or covariance entry is NaN or infinite.
    NonFinite,
    /// `|snp|` is not strictly below one.
    SnpOutOfRange { snp: f64 },
    /// The trajectory cannot reach the requested local x.
    CannotReach { x: f64 },
    /// The track direction is more than 90 degrees off the target frame.
    RotationFailed { alpha: f64 },
    /// Transverse momentum is zero; the local frame is undefined.
    ZeroMomentum,
    /// Straight-line distance to a vertex exceeds the allowed maximum.
    TooFarFromVertex { distance: f64 },
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite => write!(f, "track state contains non-finite values"),
            Self::SnpOutOfRange { snp } => write!(f, "snp = {snp} outside (-1, 1)"),
            Self::CannotReach { x } => write!(f, "trajectory cannot reach x = {x}"),
            Self::RotationFailed { alpha } => {
                write!(f, "cannot rotate track to alpha = {alpha}")
            }
            Self::ZeroMomentum => write!(f, "transverse momentum is zero"),
            Self::TooFarFromVertex { distance } => {
                write!(f, "track passes {distance} cm from the vertex")
            }
        }
    }
}

impl std::error::Error for TrackError {}

/// Serialized track as delivered by the upstream tracking.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrackRecord {
    /// Global track identifier within the event.
    pub global_index: usize,
    /// Reference x in the local frame [cm].
    pub x: f64,
    /// Frame rotation angle [rad].
    pub alpha: f64,
    pub y: f64,
    pub z: f64,
    pub snp: f64,
    pub tgl: f64,
    /// Signed inverse transverse momentum `q/pt` [1/GeV].
    pub signed1pt: f64,
    /// Packed lower triangle of the 5x5 covariance, row-wise.
    pub cov: [f64; 15],
    /// Optional particle-identification measurements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pid: Vec<PidMeasurement>,
}

/// Helix state with covariance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackParCov {
    x: f64,
    alpha: f64,
    params: SVector<f64, 5>,
    cov: Matrix5<f64>,
    abs_charge: u8,
}

/// Transverse projection of a trajectory in global coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trajectory2D {
    Circle { xc: f64, yc: f64, r: f64 },
    Line { x0: f64, y0: f64, ux: f64, uy: f64 },
}

/// Index of `(i, j)` with `i >= j` in a row-wise packed lower triangle.
#[inline]
pub(crate) fn packed_index(i: usize, j: usize) -> usize {
    let (i, j) = if i >= j { (i, j) } else { (j, i) };
    i * (i + 1) / 2 + j
}

pub(crate) fn unpack_symmetric<const D: usize>(packed: &[f64]) -> SMatrix<f64, D, D> {
    SMatrix::<f64, D, D>::from_fn(|i, j| packed[packed_index(i, j)])
}

pub(crate) fn pack_symmetric<const D: usize>(m: &SMatrix<f64, D, D>, out: &mut [f64]) {
    for i in 0..D {
        for j in 0..=i {
            out[packed_index(i, j)] = 0.5 * (m[(i, j)] + m[(j, i)]);
        }
    }
}

/// Wrap an angle into `(-pi, pi]`.
pub(crate) fn normalize_angle(a: f64) -> f64 {
    let mut a = a % std::f64::consts::TAU;
    if a > std::f64::consts::PI {
        a -= std::f64::consts::TAU;
    } else if a <= -std::f64::consts::PI {
        a += std::f64::consts::TAU;
    }
    a
}

impl TrackParCov {
    /// Build a charged track from local-frame parameters.
    pub fn new(
        x: f64,
        alpha: f64,
        params: [f64; 5],
        cov15: &[f64; 15],
    ) -> Result<Self, TrackError> {
        let trk = Self {
            x,
            alpha: normalize_angle(alpha),
            params: SVector::<f64, 5>::from(params),
            cov: unpack_symmetric::<5>(cov15),
            abs_charge: 1,
        };
        trk.validate()?;
        Ok(trk)
    }

    pub fn from_record(record: &TrackRecord) -> Result<Self, TrackError> {
        Self::new(
            record.x,
            record.alpha,
            [record.y, record.z, record.snp, record.tgl, record.signed1pt],
            &record.cov,
        )
    }

    /// Serialize back into a record carrying `global_index`.
    pub fn to_record(&self, global_index: usize) -> TrackRecord {
        TrackRecord {
            global_index,
            x: self.x,
            alpha: self.alpha,
            y: self.params[param::Y],
            z: self.params[param::Z],
            snp: self.params[param::SNP],
            tgl: self.params[param::TGL],
            signed1pt: self.params[param::Q2PT],
            cov: self.cov15(),
            pid: Vec::new(),
        }
    }

    /// Build a track from a global position, momentum and their 6x6
    /// covariance (21 packed values in `x, y, z, px, py, pz` order).
    ///
    /// The local frame is aligned with the transverse momentum, so the
    /// resulting `snp` is zero. `charge == 0` yields a neutral trajectory
    /// whose `q2pt` slot holds `1/pt`.
    pub fn from_global(
        xyz: [f64; 3],
        pxpypz: [f64; 3],
        cov21: &[f64; 21],
        charge: i8,
    ) -> Result<Self, TrackError> {
        let [px, py, pz] = pxpypz;
        let pt = px.hypot(py);
        if !pt.is_finite() || pt < ALMOST0 {
            return Err(TrackError::ZeroMomentum);
        }
        let alpha = py.atan2(px);
        let (s, c) = alpha.sin_cos();
        let x = c * xyz[0] + s * xyz[1];
        let y = -s * xyz[0] + c * xyz[1];
        let tgl = pz / pt;
        let q = if charge == 0 { 1.0 } else { f64::from(charge.signum()) };
        let q2pt = q / pt;

        let pt2 = pt * pt;
        let mut jac = SMatrix::<f64, 5, 6>::zeros();
        jac[(0, 0)] = -s;
        jac[(0, 1)] = c;
        jac[(1, 0)] = -tgl * c;
        jac[(1, 1)] = -tgl * s;
        jac[(1, 2)] = 1.0;
        jac[(2, 3)] = -s / pt;
        jac[(2, 4)] = c / pt;
        jac[(3, 3)] = -pz * c / pt2;
        jac[(3, 4)] = -pz * s / pt2;
        jac[(3, 5)] = 1.0 / pt;
        jac[(4, 3)] = -q * c / pt2;
        jac[(4, 4)] = -q * s / pt2;

        let cov6 = unpack_symmetric::<6>(cov21);
        let trk = Self {
            x,
            alpha,
            params: SVector::<f64, 5>::from([y, xyz[2], 0.0, tgl, q2pt]),
            cov: jac * cov6 * jac.transpose(),
            abs_charge: charge.unsigned_abs().min(1),
        };
        trk.validate()?;
        Ok(trk)
    }

    fn validate(&self) -> Result<(), TrackError> {
        if !self.x.is_finite()
            || !self.alpha.is_finite()
            || self.params.iter().any(|v| !v.is_finite())
            || self.cov.iter().any(|v| !v.is_finite())
        {
            return Err(TrackError::NonFinite);
        }
        let snp = self.snp();
        if snp.abs() >= 1.0 {
            return Err(TrackError::SnpOutOfRange { snp });
        }
        Ok(())
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn y(&self) -> f64 {
        self.params[param::Y]
    }

    pub fn z(&self) -> f64 {
        self.params[param::Z]
    }

    pub fn snp(&self) -> f64 {
        self.params[param::SNP]
    }

    pub fn tgl(&self) -> f64 {
        self.params[param::TGL]
    }

    pub fn q2pt(&self) -> f64 {
        self.params[param::Q2PT]
    }

    pub fn params(&self) -> [f64; 5] {
        self.params.into()
    }

    pub fn covariance(&self) -> &Matrix5<f64> {
        &self.cov
    }

    pub fn cov15(&self) -> [f64; 15] {
        let mut out = [0.0; 15];
        pack_symmetric::<5>(&self.cov, &mut out);
        out
    }

    pub fn sigma_y2(&self) -> f64 {
        self.cov[(0, 0)]
    }

    pub fn sigma_zy(&self) -> f64 {
        self.cov[(1, 0)]
    }

    pub fn sigma_z2(&self) -> f64 {
        self.cov[(1, 1)]
    }

    pub fn is_neutral(&self) -> bool {
        self.abs_charge == 0
    }

    /// Signed charge: sign of `q2pt` for charged tracks, zero for neutral.
    pub fn charge(&self) -> i8 {
        if self.is_neutral() {
            0
        } else if self.q2pt() >= 0.0 {
            1
        } else {
            -1
        }
    }

    /// Signed curvature [1/cm] in field `bz` [kG]; zero for neutral tracks.
    pub fn curvature(&self, bz: f64) -> f64 {
        if self.is_neutral() {
            0.0
        } else {
            self.q2pt() * bz * B2C
        }
    }

    /// `sqrt(1 - snp^2)`.
    pub fn csp(&self) -> f64 {
        let snp = self.snp();
        ((1.0 - snp) * (1.0 + snp)).max(0.0).sqrt()
    }

    pub fn pt(&self) -> f64 {
        let q = self.q2pt().abs();
        if q < ALMOST0 {
            1.0 / ALMOST0
        } else {
            1.0 / q
        }
    }

    pub fn p(&self) -> f64 {
        self.pt() * (1.0 + self.tgl() * self.tgl()).sqrt()
    }

    /// Global azimuth of the momentum at the reference point.
    pub fn phi(&self) -> f64 {
        normalize_angle(self.snp().asin() + self.alpha)
    }

    /// Reference point in global coordinates.
    pub fn xyz_glo(&self) -> [f64; 3] {
        let (s, c) = self.alpha.sin_cos();
        [
            c * self.x - s * self.y(),
            s * self.x + c * self.y(),
            self.z(),
        ]
    }

    /// Momentum at the reference point in global coordinates.
    pub fn pxpypz_glo(&self) -> [f64; 3] {
        let (s, c) = self.alpha.sin_cos();
        let pt = self.pt();
        let snp = self.snp();
        let csp = self.csp();
        [
            pt * (csp * c - snp * s),
            pt * (snp * c + csp * s),
            pt * self.tgl(),
        ]
    }

    /// 3x3 covariance of the global momentum, propagated from the
    /// `(snp, tgl, q2pt)` block.
    pub fn momentum_cov_glo(&self) -> Matrix3<f64> {
        let (s, c) = self.alpha.sin_cos();
        let pt = self.pt();
        let snp = self.snp();
        let csp = self.csp().max(ALMOST0);
        let tgl = self.tgl();
        let dpt = -self.q2pt().signum() * pt * pt;

        // Local-frame Jacobian: rows (px, py, pz), cols (snp, tgl, q2pt).
        let local = Matrix3::new(
            -pt * snp / csp,
            0.0,
            csp * dpt,
            pt,
            0.0,
            snp * dpt,
            0.0,
            pt,
            tgl * dpt,
        );
        let rot = Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0);
        let jac = rot * local;
        let sub = self.cov.fixed_view::<3, 3>(2, 2).into_owned();
        jac * sub * jac.transpose()
    }

    /// Transverse trajectory: a circle in a field, a line otherwise.
    pub fn trajectory_2d(&self, bz: f64) -> Trajectory2D {
        let crv = self.curvature(bz);
        let (s, c) = self.alpha.sin_cos();
        if crv.abs() < ALMOST0 {
            let [x0, y0, _] = self.xyz_glo();
            let phi = self.phi();
            return Trajectory2D::Line {
                x0,
                y0,
                ux: phi.cos(),
                uy: phi.sin(),
            };
        }
        let r = 1.0 / crv;
        let xl = self.x - self.snp() * r;
        let yl = self.y() + self.csp() * r;
        Trajectory2D::Circle {
            xc: c * xl - s * yl,
            yc: s * xl + c * yl,
            r: r.abs(),
        }
    }

    /// Local x of a global transverse point in this track's frame.
    pub fn local_x_of(&self, xy: [f64; 2]) -> f64 {
        let (s, c) = self.alpha.sin_cos();
        c * xy[0] + s * xy[1]
    }
}
