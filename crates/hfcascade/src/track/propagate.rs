//! Helix transport along local x and frame rotation.

use nalgebra::Matrix5;

use super::{normalize_angle, param, TrackError, TrackParCov, ALMOST0, ALMOST1, B2C};

/// Below this `|crv * dx|` the z advance uses the second-order chord formula.
const SMALL_BEND: f64 = 1e-6;

impl TrackParCov {
    /// Transport to local `xk` in field `bz` [kG], updating parameters and
    /// covariance. On failure the state is left untouched.
    pub fn propagate_to(&mut self, xk: f64, bz: f64) -> Result<(), TrackError> {
        let dx = xk - self.x;
        if dx.abs() < ALMOST0 {
            self.x = xk;
            return Ok(());
        }
        if !xk.is_finite() || !bz.is_finite() {
            return Err(TrackError::NonFinite);
        }
        let crv = self.curvature(bz);
        let x2r = crv * dx;
        let f1 = self.snp();
        let f2 = f1 + x2r;
        if f1.abs() > ALMOST1 || f2.abs() > ALMOST1 {
            return Err(TrackError::CannotReach { x: xk });
        }
        let r1 = ((1.0 - f1) * (1.0 + f1)).sqrt();
        let r2 = ((1.0 - f2) * (1.0 + f2)).sqrt();
        if r1 < ALMOST0 || r2 < ALMOST0 {
            return Err(TrackError::CannotReach { x: xk });
        }
        let tgl = self.tgl();
        let dy2dx = (f1 + f2) / (r1 + r2);
        let dz = if x2r.abs() < SMALL_BEND {
            dx * (r2 + f2 * dy2dx) * tgl
        } else {
            (f2.asin() - f1.asin()) / crv * tgl
        };

        let mut params = self.params;
        params[param::Y] += dx * dy2dx;
        params[param::Z] += dz;
        params[param::SNP] = f2;

        let rinv = 1.0 / r1;
        let r3inv = rinv * rinv * rinv;
        let f24 = if self.is_neutral() { 0.0 } else { dx * bz * B2C };
        let f02 = dx * r3inv;
        let f04 = 0.5 * f24 * f02;
        let f12 = f02 * tgl * f1;
        let f13 = dx * rinv;
        let f14 = 0.5 * f24 * f12;

        let mut jac = Matrix5::<f64>::identity();
        jac[(0, 2)] = f02;
        jac[(0, 4)] = f04;
        jac[(1, 2)] = f12;
        jac[(1, 3)] = f13;
        jac[(1, 4)] = f14;
        jac[(2, 4)] = f24;
        let cov = jac * self.cov * jac.transpose();

        if params.iter().any(|v| !v.is_finite()) || cov.iter().any(|v| !v.is_finite()) {
            return Err(TrackError::NonFinite);
        }
        self.x = xk;
        self.params = params;
        self.cov = cov;
        Ok(())
    }

    /// Rotate the local frame to `alpha` keeping the reference point fixed.
    ///
    /// Fails when the momentum would point more than 90 degrees away from
    /// the new x axis.
    pub fn rotate(&mut self, alpha: f64) -> Result<(), TrackError> {
        let alpha = normalize_angle(alpha);
        let (sa, ca) = (alpha - self.alpha).sin_cos();
        let snp = self.snp();
        let csp = self.csp();
        let upd_snp = snp * ca - csp * sa;
        if csp * ca + snp * sa < 0.0 || upd_snp.abs() >= ALMOST1 || csp < ALMOST0 {
            return Err(TrackError::RotationFailed { alpha });
        }
        let xold = self.x;
        let yold = self.y();
        let rr = ca + snp / csp * sa;

        let mut jac = Matrix5::<f64>::identity();
        jac[(0, 0)] = ca;
        jac[(2, 2)] = rr;

        self.x = xold * ca + yold * sa;
        self.params[param::Y] = -xold * sa + yold * ca;
        self.params[param::SNP] = upd_snp;
        self.alpha = alpha;
        self.cov = jac * self.cov * jac.transpose();
        Ok(())
    }

    /// Move the frame so its x axis follows the momentum at the reference
    /// point (`snp` becomes zero).
    pub fn align_with_momentum(&mut self) -> Result<(), TrackError> {
        self.rotate(self.phi())
    }
}
