use super::{normalize_angle, TrackError, TrackParCov, ALMOST0};

/// Signed transverse and longitudinal distance of closest approach to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ImpactParameter {
    /// Transverse impact parameter, signed in the track's local frame [cm].
    pub y: f64,
    /// Longitudinal impact parameter [cm].
    pub z: f64,
    pub sigma_y2: f64,
    pub sigma_yz: f64,
    pub sigma_z2: f64,
}

impl ImpactParameter {
    pub fn sigma_y(&self) -> f64 {
        self.sigma_y2.max(0.0).sqrt()
    }
}

impl TrackParCov {
    /// Transport a copy of the track to its point of closest transverse
    /// approach to `vertex` and return it with the impact parameter.
    ///
    /// `vertex_cov` is the packed `[xx, xy, yy, xz, yz, zz]` vertex covariance
    /// and is added to the track errors projected onto the final frame.
    pub fn propagate_to_dca(
        &self,
        vertex: [f64; 3],
        vertex_cov: &[f64; 6],
        bz: f64,
        max_distance: f64,
    ) -> Result<(TrackParCov, ImpactParameter), TrackError> {
        let (s0, c0) = self.alpha.sin_cos();
        let xv = vertex[0] * c0 + vertex[1] * s0;
        let yv = -vertex[0] * s0 + vertex[1] * c0;
        let x = self.x - xv;
        let y = self.y() - yv;
        let snp = self.snp();
        let csp = self.csp();

        let straight = (x * snp - y * csp).abs();
        if straight > max_distance {
            return Err(TrackError::TooFarFromVertex { distance: straight });
        }

        // Frame in which the vertex-to-PCA segment is along local y.
        let crv = self.curvature(bz);
        let tgfv = -(crv * x - snp) / (crv * y + csp);
        let sn = tgfv / (1.0 + tgfv * tgfv).sqrt();
        let cs = if tgfv.abs() > ALMOST0 {
            sn / tgfv
        } else {
            ((1.0 - sn) * (1.0 + sn)).sqrt()
        };
        let x_new = xv * cs + yv * sn;
        let y_vtx = -xv * sn + yv * cs;

        let mut trk = *self;
        let alpha = normalize_angle(self.alpha + sn.asin());
        trk.rotate(alpha)?;
        trk.propagate_to(x_new, bz)?;

        let (sa, ca) = alpha.sin_cos();
        let [vxx, vxy, vyy, vxz, vyz, vzz] = *vertex_cov;
        let vtx_yy = sa * sa * vxx - 2.0 * sa * ca * vxy + ca * ca * vyy;
        let vtx_yz = -sa * vxz + ca * vyz;

        let ip = ImpactParameter {
            y: trk.y() - y_vtx,
            z: trk.z() - vertex[2],
            sigma_y2: trk.sigma_y2() + vtx_yy,
            sigma_yz: trk.sigma_zy() + vtx_yz,
            sigma_z2: trk.sigma_z2() + vzz,
        };
        Ok((trk, ip))
    }
}
