//! Kinematic and topological observables of decay candidates.
//!
//! Vectors are plain `[f64; 3]` in global coordinates; covariances use the
//! packed `[xx, xy, yy, xz, yz, zz]` order.

pub type Vec3 = [f64; 3];

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn sum_momenta(momenta: &[Vec3]) -> Vec3 {
    momenta.iter().fold([0.0; 3], |acc, p| {
        [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
    })
}

pub fn p2(p: Vec3) -> f64 {
    dot(p, p)
}

pub fn p(mom: Vec3) -> f64 {
    p2(mom).sqrt()
}

pub fn pt(p: Vec3) -> f64 {
    p[0].hypot(p[1])
}

pub fn energy(p: Vec3, mass: f64) -> f64 {
    (p2(p) + mass * mass).sqrt()
}

/// Azimuth in `[0, 2*pi)`.
pub fn phi(p: Vec3) -> f64 {
    let a = p[1].atan2(p[0]);
    if a < 0.0 {
        a + std::f64::consts::TAU
    } else {
        a
    }
}

/// Invariant mass of daughters with the given mass hypotheses. Slightly
/// negative squared masses from rounding are clamped to zero.
pub fn invariant_mass<const N: usize>(momenta: &[Vec3; N], masses: &[f64; N]) -> f64 {
    let mut e = 0.0;
    for (p, m) in momenta.iter().zip(masses.iter()) {
        e += energy(*p, *m);
    }
    let total = sum_momenta(momenta.as_slice());
    (e * e - p2(total)).max(0.0).sqrt()
}

/// Pseudorapidity; `None` when the momentum is zero or purely longitudinal.
pub fn eta(p: Vec3) -> Option<f64> {
    let mag = self::p(p);
    if mag == 0.0 {
        return None;
    }
    let v = 0.5 * ((mag + p[2]) / (mag - p[2])).ln();
    v.is_finite().then_some(v)
}

/// Rapidity for `mass`; `None` when the momentum is zero.
pub fn rapidity(p: Vec3, mass: f64) -> Option<f64> {
    if p2(p) == 0.0 {
        return None;
    }
    let e = energy(p, mass);
    let v = 0.5 * ((e + p[2]) / (e - p[2])).ln();
    v.is_finite().then_some(v)
}

pub fn decay_length(pv: Vec3, sv: Vec3) -> f64 {
    p(sub(sv, pv))
}

pub fn decay_length_xy(pv: Vec3, sv: Vec3) -> f64 {
    (sv[0] - pv[0]).hypot(sv[1] - pv[1])
}

fn clamp_cos(num: f64, den: f64) -> f64 {
    if den == 0.0 || !den.is_finite() || !num.is_finite() {
        return -1.0;
    }
    (num / den).clamp(-1.0, 1.0)
}

/// Cosine of the angle between flight line `pv -> sv` and momentum.
///
/// Degenerate inputs (zero flight or momentum) return -1.
pub fn cos_pointing_angle(pv: Vec3, sv: Vec3, mom: Vec3) -> f64 {
    let l = sub(sv, pv);
    clamp_cos(dot(l, mom), (p2(l) * p2(mom)).sqrt())
}

/// Transverse-plane variant of [`cos_pointing_angle`].
pub fn cos_pointing_angle_xy(pv: Vec3, sv: Vec3, mom: Vec3) -> f64 {
    let lx = sv[0] - pv[0];
    let ly = sv[1] - pv[1];
    clamp_cos(lx * mom[0] + ly * mom[1], lx.hypot(ly) * pt(mom))
}

/// Proper decay length `L * m / p`; `None` for zero momentum.
pub fn ct(pv: Vec3, sv: Vec3, mom: Vec3, mass: f64) -> Option<f64> {
    let pm = p(mom);
    (pm > 0.0).then(|| decay_length(pv, sv) * mass / pm)
}

/// Lorentz factor `gamma * beta = p / m`; `None` for a massless hypothesis.
pub fn gamma_beta(mom: Vec3, mass: f64) -> Option<f64> {
    (mass > 0.0).then(|| p(mom) / mass)
}

/// `value / error`, or `None` when the error vanishes.
pub fn normalized(value: f64, error: f64) -> Option<f64> {
    (error > 0.0).then(|| value / error)
}

/// Variance of a covariance matrix projected onto the direction given by
/// azimuth `phi` and elevation `theta`.
pub fn rotated_variance(cov: &[f64; 6], phi: f64, theta: f64) -> f64 {
    let (sp, cp) = phi.sin_cos();
    let (st, ct) = theta.sin_cos();
    cov[0] * cp * cp * ct * ct
        + cov[1] * 2.0 * cp * sp * ct * ct
        + cov[2] * sp * sp * ct * ct
        + cov[3] * 2.0 * cp * ct * st
        + cov[4] * 2.0 * sp * ct * st
        + cov[5] * st * st
}

fn summed(a: &[f64; 6], b: &[f64; 6]) -> [f64; 6] {
    std::array::from_fn(|i| a[i] + b[i])
}

/// Error of [`decay_length`] from both vertex covariances.
pub fn decay_length_error(pv: Vec3, pv_cov: &[f64; 6], sv: Vec3, sv_cov: &[f64; 6]) -> f64 {
    let d = sub(sv, pv);
    let phi = d[1].atan2(d[0]);
    let theta = d[2].atan2(d[0].hypot(d[1]));
    rotated_variance(&summed(pv_cov, sv_cov), phi, theta)
        .max(0.0)
        .sqrt()
}

/// Error of [`decay_length_xy`] from both vertex covariances.
pub fn decay_length_xy_error(pv: Vec3, pv_cov: &[f64; 6], sv: Vec3, sv_cov: &[f64; 6]) -> f64 {
    let phi = (sv[1] - pv[1]).atan2(sv[0] - pv[0]);
    rotated_variance(&summed(pv_cov, sv_cov), phi, 0.0)
        .max(0.0)
        .sqrt()
}

/// Maximum deviation of the daughters' normalized impact parameters from
/// the values expected for a particle flying straight from `pv` to `sv`.
///
/// `prongs` carries `(momentum, measured d0, d0 error)` per daughter.
pub fn max_normalized_d0_deviation(
    pv: Vec3,
    sv: Vec3,
    mother_mom: Vec3,
    prongs: &[(Vec3, f64, f64)],
) -> f64 {
    let flight = [sv[0] - pv[0], sv[1] - pv[1]];
    let lxy = flight[0].hypot(flight[1]);
    let mpt = pt(mother_mom);
    if lxy == 0.0 || mpt == 0.0 {
        return 0.0;
    }
    let mut worst: f64 = 0.0;
    for (mom, d0, err) in prongs {
        let ppt = pt(*mom);
        if ppt == 0.0 || *err <= 0.0 {
            continue;
        }
        // sin of the angle between daughter and flight line, signed like
        // the local-frame impact parameter.
        let cross = (mom[0] * flight[1] - mom[1] * flight[0]) / (ppt * lxy);
        let expected = lxy * cross;
        worst = worst.max(((d0 - expected) / err).abs());
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn random_vec(rng: &mut StdRng, scale: f64) -> Vec3 {
        [
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
        ]
    }

    #[test]
    fn invariant_mass_is_permutation_invariant() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..50 {
            let ps = [random_vec(&mut rng, 3.0), random_vec(&mut rng, 3.0), random_vec(&mut rng, 3.0)];
            let ms = [0.1396, 0.4937, 0.9383];
            let m = invariant_mass(&ps, &ms);
            let perm_p = [ps[2], ps[0], ps[1]];
            let perm_m = [ms[2], ms[0], ms[1]];
            assert_relative_eq!(invariant_mass(&perm_p, &perm_m), m, max_relative = 1e-12);
        }
    }

    #[test]
    fn back_to_back_daughters_reconstruct_the_parent_mass() {
        let (m1, m2, m): (f64, f64, f64) = (0.13957039, 0.493677, 1.86484);
        let mm = m * m;
        let pstar = ((mm - (m1 + m2) * (m1 + m2)) * (mm - (m1 - m2) * (m1 - m2))).sqrt() / (2.0 * m);
        let q = [0.0, pstar, 0.0];
        let qbar = [0.0, -pstar, 0.0];
        assert_relative_eq!(invariant_mass(&[q, qbar], &[m1, m2]), m, max_relative = 1e-12);
    }

    #[test]
    fn pointing_cosine_is_bounded_for_arbitrary_vectors() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..500 {
            let pv = random_vec(&mut rng, 1.0);
            let sv = random_vec(&mut rng, 1.0);
            let mom = random_vec(&mut rng, 10.0);
            let c = cos_pointing_angle(pv, sv, mom);
            let cxy = cos_pointing_angle_xy(pv, sv, mom);
            assert!((-1.0..=1.0).contains(&c));
            assert!((-1.0..=1.0).contains(&cxy));
        }
        // Parallel vectors may round above one without the clamp.
        let v = [0.1, 0.2, 0.3];
        assert!(cos_pointing_angle([0.0; 3], v, [1.0, 2.0, 3.0]) <= 1.0);
        assert_eq!(cos_pointing_angle([0.0; 3], [0.0; 3], v), -1.0);
    }

    #[test]
    fn rapidities_are_undefined_for_zero_momentum() {
        assert_eq!(eta([0.0; 3]), None);
        assert_eq!(rapidity([0.0; 3], 1.0), None);
        assert_eq!(eta([0.0, 0.0, 2.0]), None);
        assert_relative_eq!(eta([1.0, 0.0, 0.0]).expect("defined"), 0.0);
        assert_relative_eq!(rapidity([1.0, 0.0, 0.0], 1.0).expect("defined"), 0.0);
        assert!(rapidity([0.0, 0.0, 2.0], 1.0).expect("massive") > 0.0);
    }

    #[test]
    fn decay_length_error_projects_onto_flight_direction() {
        let pv = [0.0; 3];
        let sv = [1.0, 0.0, 0.0];
        let pv_cov = [1e-4, 0.0, 9e-4, 0.0, 0.0, 4e-4];
        let sv_cov = [3e-4, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_relative_eq!(decay_length_error(pv, &pv_cov, sv, &sv_cov), 0.02, max_relative = 1e-12);
        let sv = [0.0, 0.0, 2.0];
        assert_relative_eq!(decay_length_error(pv, &pv_cov, sv, &sv_cov), 0.02, max_relative = 1e-12);
        let sv = [0.0, 1.0, 5.0];
        assert_relative_eq!(decay_length_xy_error(pv, &pv_cov, sv, &sv_cov), 0.03, max_relative = 1e-12);
    }

    #[test]
    fn ct_and_azimuth() {
        let c = ct([0.0; 3], [0.0, 0.3, 0.4], [0.0, 1.5, 2.0], 1.5).expect("moving");
        assert_relative_eq!(c, 0.3, max_relative = 1e-12);
        assert_eq!(ct([0.0; 3], [1.0; 3], [0.0; 3], 1.0), None);
        assert_relative_eq!(phi([0.0, -1.0, 0.0]), 1.5 * std::f64::consts::PI);
    }

    #[test]
    fn straight_daughters_have_no_d0_deviation() {
        let pv = [0.0; 3];
        let sv = [0.1, 0.0, 0.0];
        let mom = [1.0, 1.0, 0.0];
        let expected = 0.1 * (1.0 * 0.0 - 1.0 * 0.1) / (2f64.sqrt() * 0.1);
        let dev = max_normalized_d0_deviation(pv, sv, [2.0, 0.0, 0.0], &[(mom, expected, 0.01)]);
        assert_relative_eq!(dev, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn lorentz_helpers() {
        let mom = [3.0, 0.0, 4.0];
        assert_relative_eq!(energy(mom, 12.0), 13.0);
        assert_relative_eq!(gamma_beta(mom, 2.5).expect("massive"), 2.0);
        assert_eq!(gamma_beta(mom, 0.0), None);
        assert_eq!(normalized(1.0, 0.0), None);
        assert_relative_eq!(normalized(0.3, 0.1).expect("error set"), 3.0, epsilon = 1e-12);
    }
}
