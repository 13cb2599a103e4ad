//! Shared helpers for synthetic-decay unit tests.
//!
//! Tracks are generated exactly through a known vertex with `from_global`
//! and then transported away from it, so fitted vertices can be compared
//! with the truth.

use rand::prelude::*;

use crate::pipeline::{Event, PrimaryVertex};
use crate::track::{TrackParCov, TrackRecord};

pub(crate) const TEST_BZ: f64 = 5.0;

/// Diagonal 6x6 position/momentum covariance in packed form.
pub(crate) fn diag_cov21(pos_var: f64, mom_var: f64) -> [f64; 21] {
    let mut cov = [0.0; 21];
    for i in 0..6 {
        cov[i * (i + 1) / 2 + i] = if i < 3 { pos_var } else { mom_var };
    }
    cov
}

/// Track passing exactly through `vertex` with `momentum` there, reported
/// `shift` cm further along its local x.
pub(crate) fn track_through(
    vertex: [f64; 3],
    momentum: [f64; 3],
    charge: i8,
    shift: f64,
) -> TrackParCov {
    let mut trk = TrackParCov::from_global(vertex, momentum, &diag_cov21(1e-4, 1e-4), charge)
        .expect("valid test track");
    let x = trk.x() + shift;
    trk.propagate_to(x, TEST_BZ).expect("test track transport");
    trk
}

pub(crate) fn record_through(
    index: usize,
    vertex: [f64; 3],
    momentum: [f64; 3],
    charge: i8,
) -> TrackRecord {
    track_through(vertex, momentum, charge, 1.0).to_record(index)
}

/// Random momentum with pt in `[pt_min, pt_max)` and |tgl| < 0.8.
pub(crate) fn random_momentum(rng: &mut StdRng, pt_min: f64, pt_max: f64) -> [f64; 3] {
    let pt = rng.gen_range(pt_min..pt_max);
    let phi = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
    let tgl = rng.gen_range(-0.8..0.8);
    [pt * phi.cos(), pt * phi.sin(), pt * tgl]
}

pub(crate) fn unit(v: [f64; 3]) -> [f64; 3] {
    let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / n, v[1] / n, v[2] / n]
}

pub(crate) fn along(origin: [f64; 3], dir: [f64; 3], length: f64) -> [f64; 3] {
    let u = unit(dir);
    [
        origin[0] + u[0] * length,
        origin[1] + u[1] * length,
        origin[2] + u[2] * length,
    ]
}

/// Lab-frame daughter momenta of a two-body decay. `rest_dir` is the
/// direction of the first daughter in the mother rest frame.
pub(crate) fn two_body_decay(
    mother_p: [f64; 3],
    mother_m: f64,
    m1: f64,
    m2: f64,
    rest_dir: [f64; 3],
) -> ([f64; 3], [f64; 3]) {
    let mm = mother_m * mother_m;
    let pstar = ((mm - (m1 + m2).powi(2)) * (mm - (m1 - m2).powi(2))).sqrt() / (2.0 * mother_m);
    let n = unit(rest_dir);
    let q1 = [n[0] * pstar, n[1] * pstar, n[2] * pstar];
    let q2 = [-q1[0], -q1[1], -q1[2]];
    let e1 = (pstar * pstar + m1 * m1).sqrt();
    let e2 = (pstar * pstar + m2 * m2).sqrt();

    let p = (mother_p[0].powi(2) + mother_p[1].powi(2) + mother_p[2].powi(2)).sqrt();
    if p == 0.0 {
        return (q1, q2);
    }
    let e = (p * p + mm).sqrt();
    let gamma = e / mother_m;
    let beta = p / e;
    let b = unit(mother_p);
    let boost = |q: [f64; 3], eq: f64| {
        let par = q[0] * b[0] + q[1] * b[1] + q[2] * b[2];
        let k = (gamma - 1.0) * par + gamma * beta * eq;
        [q[0] + b[0] * k, q[1] + b[1] * k, q[2] + b[2] * k]
    };
    (boost(q1, e1), boost(q2, e2))
}

pub(crate) const MASS_PION: f64 = 0.13957039;
pub(crate) const MASS_KAON: f64 = 0.493677;
pub(crate) const MASS_D0: f64 = 1.86484;

/// Primary vertex of [`d0_event`].
pub(crate) const D0_PV: [f64; 3] = [-0.02, -0.01, -0.003_354_101_966_249_685];
/// D0 momentum of [`d0_event`]: pt = 2 along (2, 1) with pz = 0.3.
pub(crate) const D0_MOMENTUM: [f64; 3] = [1.788_854_381_999_831_7, 0.894_427_190_999_915_9, 0.3];

/// One D0 -> pi+ K- decay at the origin, displaced from the primary vertex
/// along its momentum, with the daughters' rest-frame axis transverse to
/// the flight so that their impact parameters have opposite signs.
pub(crate) fn d0_event() -> Event {
    let sv = [0.0, 0.0, 0.0];
    let (p_pi, p_k) = two_body_decay(D0_MOMENTUM, MASS_D0, MASS_PION, MASS_KAON, [-1.0, 2.0, 0.0]);
    Event {
        collision_id: 7,
        primary_vertex: PrimaryVertex {
            position: D0_PV,
            covariance: [1e-6, 0.0, 1e-6, 0.0, 0.0, 1e-6],
        },
        tracks: vec![
            record_through(0, sv, p_pi, 1),
            record_through(1, sv, p_k, -1),
        ],
    }
}
