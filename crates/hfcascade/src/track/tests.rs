use super::*;
use crate::test_utils::{diag_cov21, track_through, TEST_BZ};
use approx::assert_relative_eq;

fn sample_track() -> TrackParCov {
    let mut cov = [0.0; 15];
    cov[packed_index(0, 0)] = 1e-3;
    cov[packed_index(1, 1)] = 2e-3;
    cov[packed_index(2, 2)] = 1e-5;
    cov[packed_index(3, 3)] = 1e-5;
    cov[packed_index(4, 4)] = 1e-4;
    cov[packed_index(2, 0)] = 1e-6;
    TrackParCov::new(3.0, 0.4, [0.2, -1.0, 0.1, 0.5, 1.0], &cov).expect("valid")
}

#[test]
fn from_global_reproduces_position_and_momentum() {
    let xyz = [0.3, -0.7, 2.1];
    let p = [-0.8, 1.1, 0.4];
    let trk = TrackParCov::from_global(xyz, p, &diag_cov21(1e-4, 1e-4), -1).expect("valid");
    assert_relative_eq!(trk.snp(), 0.0, epsilon = 1e-15);
    assert_eq!(trk.charge(), -1);
    for k in 0..3 {
        assert_relative_eq!(trk.xyz_glo()[k], xyz[k], epsilon = 1e-12);
        assert_relative_eq!(trk.pxpypz_glo()[k], p[k], epsilon = 1e-12);
    }
}

#[test]
fn from_global_rejects_zero_transverse_momentum() {
    let err = TrackParCov::from_global([0.0; 3], [0.0, 0.0, 1.0], &diag_cov21(1e-4, 1e-4), 1);
    assert_eq!(err, Err(TrackError::ZeroMomentum));
}

#[test]
fn record_round_trip_preserves_state() {
    let trk = sample_track();
    let back = TrackParCov::from_record(&trk.to_record(11)).expect("valid");
    assert_eq!(back, trk);
}

#[test]
fn new_rejects_snp_at_unity() {
    let err = TrackParCov::new(0.0, 0.0, [0.0, 0.0, 1.0, 0.0, 1.0], &[0.0; 15]);
    assert!(matches!(err, Err(TrackError::SnpOutOfRange { .. })));
}

#[test]
fn zero_field_propagation_is_a_straight_line() {
    let trk0 = sample_track();
    let mut trk = trk0;
    trk.propagate_to(8.0, 0.0).expect("reachable");
    let p0 = trk0.xyz_glo();
    let p1 = trk.xyz_glo();
    let dir = trk0.pxpypz_glo();
    let t = (p1[0] - p0[0]) / dir[0];
    for k in 0..3 {
        assert_relative_eq!(p1[k] - p0[k], dir[k] * t, epsilon = 1e-10);
    }
    assert_relative_eq!(trk.snp(), trk0.snp());
}

#[test]
fn helix_stays_on_its_circle_and_keeps_momentum() {
    let trk0 = sample_track();
    let Trajectory2D::Circle { xc, yc, r } = trk0.trajectory_2d(TEST_BZ) else {
        panic!("charged track in a field must be a circle");
    };
    let mut trk = trk0;
    trk.propagate_to(25.0, TEST_BZ).expect("reachable");
    let [x, y, _] = trk.xyz_glo();
    assert_relative_eq!((x - xc).hypot(y - yc), r, max_relative = 1e-10);
    assert_relative_eq!(trk.pt(), trk0.pt());
    assert_relative_eq!(trk.tgl(), trk0.tgl());
}

#[test]
fn forward_then_backward_restores_parameters() {
    let trk0 = sample_track();
    let mut trk = trk0;
    trk.propagate_to(40.0, TEST_BZ).expect("reachable");
    trk.propagate_to(trk0.x(), TEST_BZ).expect("reachable");
    for (a, b) in trk.params().iter().zip(trk0.params().iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-10);
    }
}

#[test]
fn zero_field_covariance_transport_is_reversible() {
    let trk0 = sample_track();
    let mut trk = trk0;
    trk.propagate_to(12.0, 0.0).expect("reachable");
    trk.propagate_to(trk0.x(), 0.0).expect("reachable");
    for (a, b) in trk.cov15().iter().zip(trk0.cov15().iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-14);
    }
}

#[test]
fn transport_jacobian_matches_finite_differences() {
    let trk0 = sample_track();
    let dx = 1.0;
    let h = 1e-6;
    for j in 2..5 {
        let mut plus = trk0.params();
        let mut minus = trk0.params();
        plus[j] += h;
        minus[j] -= h;
        let mut tp = TrackParCov::new(trk0.x(), trk0.alpha(), plus, &[0.0; 15]).expect("valid");
        let mut tm = TrackParCov::new(trk0.x(), trk0.alpha(), minus, &[0.0; 15]).expect("valid");
        tp.propagate_to(trk0.x() + dx, TEST_BZ).expect("reachable");
        tm.propagate_to(trk0.x() + dx, TEST_BZ).expect("reachable");
        for i in 0..2 {
            let numeric = (tp.params()[i] - tm.params()[i]) / (2.0 * h);
            let mut unit = [0.0; 15];
            unit[packed_index(j, j)] = 1.0;
            let mut probe = TrackParCov::new(trk0.x(), trk0.alpha(), trk0.params(), &unit)
                .expect("valid");
            probe.propagate_to(trk0.x() + dx, TEST_BZ).expect("reachable");
            // With a single unit variance C' = F e_j e_j^T F^T, so C'_ii = F_ij^2.
            let analytic_sq = probe.covariance()[(i, i)];
            assert_relative_eq!(numeric * numeric, analytic_sq, epsilon = 1e-3);
        }
    }
}

#[test]
fn rotation_preserves_global_kinematics() {
    let trk0 = sample_track();
    let mut trk = trk0;
    trk.rotate(trk0.alpha() + 0.3).expect("rotatable");
    for k in 0..3 {
        assert_relative_eq!(trk.xyz_glo()[k], trk0.xyz_glo()[k], epsilon = 1e-12);
        assert_relative_eq!(trk.pxpypz_glo()[k], trk0.pxpypz_glo()[k], epsilon = 1e-12);
    }
    let m0 = trk0.momentum_cov_glo();
    let m1 = trk.momentum_cov_glo();
    for (a, b) in m0.iter().zip(m1.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn rotation_past_ninety_degrees_fails_and_leaves_state() {
    let trk0 = sample_track();
    let mut trk = trk0;
    let err = trk.rotate(trk0.alpha() + 2.0);
    assert!(matches!(err, Err(TrackError::RotationFailed { .. })));
    assert_eq!(trk, trk0);
}

#[test]
fn unreachable_x_is_reported() {
    // Radius ~ 667 cm at pt = 1 GeV and 5 kG; x far beyond the loop.
    let mut trk = sample_track();
    let err = trk.propagate_to(5000.0, TEST_BZ);
    assert!(matches!(err, Err(TrackError::CannotReach { .. })));
}

#[test]
fn dca_to_a_point_on_the_track_is_zero() {
    let vtx = [0.4, -0.2, 1.0];
    let trk = track_through(vtx, [1.2, 0.5, 0.3], 1, 3.0);
    let (_, ip) = trk
        .propagate_to_dca(vtx, &[0.0; 6], TEST_BZ, 100.0)
        .expect("reachable");
    assert_relative_eq!(ip.y, 0.0, epsilon = 1e-9);
    assert_relative_eq!(ip.z, 0.0, epsilon = 1e-9);
    assert!(ip.sigma_y2 > 0.0);
}

#[test]
fn dca_through_a_displaced_vertex_has_no_radial_bias() {
    let vtx = [0.4, -0.2, 1.0];
    let p = [1.2, 0.5, 0.3];
    for shift in [0.0, 0.1, 1.0, 3.0, 10.0] {
        let trk = track_through(vtx, p, 1, shift);
        let (at_pca, ip) = trk
            .propagate_to_dca(vtx, &[0.0; 6], TEST_BZ, 100.0)
            .expect("reachable");
        assert_relative_eq!(ip.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(ip.z, 0.0, epsilon = 1e-9);
        let pca = at_pca.xyz_glo();
        for k in 0..3 {
            assert_relative_eq!(pca[k], vtx[k], epsilon = 1e-9);
        }
    }
}

#[test]
fn dca_to_an_offset_point_matches_transverse_offset() {
    let vtx = [0.0, 0.0, 0.0];
    let p = [2.0, 0.0, 0.0];
    let trk = track_through(vtx, p, -1, 2.0);
    // Offset perpendicular to the momentum at the vertex.
    let (_, ip) = trk
        .propagate_to_dca([0.0, 0.05, 0.0], &[0.0; 6], TEST_BZ, 100.0)
        .expect("reachable");
    assert_relative_eq!(ip.y.abs(), 0.05, max_relative = 1e-4);
}

#[test]
fn neutral_track_has_no_curvature() {
    let trk = TrackParCov::from_global([1.0, 2.0, 0.0], [0.5, 0.5, 0.1], &diag_cov21(1e-4, 1e-4), 0)
        .expect("valid");
    assert!(trk.is_neutral());
    assert_eq!(trk.curvature(TEST_BZ), 0.0);
    assert!(matches!(trk.trajectory_2d(TEST_BZ), Trajectory2D::Line { .. }));
    assert_relative_eq!(trk.pt(), 0.5f64.hypot(0.5), epsilon = 1e-12);
}

#[test]
fn normalize_angle_wraps_into_half_open_interval() {
    use std::f64::consts::PI;
    assert_relative_eq!(normalize_angle(7.0), 7.0 - 2.0 * PI, epsilon = 1e-12);
    assert_relative_eq!(normalize_angle(-4.0), 2.0 * PI - 4.0, epsilon = 1e-12);
    assert_relative_eq!(normalize_angle(-PI), PI, epsilon = 1e-12);
    assert_relative_eq!(normalize_angle(0.5), 0.5);
}
