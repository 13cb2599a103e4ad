use super::*;
use crate::config::ReconstructionConfig;
use crate::decay::HfFlags;
use crate::pdg::{code, PdgTable};
use crate::pipeline::EventReconstructor;
use crate::test_utils::d0_event;

const D0: DecayChannel = DecayChannel::D0ToPiK;

/// The single D0 candidate of the synthetic event (pt = 2 GeV).
fn d0_candidate() -> Candidate {
    let mut reco = EventReconstructor::new(&ReconstructionConfig::default(), &PdgTable::default())
        .expect("default config");
    let mut out = reco.process(&d0_event());
    assert_eq!(out.candidates.len(), 1);
    out.candidates.remove(0)
}

fn masses() -> ChannelMasses {
    ChannelMasses::resolve(&PdgTable::default()).expect("complete table")
}

fn selector_with(edit: impl FnOnce(&mut SelectionConfig)) -> CandidateSelector {
    selector_with_masses(masses(), edit)
}

/// Selector whose D0 reference mass sits 135 MeV above the synthetic one,
/// so a tight mass window rejects while the default window still passes.
fn off_mass_selector_with(edit: impl FnOnce(&mut SelectionConfig)) -> CandidateSelector {
    let table = PdgTable::default().with_mass(code::D0, 2.0);
    let masses = ChannelMasses::resolve(&table).expect("complete table");
    selector_with_masses(masses, edit)
}

fn selector_with_masses(
    masses: ChannelMasses,
    edit: impl FnOnce(&mut SelectionConfig),
) -> CandidateSelector {
    let mut config = SelectionConfig::default();
    edit(&mut config);
    config.validate().expect("valid selection");
    CandidateSelector::new(config, masses)
}

fn edit_d0_cuts(config: &mut SelectionConfig, edit: impl Fn(&mut TopologicalCuts)) {
    for cuts in config.d0.cuts.cuts.iter_mut() {
        edit(cuts);
    }
}

#[test]
fn default_cuts_accept_true_d0() {
    let cand = d0_candidate();
    let selector = selector_with(|_| {});
    assert_eq!(selector.check(D0, 0, &cand, &NoPid), Ok(()));
    let status = selector.select(&cand, &NoPid);
    assert!(status.is_selected(D0, 0));
    assert!(!status.any(DecayChannel::JpsiToEE));
}

#[test]
fn unflagged_or_disabled_channel_is_rejected_first() {
    let mut cand = d0_candidate();
    let selector = selector_with(|_| {});
    assert_eq!(
        selector.check(DecayChannel::JpsiToEE, 0, &cand, &NoPid),
        Err(Rejection::ChannelFlag)
    );

    let disabled = selector_with(|c| c.d0.enabled = false);
    assert_eq!(disabled.check(D0, 0, &cand, &NoPid), Err(Rejection::ChannelFlag));

    cand.flags = HfFlags::empty();
    assert_eq!(selector.check(D0, 0, &cand, &NoPid), Err(Rejection::ChannelFlag));
    assert!(selector.select(&cand, &NoPid).is_empty());
}

#[test]
fn pt_range_and_bins() {
    let cand = d0_candidate();
    let narrow = selector_with(|c| c.d0.pt_max = 1.5);
    assert_eq!(narrow.check(D0, 0, &cand, &NoPid), Err(Rejection::PtOutOfRange));

    let no_bin = selector_with(|c| {
        let bins = PtBins::new(vec![5.0, 50.0]).expect("valid edges");
        c.d0.cuts = CutTable::uniform(bins, TopologicalCuts::default());
    });
    assert_eq!(no_bin.check(D0, 0, &cand, &NoPid), Err(Rejection::NoPtBin));
}

#[test]
fn bin_lookup_precedes_the_pt_range() {
    let cand = d0_candidate();
    let selector = selector_with(|c| {
        c.d0.pt_max = 1.5;
        let bins = PtBins::new(vec![5.0, 50.0]).expect("valid edges");
        c.d0.cuts = CutTable::uniform(bins, TopologicalCuts::default());
    });
    assert_eq!(selector.check(D0, 0, &cand, &NoPid), Err(Rejection::NoPtBin));
}

#[test]
fn each_topological_cut_reports_its_reason() {
    let cand = d0_candidate();
    let cases: [(fn(&mut TopologicalCuts), Rejection); 7] = [
        (|c| c.mass_window = 1e-6, Rejection::Mass),
        (|c| c.daughter_pt_min = 10.0, Rejection::DaughterPt),
        (|c| c.dca_xy_max = 1e-7, Rejection::DcaXy),
        (|c| c.dca_z_max = 1e-9, Rejection::DcaZ),
        (|c| c.cpa_min = 1.0 + 1e-9, Rejection::CosPointingAngle),
        (|c| c.decay_length_min = 1.0, Rejection::DecayLength),
        (|c| c.impact_parameter_product_max = -1.0, Rejection::ImpactParameterProduct),
    ];
    for (edit, expected) in cases {
        let selector = off_mass_selector_with(|c| edit_d0_cuts(c, edit));
        assert_eq!(selector.check(D0, 0, &cand, &NoPid), Err(expected), "{expected}");
    }
}

#[test]
fn mass_is_checked_before_topology() {
    let cand = d0_candidate();
    let off_mass = off_mass_selector_with(|_| {});
    assert_eq!(off_mass.check(D0, 0, &cand, &NoPid), Ok(()));

    let selector = off_mass_selector_with(|c| {
        edit_d0_cuts(c, |cuts| {
            cuts.mass_window = 0.1;
            cuts.decay_length_min = 1.0;
        })
    });
    assert_eq!(selector.check(D0, 0, &cand, &NoPid), Err(Rejection::Mass));
}

#[test]
fn pid_uses_the_prong_species_of_each_hypothesis() {
    let cand = d0_candidate();
    // Track 1 (negative) is the kaon in hypothesis 0 and the pion in 1.
    let mut pid = PidTable::default();
    pid.insert(
        1,
        &PidMeasurement {
            detector: PidDetector::Tpc,
            species: Species::Kaon,
            n_sigma: 0.2,
        },
    );
    pid.insert(
        1,
        &PidMeasurement {
            detector: PidDetector::Tpc,
            species: Species::Pion,
            n_sigma: 7.0,
        },
    );
    let selector = selector_with(|_| {});
    assert_eq!(selector.check(D0, 0, &cand, &pid), Ok(()));
    assert_eq!(selector.check(D0, 1, &cand, &pid), Err(Rejection::Pid));

    let status = selector.select(&cand, &pid);
    assert!(status.is_selected(D0, 0));
    assert!(!status.is_selected(D0, 1));
}

#[test]
fn missing_pid_follows_accept_without_pid() {
    let cand = d0_candidate();
    let strict = selector_with(|c| c.pid.accept_without_pid = false);
    assert_eq!(strict.check(D0, 0, &cand, &NoPid), Err(Rejection::Pid));
    assert!(strict.select(&cand, &NoPid).is_empty());
}

#[test]
fn exclusive_policy_keeps_hypothesis_closest_to_mother_mass() {
    let cand = d0_candidate();
    let any = selector_with(|_| {});
    let both = any.select(&cand, &NoPid);
    assert!(both.is_selected(D0, 0) && both.is_selected(D0, 1));

    let exclusive = selector_with(|c| c.policy = HypothesisPolicy::Exclusive);
    let one = exclusive.select(&cand, &NoPid);
    assert!(one.is_selected(D0, 0));
    assert!(!one.is_selected(D0, 1));
}

#[test]
fn invalid_pt_range_fails_validation() {
    let mut config = SelectionConfig::default();
    config.bplus.pt_min = 10.0;
    config.bplus.pt_max = 5.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidPtRange { min, max }) if min == 10.0 && max == 5.0
    ));
}

#[test]
fn rejection_names_are_snake_case() {
    assert_eq!(Rejection::CosPointingAngle.to_string(), "cos_pointing_angle");
    assert_eq!(Rejection::NoPtBin.as_str(), "no_pt_bin");
}
