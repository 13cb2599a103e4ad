//! Decay candidates and their flat output rows.

use crate::decay::{ChannelMasses, DecayChannel, HfFlags, SelectionStatus, Topology};
use crate::kinematics as kin;
use crate::pipeline::PrimaryVertex;
use crate::track::{CascadeTrack, ImpactParameter, TrackOrigin};

/// One daughter of a candidate.
#[derive(Debug, Clone)]
pub struct Prong {
    /// Input state with provenance.
    pub track: CascadeTrack,
    /// Momentum at the secondary vertex.
    pub momentum: [f64; 3],
    /// Impact parameter of the input state to the primary vertex.
    pub impact_parameter: ImpactParameter,
}

impl Prong {
    pub fn pt(&self) -> f64 {
        kin::pt(self.momentum)
    }

    pub fn charge(&self) -> i8 {
        self.track.charge
    }
}

#[derive(Debug, Clone)]
pub enum ProngSet {
    /// `(positive, negative)`.
    TwoProng([Prong; 2]),
    /// `(q, -q, q)`.
    ThreeProng([Prong; 3]),
    /// `(composite, bachelor)`.
    Cascade([Prong; 2]),
}

impl ProngSet {
    pub fn as_slice(&self) -> &[Prong] {
        match self {
            Self::TwoProng(p) | Self::Cascade(p) => p,
            Self::ThreeProng(p) => p,
        }
    }

    pub fn topology(&self) -> Topology {
        match self {
            Self::TwoProng(_) => Topology::TwoProng,
            Self::ThreeProng(_) => Topology::ThreeProng,
            Self::Cascade(_) => Topology::Cascade,
        }
    }

    /// Invariant mass under `masses` (one per prong, in prong order).
    pub fn invariant_mass(&self, masses: &[f64]) -> Option<f64> {
        match self {
            Self::TwoProng(p) | Self::Cascade(p) => {
                let m: &[f64; 2] = masses.try_into().ok()?;
                Some(kin::invariant_mass(&[p[0].momentum, p[1].momentum], m))
            }
            Self::ThreeProng(p) => {
                let m: &[f64; 3] = masses.try_into().ok()?;
                Some(kin::invariant_mass(
                    &[p[0].momentum, p[1].momentum, p[2].momentum],
                    m,
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SecondaryVertex {
    pub position: [f64; 3],
    /// Packed `[xx, xy, yy, xz, yz, zz]`.
    pub covariance: [f64; 6],
    pub chi2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Observables {
    pub pt: f64,
    pub p: f64,
    pub phi: f64,
    pub eta: Option<f64>,
    pub decay_length: f64,
    pub decay_length_xy: f64,
    pub decay_length_error: f64,
    pub decay_length_xy_error: f64,
    /// Decay length over its error; `None` without vertex covariances.
    pub decay_length_normalized: Option<f64>,
    pub decay_length_xy_normalized: Option<f64>,
    pub cpa: f64,
    pub cpa_xy: f64,
    /// Only defined for two-daughter candidates.
    pub impact_parameter_product: Option<f64>,
    pub max_normalized_d0_deviation: f64,
    /// Distance from this vertex to the decay vertex of the composite
    /// prong; cascades only.
    pub composite_decay_length: Option<f64>,
}

impl Observables {
    pub fn compute(
        pv: &PrimaryVertex,
        sv: &SecondaryVertex,
        momentum: [f64; 3],
        prongs: &[Prong],
    ) -> Self {
        let pvp = pv.position;
        let svp = sv.position;
        let impact_parameter_product = match prongs {
            [a, b] => Some(a.impact_parameter.y * b.impact_parameter.y),
            _ => None,
        };
        let d0s: Vec<_> = prongs
            .iter()
            .map(|p| (p.momentum, p.impact_parameter.y, p.impact_parameter.sigma_y()))
            .collect();
        let decay_length = kin::decay_length(pvp, svp);
        let decay_length_xy = kin::decay_length_xy(pvp, svp);
        let decay_length_error = kin::decay_length_error(pvp, &pv.covariance, svp, &sv.covariance);
        let decay_length_xy_error =
            kin::decay_length_xy_error(pvp, &pv.covariance, svp, &sv.covariance);
        Self {
            pt: kin::pt(momentum),
            p: kin::p(momentum),
            phi: kin::phi(momentum),
            eta: kin::eta(momentum),
            decay_length,
            decay_length_xy,
            decay_length_error,
            decay_length_xy_error,
            decay_length_normalized: kin::normalized(decay_length, decay_length_error),
            decay_length_xy_normalized: kin::normalized(decay_length_xy, decay_length_xy_error),
            cpa: kin::cos_pointing_angle(pvp, svp, momentum),
            cpa_xy: kin::cos_pointing_angle_xy(pvp, svp, momentum),
            impact_parameter_product,
            max_normalized_d0_deviation: kin::max_normalized_d0_deviation(
                pvp, svp, momentum, &d0s,
            ),
            composite_decay_length: prongs.iter().find_map(|p| match &p.track.origin {
                TrackOrigin::Composite(c) => Some(kin::decay_length(svp, c.vertex)),
                TrackOrigin::Raw { .. } => None,
            }),
        }
    }
}

/// A reconstructed multi-prong decay hypothesis.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub collision_id: u64,
    /// Channels the combination passed preselection for.
    pub flags: HfFlags,
    /// Channels and hypotheses that passed the full selection.
    pub status: SelectionStatus,
    pub vertex: SecondaryVertex,
    /// Sum of the daughter momenta at the vertex.
    pub momentum: [f64; 3],
    pub prongs: ProngSet,
    pub observables: Observables,
    /// Neutral composite trajectory used as input by later stages.
    pub track: CascadeTrack,
}

impl Candidate {
    pub fn topology(&self) -> Topology {
        self.prongs.topology()
    }

    /// Physical charge (sum of the daughter charges).
    pub fn charge(&self) -> i8 {
        self.track.charge
    }

    pub fn track_indices(&self) -> Vec<usize> {
        self.track.track_indices()
    }

    pub fn invariant_mass(&self, masses: &[f64]) -> Option<f64> {
        self.prongs.invariant_mass(masses)
    }

    pub fn rapidity(&self, mass: f64) -> Option<f64> {
        kin::rapidity(self.momentum, mass)
    }

    pub fn ct(&self, pv: &PrimaryVertex, mass: f64) -> Option<f64> {
        kin::ct(pv.position, self.vertex.position, self.momentum, mass)
    }

    /// One row per channel this candidate was selected for.
    pub fn to_rows(&self, pv: &PrimaryVertex, masses: &ChannelMasses) -> Vec<CandidateRow> {
        let mut rows = Vec::new();
        for channel in self.flags.iter() {
            if !self.status.any(channel) {
                continue;
            }
            let hypotheses = channel
                .hypotheses()
                .iter()
                .enumerate()
                .filter(|(h, _)| self.status.is_selected(channel, *h))
                .filter_map(|(h, hyp)| {
                    Some(HypothesisRow {
                        name: hyp.name.to_string(),
                        mass: self.invariant_mass(masses.prongs(channel, h))?,
                    })
                })
                .collect();
            let mother = masses.mother(channel);
            let prongs = self.prongs.as_slice();
            rows.push(CandidateRow {
                collision_id: self.collision_id,
                channel,
                flags: self.flags.bits(),
                status: self.status.bits(),
                hypotheses,
                tracks: self.track_indices(),
                charge: self.charge(),
                primary_vertex: pv.position,
                vertex: self.vertex,
                momentum: self.momentum,
                prong_momenta: prongs.iter().map(|p| p.momentum).collect(),
                observables: self.observables,
                impact_parameters: prongs.iter().map(|p| p.impact_parameter.y).collect(),
                impact_parameter_errors: prongs
                    .iter()
                    .map(|p| p.impact_parameter.sigma_y())
                    .collect(),
                ct: self.ct(pv, mother),
                rapidity: self.rapidity(mother),
                gamma_beta: kin::gamma_beta(self.momentum, mother),
            });
        }
        rows
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HypothesisRow {
    pub name: String,
    pub mass: f64,
}

/// Flat, serializable summary of a selected candidate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateRow {
    pub collision_id: u64,
    pub channel: DecayChannel,
    /// Raw preselection flags of the candidate.
    pub flags: u16,
    /// Raw selection status bits of the candidate.
    pub status: u32,
    /// Selected hypotheses with their invariant masses.
    pub hypotheses: Vec<HypothesisRow>,
    /// Raw track indices consumed, depth-first.
    pub tracks: Vec<usize>,
    pub charge: i8,
    pub primary_vertex: [f64; 3],
    pub vertex: SecondaryVertex,
    pub momentum: [f64; 3],
    /// Daughter momenta at the secondary vertex, in prong order.
    pub prong_momenta: Vec<[f64; 3]>,
    pub observables: Observables,
    pub impact_parameters: Vec<f64>,
    pub impact_parameter_errors: Vec<f64>,
    pub ct: Option<f64>,
    pub rapidity: Option<f64>,
    pub gamma_beta: Option<f64>,
}
