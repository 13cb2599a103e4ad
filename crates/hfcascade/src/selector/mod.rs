//! pT-binned topological and PID selection of decay candidates.

pub mod bins;
pub mod pid;

pub use bins::{CutTable, PtBins, TopologicalCuts};
pub use pid::{
    DetectorPid, NoPid, PidConfig, PidDetector, PidMeasurement, PidResponse, PidStatus, PidTable,
    Species,
};

use crate::candidate::Candidate;
use crate::config::ConfigError;
use crate::decay::{ChannelMasses, DecayChannel, SelectionStatus};

/// First predicate a candidate failed for one hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Rejection {
    /// Channel disabled or not flagged by the preselection.
    ChannelFlag,
    NoPtBin,
    PtOutOfRange,
    Mass,
    DaughterPt,
    DcaXy,
    DcaZ,
    CosPointingAngle,
    DecayLength,
    ImpactParameterProduct,
    Pid,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChannelFlag => "channel_flag",
            Self::NoPtBin => "no_pt_bin",
            Self::PtOutOfRange => "pt_out_of_range",
            Self::Mass => "mass",
            Self::DaughterPt => "daughter_pt",
            Self::DcaXy => "dca_xy",
            Self::DcaZ => "dca_z",
            Self::CosPointingAngle => "cos_pointing_angle",
            Self::DecayLength => "decay_length",
            Self::ImpactParameterProduct => "impact_parameter_product",
            Self::Pid => "pid",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when several hypotheses of one channel pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisPolicy {
    /// Every passing hypothesis is flagged.
    #[default]
    Any,
    /// Only the passing hypothesis with mass closest to the mother is kept.
    Exclusive,
}

/// Selection of one decay channel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChannelSelectionConfig {
    pub enabled: bool,
    /// Lower edge of the candidate pT analysis range [GeV].
    pub pt_min: f64,
    /// Upper edge (exclusive) of the candidate pT analysis range [GeV].
    pub pt_max: f64,
    pub cuts: CutTable,
}

impl Default for ChannelSelectionConfig {
    fn default() -> Self {
        Self::uniform(&[0.0, 50.0], TopologicalCuts::default())
    }
}

impl ChannelSelectionConfig {
    fn uniform(edges: &[f64], cuts: TopologicalCuts) -> Self {
        Self {
            enabled: true,
            pt_min: 0.0,
            pt_max: 50.0,
            cuts: CutTable::uniform(PtBins::from_sorted(edges), cuts),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pt_min.is_nan() || self.pt_max.is_nan() || self.pt_min >= self.pt_max {
            return Err(ConfigError::InvalidPtRange {
                min: self.pt_min,
                max: self.pt_max,
            });
        }
        self.cuts.validate()
    }
}

/// Selections of every channel plus the shared PID settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub policy: HypothesisPolicy,
    pub pid: PidConfig,
    pub d0: ChannelSelectionConfig,
    pub jpsi: ChannelSelectionConfig,
    pub dplus: ChannelSelectionConfig,
    pub lc: ChannelSelectionConfig,
    pub ds: ChannelSelectionConfig,
    pub xic: ChannelSelectionConfig,
    pub bplus: ChannelSelectionConfig,
    pub xicc: ChannelSelectionConfig,
}

const D0_PT_EDGES: [f64; 11] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 12.0, 24.0, 50.0];
const THREE_PRONG_PT_EDGES: [f64; 8] = [0.0, 2.0, 4.0, 6.0, 8.0, 12.0, 24.0, 50.0];

impl Default for SelectionConfig {
    fn default() -> Self {
        let three_prong = ChannelSelectionConfig::uniform(
            &THREE_PRONG_PT_EDGES,
            TopologicalCuts {
                daughter_pt_min: 0.3,
                cpa_min: 0.7,
                ..TopologicalCuts::default()
            },
        );
        Self {
            policy: HypothesisPolicy::Any,
            pid: PidConfig::default(),
            d0: ChannelSelectionConfig::uniform(
                &D0_PT_EDGES,
                TopologicalCuts {
                    daughter_pt_min: 0.5,
                    dca_xy_max: 0.1,
                    cpa_min: 0.8,
                    impact_parameter_product_max: -5e-5,
                    ..TopologicalCuts::default()
                },
            ),
            jpsi: ChannelSelectionConfig::uniform(
                &[0.0, 50.0],
                TopologicalCuts {
                    mass_window: 0.5,
                    daughter_pt_min: 1.0,
                    dca_xy_max: 1.0,
                    dca_z_max: 2.0,
                    ..TopologicalCuts::default()
                },
            ),
            dplus: three_prong.clone(),
            lc: three_prong.clone(),
            ds: three_prong.clone(),
            xic: three_prong,
            bplus: ChannelSelectionConfig::uniform(
                &[0.0, 50.0],
                TopologicalCuts {
                    mass_window: 1.0,
                    cpa_min: 0.8,
                    ..TopologicalCuts::default()
                },
            ),
            xicc: ChannelSelectionConfig::uniform(
                &[0.0, 50.0],
                TopologicalCuts {
                    mass_window: 1.0,
                    ..TopologicalCuts::default()
                },
            ),
        }
    }
}

impl SelectionConfig {
    pub fn channel(&self, channel: DecayChannel) -> &ChannelSelectionConfig {
        match channel {
            DecayChannel::D0ToPiK => &self.d0,
            DecayChannel::JpsiToEE => &self.jpsi,
            DecayChannel::DPlusToPiKPi => &self.dplus,
            DecayChannel::LcToPKPi => &self.lc,
            DecayChannel::DsToKKPi => &self.ds,
            DecayChannel::XicToPKPi => &self.xic,
            DecayChannel::BPlusToD0Pi => &self.bplus,
            DecayChannel::XiccToXicPi => &self.xicc,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in DecayChannel::ALL {
            self.channel(channel).validate()?;
        }
        self.pid.validate()
    }
}

/// Stateless predicate stack over candidates.
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    config: SelectionConfig,
    masses: ChannelMasses,
}

impl CandidateSelector {
    pub fn new(config: SelectionConfig, masses: ChannelMasses) -> Self {
        Self { config, masses }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn masses(&self) -> &ChannelMasses {
        &self.masses
    }

    /// Status bits of every flagged channel after applying the hypothesis
    /// policy. Channels not flagged on the candidate stay unselected.
    pub fn select(&self, cand: &Candidate, pid: &dyn PidResponse) -> SelectionStatus {
        let mut status = SelectionStatus::default();
        for channel in cand.flags.iter() {
            let mut passing = Vec::new();
            for h in 0..channel.hypotheses().len() {
                match self.check(channel, h, cand, pid) {
                    Ok(()) => passing.push(h),
                    Err(reason) => {
                        tracing::trace!(
                            "{channel} hypothesis {} rejected: {reason}",
                            channel.hypotheses()[h].name
                        );
                    }
                }
            }
            if self.config.policy == HypothesisPolicy::Exclusive && passing.len() > 1 {
                let mother = self.masses.mother(channel);
                let distance = |h: usize| {
                    cand.invariant_mass(self.masses.prongs(channel, h))
                        .map_or(f64::INFINITY, |m| (m - mother).abs())
                };
                passing.sort_by(|a, b| distance(*a).total_cmp(&distance(*b)));
                passing.truncate(1);
            }
            for h in passing {
                status.set(channel, h);
            }
        }
        status
    }

    /// Evaluate hypothesis `h` of `channel`, stopping at the first failure.
    pub fn check(
        &self,
        channel: DecayChannel,
        h: usize,
        cand: &Candidate,
        pid: &dyn PidResponse,
    ) -> Result<(), Rejection> {
        let cfg = self.config.channel(channel);
        if !cfg.enabled || !cand.flags.contains(channel) {
            return Err(Rejection::ChannelFlag);
        }
        let obs = &cand.observables;
        let cuts = cfg.cuts.lookup(obs.pt).ok_or(Rejection::NoPtBin)?;
        if !(obs.pt >= cfg.pt_min && obs.pt < cfg.pt_max) {
            return Err(Rejection::PtOutOfRange);
        }

        let mass = cand
            .invariant_mass(self.masses.prongs(channel, h))
            .ok_or(Rejection::Mass)?;
        if (mass - self.masses.mother(channel)).abs() > cuts.mass_window {
            return Err(Rejection::Mass);
        }

        let prongs = cand.prongs.as_slice();
        if prongs.iter().any(|p| p.pt() < cuts.daughter_pt_min) {
            return Err(Rejection::DaughterPt);
        }
        if prongs
            .iter()
            .any(|p| p.impact_parameter.y.abs() > cuts.dca_xy_max)
        {
            return Err(Rejection::DcaXy);
        }
        if prongs
            .iter()
            .any(|p| p.impact_parameter.z.abs() > cuts.dca_z_max)
        {
            return Err(Rejection::DcaZ);
        }
        if obs.cpa < cuts.cpa_min || obs.cpa_xy < cuts.cpa_xy_min {
            return Err(Rejection::CosPointingAngle);
        }
        if obs.decay_length < cuts.decay_length_min
            || obs.decay_length_xy < cuts.decay_length_xy_min
        {
            return Err(Rejection::DecayLength);
        }
        if let Some(product) = obs.impact_parameter_product {
            if product > cuts.impact_parameter_product_max {
                return Err(Rejection::ImpactParameterProduct);
            }
        }

        let hypothesis = &channel.hypotheses()[h];
        for (prong, pdg) in prongs.iter().zip(hypothesis.prongs) {
            let (Some(index), Some(species)) = (prong.track.raw_index(), Species::from_pdg(*pdg))
            else {
                continue;
            };
            let status = self
                .config
                .pid
                .track_status(pid, index, prong.track.state.pt(), species);
            if !self.config.pid.passes(status) {
                return Err(Rejection::Pid);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
