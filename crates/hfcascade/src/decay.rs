//! Decay channels, their topologies and daughter mass hypotheses.

use crate::config::ConfigError;
use crate::pdg::{code, MassLookup};

/// How a candidate of a channel is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Topology {
    /// Opposite-sign track pair.
    TwoProng,
    /// `(+, -, +)` or `(-, +, -)` track triplet.
    ThreeProng,
    /// Lower-stage composite plus one bachelor track.
    Cascade,
}

/// One assignment of particle species to the prongs, in prong order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hypothesis {
    pub name: &'static str,
    pub prongs: &'static [i32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum DecayChannel {
    D0ToPiK,
    JpsiToEE,
    DPlusToPiKPi,
    LcToPKPi,
    DsToKKPi,
    XicToPKPi,
    BPlusToD0Pi,
    XiccToXicPi,
}

const D0_HYPOTHESES: &[Hypothesis] = &[
    Hypothesis { name: "D0", prongs: &[code::PION, code::KAON] },
    Hypothesis { name: "D0bar", prongs: &[code::KAON, code::PION] },
];
const JPSI_HYPOTHESES: &[Hypothesis] = &[Hypothesis {
    name: "J/psi",
    prongs: &[code::ELECTRON, code::ELECTRON],
}];
const DPLUS_HYPOTHESES: &[Hypothesis] = &[Hypothesis {
    name: "D+",
    prongs: &[code::PION, code::KAON, code::PION],
}];
const LC_HYPOTHESES: &[Hypothesis] = &[
    Hypothesis { name: "pKpi", prongs: &[code::PROTON, code::KAON, code::PION] },
    Hypothesis { name: "piKp", prongs: &[code::PION, code::KAON, code::PROTON] },
];
const DS_HYPOTHESES: &[Hypothesis] = &[
    Hypothesis { name: "KKpi", prongs: &[code::KAON, code::KAON, code::PION] },
    Hypothesis { name: "piKK", prongs: &[code::PION, code::KAON, code::KAON] },
];
const BPLUS_HYPOTHESES: &[Hypothesis] = &[Hypothesis {
    name: "B+",
    prongs: &[code::D0, code::PION],
}];
const XICC_HYPOTHESES: &[Hypothesis] = &[Hypothesis {
    name: "Xicc++",
    prongs: &[code::XI_C_PLUS, code::PION],
}];

impl DecayChannel {
    pub const ALL: [DecayChannel; 8] = [
        Self::D0ToPiK,
        Self::JpsiToEE,
        Self::DPlusToPiKPi,
        Self::LcToPKPi,
        Self::DsToKKPi,
        Self::XicToPKPi,
        Self::BPlusToD0Pi,
        Self::XiccToXicPi,
    ];

    pub fn topology(self) -> Topology {
        match self {
            Self::D0ToPiK | Self::JpsiToEE => Topology::TwoProng,
            Self::DPlusToPiKPi | Self::LcToPKPi | Self::DsToKKPi | Self::XicToPKPi => {
                Topology::ThreeProng
            }
            Self::BPlusToD0Pi | Self::XiccToXicPi => Topology::Cascade,
        }
    }

    pub fn mother_pdg(self) -> i32 {
        match self {
            Self::D0ToPiK => code::D0,
            Self::JpsiToEE => code::JPSI,
            Self::DPlusToPiKPi => code::D_PLUS,
            Self::LcToPKPi => code::LAMBDA_C,
            Self::DsToKKPi => code::D_S,
            Self::XicToPKPi => code::XI_C_PLUS,
            Self::BPlusToD0Pi => code::B_PLUS,
            Self::XiccToXicPi => code::XI_CC_PLUS_PLUS,
        }
    }

    /// Mass hypotheses in prong order. Two-prong candidates are ordered
    /// `(positive, negative)`, three-prong ones `(q, -q, q)`; for cascades
    /// prong 0 is the composite.
    pub fn hypotheses(self) -> &'static [Hypothesis] {
        match self {
            Self::D0ToPiK => D0_HYPOTHESES,
            Self::JpsiToEE => JPSI_HYPOTHESES,
            Self::DPlusToPiKPi => DPLUS_HYPOTHESES,
            Self::LcToPKPi | Self::XicToPKPi => LC_HYPOTHESES,
            Self::DsToKKPi => DS_HYPOTHESES,
            Self::BPlusToD0Pi => BPLUS_HYPOTHESES,
            Self::XiccToXicPi => XICC_HYPOTHESES,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::D0ToPiK => "D0ToPiK",
            Self::JpsiToEE => "JpsiToEE",
            Self::DPlusToPiKPi => "DPlusToPiKPi",
            Self::LcToPKPi => "LcToPKPi",
            Self::DsToKKPi => "DsToKKPi",
            Self::XicToPKPi => "XicToPKPi",
            Self::BPlusToD0Pi => "BPlusToD0Pi",
            Self::XiccToXicPi => "XiccToXicPi",
        }
    }

    pub(crate) fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for DecayChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mother and per-hypothesis prong masses resolved once from a mass table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMasses {
    mothers: Vec<f64>,
    prongs: Vec<Vec<Vec<f64>>>,
}

impl ChannelMasses {
    pub fn resolve(lookup: &dyn MassLookup) -> Result<Self, ConfigError> {
        let resolve = |pdg: i32| lookup.mass(pdg).ok_or(ConfigError::UnknownParticle { pdg });
        let mut mothers = Vec::with_capacity(DecayChannel::ALL.len());
        let mut prongs = Vec::with_capacity(DecayChannel::ALL.len());
        for channel in DecayChannel::ALL {
            mothers.push(resolve(channel.mother_pdg())?);
            let hyps = channel
                .hypotheses()
                .iter()
                .map(|h| h.prongs.iter().map(|c| resolve(*c)).collect())
                .collect::<Result<Vec<Vec<f64>>, ConfigError>>()?;
            prongs.push(hyps);
        }
        Ok(Self { mothers, prongs })
    }

    pub fn mother(&self, channel: DecayChannel) -> f64 {
        self.mothers[channel.index()]
    }

    /// Prong masses of hypothesis `h`; empty for an unknown index.
    pub fn prongs(&self, channel: DecayChannel, h: usize) -> &[f64] {
        self.prongs[channel.index()]
            .get(h)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Set of channels a track combination was tagged with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HfFlags(u16);

impl HfFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, channel: DecayChannel) {
        self.0 |= channel.bit();
    }

    pub fn contains(self, channel: DecayChannel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn iter(self) -> impl Iterator<Item = DecayChannel> {
        DecayChannel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<DecayChannel> for HfFlags {
    fn from_iter<I: IntoIterator<Item = DecayChannel>>(iter: I) -> Self {
        let mut flags = Self::empty();
        for c in iter {
            flags.insert(c);
        }
        flags
    }
}

/// Per-(channel, hypothesis) selection outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SelectionStatus(u32);

/// Hypotheses per channel never exceed this.
pub const MAX_HYPOTHESES: usize = 2;

impl SelectionStatus {
    fn bit(channel: DecayChannel, hypothesis: usize) -> u32 {
        debug_assert!(hypothesis < MAX_HYPOTHESES);
        1 << (channel.index() * MAX_HYPOTHESES + hypothesis)
    }

    pub fn set(&mut self, channel: DecayChannel, hypothesis: usize) {
        self.0 |= Self::bit(channel, hypothesis);
    }

    pub fn clear_channel(&mut self, channel: DecayChannel) {
        for h in 0..MAX_HYPOTHESES {
            self.0 &= !Self::bit(channel, h);
        }
    }

    pub fn is_selected(self, channel: DecayChannel, hypothesis: usize) -> bool {
        hypothesis < MAX_HYPOTHESES && self.0 & Self::bit(channel, hypothesis) != 0
    }

    pub fn any(self, channel: DecayChannel) -> bool {
        (0..MAX_HYPOTHESES).any(|h| self.is_selected(channel, h))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypotheses_match_topology_arity() {
        for channel in DecayChannel::ALL {
            let arity = match channel.topology() {
                Topology::TwoProng | Topology::Cascade => 2,
                Topology::ThreeProng => 3,
            };
            assert!(channel.hypotheses().len() <= MAX_HYPOTHESES);
            for h in channel.hypotheses() {
                assert_eq!(h.prongs.len(), arity, "{channel} {}", h.name);
            }
        }
    }

    #[test]
    fn builtin_table_resolves_every_channel() {
        let masses = ChannelMasses::resolve(&crate::pdg::PdgTable::default()).expect("complete");
        assert_eq!(masses.mother(DecayChannel::D0ToPiK), 1.86484);
        assert_eq!(masses.prongs(DecayChannel::D0ToPiK, 1), &[0.493677, 0.13957039]);
        assert!(masses.prongs(DecayChannel::JpsiToEE, 1).is_empty());
    }

    #[test]
    fn missing_mass_is_a_configuration_error() {
        struct OnlyPions;
        impl MassLookup for OnlyPions {
            fn mass(&self, pdg: i32) -> Option<f64> {
                (pdg.abs() == code::PION).then_some(0.13957039)
            }
        }
        assert!(matches!(
            ChannelMasses::resolve(&OnlyPions),
            Err(ConfigError::UnknownParticle { pdg: code::D0 })
        ));
    }

    #[test]
    fn flags_round_trip_through_iteration() {
        let flags: HfFlags = [DecayChannel::D0ToPiK, DecayChannel::XicToPKPi]
            .into_iter()
            .collect();
        assert!(flags.contains(DecayChannel::D0ToPiK));
        assert!(!flags.contains(DecayChannel::LcToPKPi));
        let back: Vec<_> = flags.iter().collect();
        assert_eq!(back, vec![DecayChannel::D0ToPiK, DecayChannel::XicToPKPi]);
    }

    #[test]
    fn selection_status_is_per_hypothesis() {
        let mut s = SelectionStatus::default();
        s.set(DecayChannel::D0ToPiK, 1);
        assert!(!s.is_selected(DecayChannel::D0ToPiK, 0));
        assert!(s.is_selected(DecayChannel::D0ToPiK, 1));
        assert!(s.any(DecayChannel::D0ToPiK));
        assert!(!s.any(DecayChannel::JpsiToEE));
        s.clear_channel(DecayChannel::D0ToPiK);
        assert!(s.is_empty());
    }
}
