use crate::candidate::Candidate;
use crate::config::ConfigError;
use crate::decay::{ChannelMasses, DecayChannel, MAX_HYPOTHESES};

/// Requirements on the lower-stage candidates of one cascade.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CascadeStageConfig {
    pub enabled: bool,
    /// Minimum selection flag (0 or 1) per lower-stage hypothesis; a
    /// hypothesis qualifies when its flag reaches the threshold.
    pub selection_flags: [u8; MAX_HYPOTHESES],
    /// Maximum |eta| of the lower-stage candidate; negative disables.
    pub max_abs_eta: f64,
    /// Maximum |y| of the lower-stage candidate; negative disables.
    pub max_abs_rapidity: f64,
    /// Minimum pT of the cascade candidate [GeV].
    pub pt_min: f64,
}

impl Default for CascadeStageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            selection_flags: [1; MAX_HYPOTHESES],
            max_abs_eta: -1.0,
            max_abs_rapidity: -1.0,
            pt_min: 0.0,
        }
    }
}

impl CascadeStageConfig {
    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if let Some(flag) = self.selection_flags.iter().find(|f| **f > 1) {
            return Err(ConfigError::OutOfRange {
                field,
                value: f64::from(*flag),
            });
        }
        if self.max_abs_eta.is_nan() || self.max_abs_rapidity.is_nan() || self.pt_min.is_nan() {
            return Err(ConfigError::NonFinite { field });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// B+ -> D0 pi+ from selected D0 candidates.
    pub bplus: CascadeStageConfig,
    /// Xicc++ -> Xic+ pi+ from selected Xic candidates.
    pub xicc: CascadeStageConfig,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            bplus: CascadeStageConfig {
                max_abs_eta: 1.0,
                ..CascadeStageConfig::default()
            },
            xicc: CascadeStageConfig::default(),
        }
    }
}

impl CascadeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bplus.validate("cascades.bplus")?;
        self.xicc.validate("cascades.xicc")
    }

    /// Stage settings of a cascade channel; `None` for other topologies.
    pub fn stage(&self, channel: DecayChannel) -> Option<&CascadeStageConfig> {
        match channel {
            DecayChannel::BPlusToD0Pi => Some(&self.bplus),
            DecayChannel::XiccToXicPi => Some(&self.xicc),
            _ => None,
        }
    }
}

/// Lower-stage channel consumed by a cascade.
pub(crate) fn lower_channel(channel: DecayChannel) -> Option<DecayChannel> {
    match channel {
        DecayChannel::BPlusToD0Pi => Some(DecayChannel::D0ToPiK),
        DecayChannel::XiccToXicPi => Some(DecayChannel::XicToPKPi),
        _ => None,
    }
}

/// Whether `lower` may seed a cascade of `channel`, and which bachelor
/// charges it accepts.
///
/// B+: a D0 pairs with a negative bachelor, a D0bar with a positive one.
/// Xicc: the bachelor carries the sign of the Xic.
pub(crate) fn bachelor_charges(
    channel: DecayChannel,
    cfg: &CascadeStageConfig,
    lower: &Candidate,
    masses: &ChannelMasses,
) -> Vec<i8> {
    let Some(lower_ch) = lower_channel(channel) else {
        return Vec::new();
    };
    if !lower.flags.contains(lower_ch) {
        return Vec::new();
    }
    let qualifying: Vec<usize> = (0..lower_ch.hypotheses().len())
        .filter(|h| u8::from(lower.status.is_selected(lower_ch, *h)) >= cfg.selection_flags[*h])
        .collect();
    if qualifying.is_empty() {
        return Vec::new();
    }
    if cfg.max_abs_eta >= 0.0 && !lower.observables.eta.is_some_and(|e| e.abs() <= cfg.max_abs_eta) {
        return Vec::new();
    }
    if cfg.max_abs_rapidity >= 0.0
        && !lower
            .rapidity(masses.mother(lower_ch))
            .is_some_and(|y| y.abs() <= cfg.max_abs_rapidity)
    {
        return Vec::new();
    }

    let mut charges = Vec::with_capacity(2);
    match channel {
        DecayChannel::BPlusToD0Pi => {
            for h in qualifying {
                charges.push(if h == 0 { -1 } else { 1 });
            }
        }
        _ => charges.push(lower.charge().signum()),
    }
    charges.dedup();
    charges
}
