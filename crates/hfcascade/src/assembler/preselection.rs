use crate::candidate::{Observables, ProngSet};
use crate::config::ConfigError;
use crate::decay::{ChannelMasses, DecayChannel, HfFlags};

/// Loose skim of one two-prong channel.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TwoProngSkim {
    pub enabled: bool,
    pub pt_min: f64,
    /// Accepted invariant mass range of at least one hypothesis [GeV].
    pub mass_min: f64,
    pub mass_max: f64,
    pub cpa_min: f64,
    /// Maximum product of the prong impact parameters [cm^2].
    pub impact_parameter_product_max: f64,
}

impl Default for TwoProngSkim {
    fn default() -> Self {
        Self {
            enabled: true,
            pt_min: 0.0,
            mass_min: 0.0,
            mass_max: 100.0,
            cpa_min: -2.0,
            impact_parameter_product_max: 1000.0,
        }
    }
}

/// Loose skim of one three-prong channel.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ThreeProngSkim {
    pub enabled: bool,
    pub pt_min: f64,
    pub mass_min: f64,
    pub mass_max: f64,
    pub cpa_min: f64,
    /// Minimum decay length [cm].
    pub decay_length_min: f64,
}

impl Default for ThreeProngSkim {
    fn default() -> Self {
        Self {
            enabled: true,
            pt_min: 0.0,
            mass_min: 0.0,
            mass_max: 100.0,
            cpa_min: 0.5,
            decay_length_min: 0.0,
        }
    }
}

/// Channel tagging of fresh 2- and 3-prong combinations.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreselectionConfig {
    pub d0: TwoProngSkim,
    pub jpsi: TwoProngSkim,
    pub dplus: ThreeProngSkim,
    pub lc: ThreeProngSkim,
    pub ds: ThreeProngSkim,
    pub xic: ThreeProngSkim,
}

impl Default for PreselectionConfig {
    fn default() -> Self {
        Self {
            d0: TwoProngSkim {
                mass_min: 1.46,
                mass_max: 2.26,
                cpa_min: 0.75,
                impact_parameter_product_max: -5e-5,
                ..TwoProngSkim::default()
            },
            jpsi: TwoProngSkim {
                mass_min: 2.75,
                mass_max: 3.45,
                ..TwoProngSkim::default()
            },
            dplus: ThreeProngSkim {
                mass_min: 1.7,
                mass_max: 2.05,
                ..ThreeProngSkim::default()
            },
            lc: ThreeProngSkim {
                mass_min: 2.1,
                mass_max: 2.5,
                ..ThreeProngSkim::default()
            },
            ds: ThreeProngSkim {
                mass_min: 1.7,
                mass_max: 2.2,
                ..ThreeProngSkim::default()
            },
            xic: ThreeProngSkim {
                mass_min: 2.2,
                mass_max: 2.7,
                ..ThreeProngSkim::default()
            },
        }
    }
}

fn check_mass_range(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min.is_nan() || max.is_nan() {
        return Err(ConfigError::NonFinite { field });
    }
    if min > max {
        return Err(ConfigError::OutOfRange { field, value: min });
    }
    Ok(())
}

impl PreselectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_mass_range("preselection.d0.mass_min", self.d0.mass_min, self.d0.mass_max)?;
        check_mass_range("preselection.jpsi.mass_min", self.jpsi.mass_min, self.jpsi.mass_max)?;
        check_mass_range("preselection.dplus.mass_min", self.dplus.mass_min, self.dplus.mass_max)?;
        check_mass_range("preselection.lc.mass_min", self.lc.mass_min, self.lc.mass_max)?;
        check_mass_range("preselection.ds.mass_min", self.ds.mass_min, self.ds.mass_max)?;
        check_mass_range("preselection.xic.mass_min", self.xic.mass_min, self.xic.mass_max)
    }

    /// Channels of the combination's topology whose skim it passes.
    pub fn flags(&self, prongs: &ProngSet, obs: &Observables, masses: &ChannelMasses) -> HfFlags {
        let topology = prongs.topology();
        let in_window = |channel: DecayChannel, min: f64, max: f64| {
            (0..channel.hypotheses().len()).any(|h| {
                prongs
                    .invariant_mass(masses.prongs(channel, h))
                    .is_some_and(|m| m >= min && m <= max)
            })
        };
        let mut flags = HfFlags::empty();
        for channel in DecayChannel::ALL {
            if channel.topology() != topology {
                continue;
            }
            let pass = match channel {
                DecayChannel::D0ToPiK | DecayChannel::JpsiToEE => {
                    let skim = if channel == DecayChannel::D0ToPiK {
                        &self.d0
                    } else {
                        &self.jpsi
                    };
                    skim.enabled
                        && obs.pt >= skim.pt_min
                        && in_window(channel, skim.mass_min, skim.mass_max)
                        && obs.cpa >= skim.cpa_min
                        && obs
                            .impact_parameter_product
                            .map_or(true, |d| d <= skim.impact_parameter_product_max)
                }
                DecayChannel::DPlusToPiKPi
                | DecayChannel::LcToPKPi
                | DecayChannel::DsToKKPi
                | DecayChannel::XicToPKPi => {
                    let skim = match channel {
                        DecayChannel::DPlusToPiKPi => &self.dplus,
                        DecayChannel::LcToPKPi => &self.lc,
                        DecayChannel::DsToKKPi => &self.ds,
                        _ => &self.xic,
                    };
                    skim.enabled
                        && obs.pt >= skim.pt_min
                        && in_window(channel, skim.mass_min, skim.mass_max)
                        && obs.cpa >= skim.cpa_min
                        && obs.decay_length >= skim.decay_length_min
                }
                // Cascades are tagged by their stage, not skimmed.
                DecayChannel::BPlusToD0Pi | DecayChannel::XiccToXicPi => false,
            };
            if pass {
                flags.insert(channel);
            }
        }
        flags
    }
}
