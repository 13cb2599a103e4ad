//! Particle codes and rest masses.

use std::collections::HashMap;

/// PDG Monte Carlo particle codes used by the decay channels.
pub mod code {
    pub const ELECTRON: i32 = 11;
    pub const MUON: i32 = 13;
    pub const PION: i32 = 211;
    pub const KAON: i32 = 321;
    pub const PROTON: i32 = 2212;
    pub const D0: i32 = 421;
    pub const D_PLUS: i32 = 411;
    pub const D_S: i32 = 431;
    pub const LAMBDA_C: i32 = 4122;
    pub const XI_C_PLUS: i32 = 4232;
    pub const XI_CC_PLUS_PLUS: i32 = 4422;
    pub const B_PLUS: i32 = 521;
    pub const JPSI: i32 = 443;
}

/// Resolves a particle code to its rest mass [GeV].
pub trait MassLookup {
    fn mass(&self, pdg: i32) -> Option<f64>;
}

/// Built-in mass table; antiparticles share the particle mass.
#[derive(Debug, Clone, PartialEq)]
pub struct PdgTable {
    masses: HashMap<i32, f64>,
}

impl Default for PdgTable {
    fn default() -> Self {
        let masses = [
            (code::ELECTRON, 0.000_510_998_95),
            (code::MUON, 0.105_658_375_5),
            (code::PION, 0.139_570_39),
            (code::KAON, 0.493_677),
            (code::PROTON, 0.938_272_088_16),
            (code::D0, 1.864_84),
            (code::D_PLUS, 1.869_66),
            (code::D_S, 1.968_34),
            (code::LAMBDA_C, 2.286_46),
            (code::XI_C_PLUS, 2.467_9),
            (code::XI_CC_PLUS_PLUS, 3.621_2),
            (code::B_PLUS, 5.279_34),
            (code::JPSI, 3.096_9),
        ];
        Self {
            masses: masses.into_iter().collect(),
        }
    }
}

impl PdgTable {
    /// Add or override an entry.
    pub fn with_mass(mut self, pdg: i32, mass: f64) -> Self {
        self.masses.insert(pdg.abs(), mass);
        self
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Entries sorted by code.
    pub fn entries(&self) -> Vec<(i32, f64)> {
        let mut out: Vec<(i32, f64)> = self.masses.iter().map(|(k, v)| (*k, *v)).collect();
        out.sort_by_key(|(k, _)| *k);
        out
    }
}

impl MassLookup for PdgTable {
    fn mass(&self, pdg: i32) -> Option<f64> {
        self.masses.get(&pdg.abs()).copied()
    }
}
