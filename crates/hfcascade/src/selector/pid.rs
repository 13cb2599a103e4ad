//! Particle-identification decisions from detector n-sigma responses.

use std::collections::HashMap;

use crate::config::{require_positive, ConfigError};
use crate::pdg::code;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PidDetector {
    Tpc,
    Tof,
    Rich,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Electron,
    Muon,
    Pion,
    Kaon,
    Proton,
}

impl Species {
    /// Species of a charged final-state particle code; composites map to `None`.
    pub fn from_pdg(pdg: i32) -> Option<Self> {
        match pdg.abs() {
            code::ELECTRON => Some(Self::Electron),
            code::MUON => Some(Self::Muon),
            code::PION => Some(Self::Pion),
            code::KAON => Some(Self::Kaon),
            code::PROTON => Some(Self::Proton),
            _ => None,
        }
    }
}

/// One detector response attached to a track record.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PidMeasurement {
    pub detector: PidDetector,
    pub species: Species,
    pub n_sigma: f64,
}

/// Source of n-sigma values keyed by event track index.
pub trait PidResponse {
    fn n_sigma(&self, track: usize, detector: PidDetector, species: Species) -> Option<f64>;
}

/// Responder without any information.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPid;

impl PidResponse for NoPid {
    fn n_sigma(&self, _track: usize, _detector: PidDetector, _species: Species) -> Option<f64> {
        None
    }
}

/// In-memory table built from the measurements of an event.
#[derive(Debug, Clone, Default)]
pub struct PidTable {
    values: HashMap<(usize, PidDetector, Species), f64>,
}

impl PidTable {
    pub fn insert(&mut self, track: usize, m: &PidMeasurement) {
        self.values.insert((track, m.detector, m.species), m.n_sigma);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PidResponse for PidTable {
    fn n_sigma(&self, track: usize, detector: PidDetector, species: Species) -> Option<f64> {
        self.values.get(&(track, detector, species)).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PidStatus {
    Accepted,
    Rejected,
    NoInfo,
}

/// Validity window and threshold of one detector.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectorPid {
    pub enabled: bool,
    /// Lower edge of the track pT validity window [GeV].
    pub pt_min: f64,
    /// Upper edge (exclusive) of the track pT validity window [GeV].
    pub pt_max: f64,
    /// Maximum accepted `|n_sigma|`; values above 999 accept everything.
    pub n_sigma_max: f64,
}

impl Default for DetectorPid {
    fn default() -> Self {
        Self {
            enabled: true,
            pt_min: 0.15,
            pt_max: 10.0,
            n_sigma_max: 3.0,
        }
    }
}

impl DetectorPid {
    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.pt_min.is_nan() || self.pt_max.is_nan() || self.pt_min >= self.pt_max {
            return Err(ConfigError::InvalidPtRange {
                min: self.pt_min,
                max: self.pt_max,
            });
        }
        require_positive(field, self.n_sigma_max)
    }

    fn status(&self, n_sigma: Option<f64>, pt: f64) -> PidStatus {
        if !self.enabled || pt < self.pt_min || pt >= self.pt_max {
            return PidStatus::NoInfo;
        }
        if self.n_sigma_max > 999.0 {
            return PidStatus::Accepted;
        }
        match n_sigma {
            Some(ns) if ns.abs() < self.n_sigma_max => PidStatus::Accepted,
            Some(_) => PidStatus::Rejected,
            None => PidStatus::NoInfo,
        }
    }
}

/// Per-track PID combination over the available detectors.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub tpc: DetectorPid,
    pub tof: DetectorPid,
    pub rich: DetectorPid,
    /// Keep tracks for which no detector gave a usable response.
    pub accept_without_pid: bool,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            tpc: DetectorPid::default(),
            tof: DetectorPid {
                pt_max: 5.0,
                ..DetectorPid::default()
            },
            rich: DetectorPid {
                enabled: false,
                ..DetectorPid::default()
            },
            accept_without_pid: true,
        }
    }
}

impl PidConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tpc.validate("selection.pid.tpc.n_sigma_max")?;
        self.tof.validate("selection.pid.tof.n_sigma_max")?;
        self.rich.validate("selection.pid.rich.n_sigma_max")
    }

    /// Any rejecting detector rejects; otherwise any accepting detector
    /// accepts; otherwise there is no information.
    pub fn track_status(
        &self,
        pid: &dyn PidResponse,
        track: usize,
        pt: f64,
        species: Species,
    ) -> PidStatus {
        let detectors = [
            (PidDetector::Tpc, &self.tpc),
            (PidDetector::Tof, &self.tof),
            (PidDetector::Rich, &self.rich),
        ];
        let mut accepted = false;
        for (det, cfg) in detectors {
            match cfg.status(pid.n_sigma(track, det, species), pt) {
                PidStatus::Rejected => return PidStatus::Rejected,
                PidStatus::Accepted => accepted = true,
                PidStatus::NoInfo => {}
            }
        }
        if accepted {
            PidStatus::Accepted
        } else {
            PidStatus::NoInfo
        }
    }

    pub fn passes(&self, status: PidStatus) -> bool {
        match status {
            PidStatus::Accepted => true,
            PidStatus::Rejected => false,
            PidStatus::NoInfo => self.accept_without_pid,
        }
    }
}
