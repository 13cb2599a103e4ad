//! Reconstruction configuration and its validation.

use std::path::Path;

use crate::assembler::{CascadeConfig, PreselectionConfig};
use crate::fitter::FitterConfig;
use crate::selector::SelectionConfig;

/// Fatal configuration problems, surfaced before any event is processed.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// A numeric field is NaN or infinite.
    NonFinite { field: &'static str },
    /// A numeric field is outside its allowed range.
    OutOfRange { field: &'static str, value: f64 },
    ZeroIterationBudget,
    TooFewBinEdges { count: usize },
    NonFiniteBinEdge { index: usize },
    /// Edge `index` is not above its predecessor.
    NonIncreasingBins { index: usize },
    CutTableShape { bins: usize, rows: usize },
    InvalidPtRange { min: f64, max: f64 },
    /// The mass table has no entry for this particle code.
    UnknownParticle { pdg: i32 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read configuration: {e}"),
            Self::Parse(e) => write!(f, "cannot parse configuration: {e}"),
            Self::NonFinite { field } => write!(f, "{field} must be finite"),
            Self::OutOfRange { field, value } => write!(f, "{field} = {value} is out of range"),
            Self::ZeroIterationBudget => write!(f, "fitter.max_iterations must be positive"),
            Self::TooFewBinEdges { count } => {
                write!(f, "pT binning needs at least two edges, got {count}")
            }
            Self::NonFiniteBinEdge { index } => write!(f, "pT bin edge {index} is not finite"),
            Self::NonIncreasingBins { index } => {
                write!(f, "pT bin edge {index} does not exceed the previous edge")
            }
            Self::CutTableShape { bins, rows } => {
                write!(f, "cut table has {rows} rows for {bins} pT bins")
            }
            Self::InvalidPtRange { min, max } => {
                write!(f, "candidate pT range [{min}, {max}) is empty")
            }
            Self::UnknownParticle { pdg } => write!(f, "no mass for particle code {pdg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value <= 0.0 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}

/// Everything the reconstruction needs, resolved once before processing.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Vertex fitter settings shared by every stage.
    pub fitter: FitterConfig,
    /// Loose skim applied to 2- and 3-prong combinations.
    pub preselection: PreselectionConfig,
    /// Per-channel pT-binned selections and PID.
    pub selection: SelectionConfig,
    /// Composite + bachelor stages.
    pub cascades: CascadeConfig,
}

impl ReconstructionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fitter.validate()?;
        self.preselection.validate()?;
        self.selection.validate()?;
        self.cascades.validate()?;
        self.warn_unreachable_stages();
        Ok(())
    }

    /// Cascades fed by a disabled lower channel are valid but never fire.
    fn warn_unreachable_stages(&self) {
        let stages = [
            ("bplus", &self.cascades.bplus, self.selection.d0.enabled && self.preselection.d0.enabled),
            ("xicc", &self.cascades.xicc, self.selection.xic.enabled && self.preselection.xic.enabled),
        ];
        for (name, stage, lower_enabled) in stages {
            if stage.enabled && !lower_enabled {
                tracing::warn!("cascade stage {name} is enabled but its lower channel is disabled");
            }
        }
    }

    /// Load a (possibly partial) JSON configuration and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
