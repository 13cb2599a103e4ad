use crate::config::ConfigError;

/// Strictly increasing transverse-momentum bin edges.
///
/// Bin `i` covers `[edges[i], edges[i + 1])`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct PtBins {
    edges: Vec<f64>,
}

impl PtBins {
    pub fn new(edges: Vec<f64>) -> Result<Self, ConfigError> {
        if edges.len() < 2 {
            return Err(ConfigError::TooFewBinEdges { count: edges.len() });
        }
        if let Some(index) = edges.iter().position(|e| !e.is_finite()) {
            return Err(ConfigError::NonFiniteBinEdge { index });
        }
        if let Some(index) = edges.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ConfigError::NonIncreasingBins { index: index + 1 });
        }
        Ok(Self { edges })
    }

    /// Built-in binnings known to be valid.
    pub(crate) fn from_sorted(edges: &[f64]) -> Self {
        debug_assert!(edges.len() >= 2 && edges.windows(2).all(|w| w[0] < w[1]));
        Self {
            edges: edges.to_vec(),
        }
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Bin containing `pt`, or `None` outside `[first, last)`.
    pub fn find_bin(&self, pt: f64) -> Option<usize> {
        let first = *self.edges.first()?;
        let last = *self.edges.last()?;
        if pt.is_nan() || pt < first || pt >= last {
            return None;
        }
        // Number of edges <= pt, minus one.
        Some(self.edges.partition_point(|e| *e <= pt) - 1)
    }
}

impl TryFrom<Vec<f64>> for PtBins {
    type Error = ConfigError;

    fn try_from(edges: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(edges)
    }
}

impl From<PtBins> for Vec<f64> {
    fn from(bins: PtBins) -> Self {
        bins.edges
    }
}

/// Topological and kinematic thresholds of one pT bin.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TopologicalCuts {
    /// Maximum `|m - m_PDG|` [GeV].
    pub mass_window: f64,
    /// Minimum transverse momentum of every prong [GeV].
    pub daughter_pt_min: f64,
    /// Maximum `|d0_xy|` of every prong to the primary vertex [cm].
    pub dca_xy_max: f64,
    /// Maximum `|d0_z|` of every prong to the primary vertex [cm].
    pub dca_z_max: f64,
    /// Minimum cosine of the pointing angle.
    pub cpa_min: f64,
    /// Minimum cosine of the transverse pointing angle.
    pub cpa_xy_min: f64,
    /// Minimum decay length [cm].
    pub decay_length_min: f64,
    /// Minimum transverse decay length [cm].
    pub decay_length_xy_min: f64,
    /// Maximum product of the two prongs' transverse impact parameters
    /// [cm^2]; only applied to two-daughter candidates.
    pub impact_parameter_product_max: f64,
}

impl Default for TopologicalCuts {
    fn default() -> Self {
        Self {
            mass_window: 0.4,
            daughter_pt_min: 0.0,
            dca_xy_max: 10.0,
            dca_z_max: 10.0,
            cpa_min: -1.0,
            cpa_xy_min: -1.0,
            decay_length_min: 0.0,
            decay_length_xy_min: 0.0,
            impact_parameter_product_max: 1000.0,
        }
    }
}

impl TopologicalCuts {
    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("mass_window", self.mass_window),
            ("daughter_pt_min", self.daughter_pt_min),
            ("dca_xy_max", self.dca_xy_max),
            ("dca_z_max", self.dca_z_max),
            ("cpa_min", self.cpa_min),
            ("cpa_xy_min", self.cpa_xy_min),
            ("decay_length_min", self.decay_length_min),
            ("decay_length_xy_min", self.decay_length_xy_min),
            ("impact_parameter_product_max", self.impact_parameter_product_max),
        ];
        for (field, value) in fields {
            if value.is_nan() {
                return Err(ConfigError::NonFinite { field });
            }
        }
        if self.mass_window < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "mass_window",
                value: self.mass_window,
            });
        }
        Ok(())
    }
}

/// Cut rows indexed by pT bin.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CutTable {
    pub pt_bins: PtBins,
    pub cuts: Vec<TopologicalCuts>,
}

impl CutTable {
    pub fn new(pt_bins: PtBins, cuts: Vec<TopologicalCuts>) -> Result<Self, ConfigError> {
        let table = Self { pt_bins, cuts };
        table.validate()?;
        Ok(table)
    }

    /// Same thresholds in every bin.
    pub fn uniform(pt_bins: PtBins, cuts: TopologicalCuts) -> Self {
        let rows = vec![cuts; pt_bins.n_bins()];
        Self {
            pt_bins,
            cuts: rows,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cuts.len() != self.pt_bins.n_bins() {
            return Err(ConfigError::CutTableShape {
                bins: self.pt_bins.n_bins(),
                rows: self.cuts.len(),
            });
        }
        self.cuts.iter().try_for_each(TopologicalCuts::validate)
    }

    pub fn lookup(&self, pt: f64) -> Option<&TopologicalCuts> {
        self.cuts.get(self.pt_bins.find_bin(pt)?)
    }
}
