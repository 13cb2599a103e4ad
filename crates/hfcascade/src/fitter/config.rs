use crate::config::{require_positive, ConfigError};

/// Configuration of the N-prong DCA vertex fitter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    /// Solenoid field along the beam axis [kG]. The sign is the polarity.
    pub bz: f64,
    /// Store the daughter tracks transported to the fitted vertex.
    pub propagate_to_pca: bool,
    /// Reject vertices with transverse radius above this value [cm].
    pub max_r: f64,
    /// Reject seeds whose pairwise track z separation exceeds this [cm].
    ///
    /// Non-positive disables the check.
    pub max_dz_ini: f64,
    /// Stop when every vertex coordinate moves less than this [cm].
    pub min_param_change: f64,
    /// Stop when `chi2 / chi2_previous` exceeds this ratio.
    pub min_rel_chi2_change: f64,
    /// Minimize unweighted distances instead of error-weighted ones.
    pub use_abs_dca: bool,
    /// Iteration budget per seed.
    pub max_iterations: usize,
    /// Reject solutions with chi2 above this value.
    pub max_chi2: f64,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            bz: 5.0,
            propagate_to_pca: true,
            max_r: 200.0,
            max_dz_ini: 4.0,
            min_param_change: 1e-3,
            min_rel_chi2_change: 0.9,
            use_abs_dca: true,
            max_iterations: 20,
            max_chi2: 100.0,
        }
    }
}

impl FitterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bz.is_finite() {
            return Err(ConfigError::NonFinite { field: "fitter.bz" });
        }
        if !self.max_dz_ini.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "fitter.max_dz_ini",
            });
        }
        require_positive("fitter.max_r", self.max_r)?;
        require_positive("fitter.min_param_change", self.min_param_change)?;
        require_positive("fitter.max_chi2", self.max_chi2)?;
        if self.min_rel_chi2_change.is_nan()
            || self.min_rel_chi2_change <= 0.0
            || self.min_rel_chi2_change > 1.0
        {
            return Err(ConfigError::OutOfRange {
                field: "fitter.min_rel_chi2_change",
                value: self.min_rel_chi2_change,
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterationBudget);
        }
        Ok(())
    }
}

