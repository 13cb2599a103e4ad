//! hfcascade: cascading secondary-vertex reconstruction of heavy-flavour
//! decays from charged-particle tracks.
//!
//! The stages are:
//!
//! 1. **Track** – helix state with covariance, exact propagation, rotation
//!    and impact parameters.
//! 2. **Fitter** – N-prong DCA vertex fitter (Gauss-Newton on the distances
//!    of closest approach).
//! 3. **Composite** – neutral trajectory built from a fitted vertex, usable
//!    as an input of the next fit.
//! 4. **Assembler** – 2-prong, 3-prong and composite + bachelor combination
//!    loops with preselection.
//! 5. **Selector** – pT-binned topological cuts and PID.
//! 6. **Pipeline** – per-event driver and parallel batch processing.
//!
//! # Public API
//! - [`EventReconstructor`] and [`reconstruct_events`] as entry points
//! - [`ReconstructionConfig`] for tuning
//! - [`DcaFitter`], [`TrackParCov`] and [`build_composite`] for direct use
//!   of the vertexing core

pub mod assembler;
mod candidate;
mod composite;
mod config;
mod decay;
pub mod fitter;
pub mod kinematics;
pub mod pdg;
mod pipeline;
pub mod selector;
pub mod track;

#[cfg(test)]
pub(crate) mod test_utils;

pub use candidate::{
    Candidate, CandidateRow, HypothesisRow, Observables, Prong, ProngSet, SecondaryVertex,
};
pub use composite::build_composite;
pub use config::{ConfigError, ReconstructionConfig};
pub use decay::{
    ChannelMasses, DecayChannel, HfFlags, Hypothesis, SelectionStatus, Topology, MAX_HYPOTHESES,
};
pub use fitter::{DcaFitter, FitRejection, FitterConfig, VertexFit, VertexSolution};
pub use pdg::{MassLookup, PdgTable};
pub use pipeline::{
    reconstruct_events, Event, EventOutput, EventReconstructor, EventStats, PrimaryVertex,
};
pub use track::{CascadeTrack, ImpactParameter, TrackError, TrackParCov, TrackRecord};
