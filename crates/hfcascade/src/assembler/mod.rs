//! Combination loops of every reconstruction stage.
//!
//! Each stage enumerates charge-compatible combinations, fits their vertex,
//! builds the candidate with its observables and composite trajectory, tags
//! it with channel flags and keeps it only if at least one hypothesis passes
//! the selection. Failed fits and rejected candidates are counted, never
//! reported as errors.

mod cascade;
mod preselection;


pub use cascade::{CascadeConfig, CascadeStageConfig};
pub use preselection::{PreselectionConfig, ThreeProngSkim, TwoProngSkim};

use crate::candidate::{Candidate, Observables, Prong, ProngSet, SecondaryVertex};
use crate::composite::build_composite;
use crate::config::ReconstructionConfig;
use crate::decay::{ChannelMasses, DecayChannel, HfFlags, SelectionStatus};
use crate::fitter::{DcaFitter, FitterStats};
use crate::kinematics::sum_momenta;
use crate::pipeline::PrimaryVertex;
use crate::selector::{CandidateSelector, PidResponse};
use crate::track::{CascadeTrack, ImpactParameter, TrackError, TrackParCov, TrackRecord};

/// Largest accepted straight-line distance of a track to the primary
/// vertex when computing impact parameters [cm].
pub const DCA_MAX_DISTANCE: f64 = 999.0;

/// Raw or composite input with its impact parameter to the primary vertex.
#[derive(Debug, Clone)]
pub struct PreparedTrack {
    pub track: CascadeTrack,
    pub impact_parameter: ImpactParameter,
}

impl PreparedTrack {
    pub fn from_record(record: &TrackRecord, pv: &PrimaryVertex, bz: f64) -> Result<Self, TrackError> {
        let state = TrackParCov::from_record(record)?;
        Self::new(CascadeTrack::raw(record.global_index, state), pv, bz)
    }

    pub fn new(track: CascadeTrack, pv: &PrimaryVertex, bz: f64) -> Result<Self, TrackError> {
        let (_, impact_parameter) =
            track
                .state
                .propagate_to_dca(pv.position, &pv.covariance, bz, DCA_MAX_DISTANCE)?;
        Ok(Self {
            track,
            impact_parameter,
        })
    }

    pub fn charge(&self) -> i8 {
        self.track.charge
    }
}

/// Inputs shared by all stages of one event.
pub struct EventContext<'a> {
    pub collision_id: u64,
    pub primary_vertex: &'a PrimaryVertex,
    pub tracks: &'a [PreparedTrack],
    pub pid: &'a dyn PidResponse,
}

/// Combination bookkeeping of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StageStats {
    pub combinations: u64,
    pub charge_pruned: u64,
    pub fits_failed: u64,
    pub preselection_rejected: u64,
    pub selection_rejected: u64,
    pub accepted: u64,
}

impl StageStats {
    pub fn merge(&mut self, other: &StageStats) {
        self.combinations += other.combinations;
        self.charge_pruned += other.charge_pruned;
        self.fits_failed += other.fits_failed;
        self.preselection_rejected += other.preselection_rejected;
        self.selection_rejected += other.selection_rejected;
        self.accepted += other.accepted;
    }
}

#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    /// Accepted candidates with their selection status set.
    pub candidates: Vec<Candidate>,
    pub stats: StageStats,
}

/// Vertex, prongs and composite of one converged combination.
struct Fitted<const N: usize> {
    vertex: SecondaryVertex,
    momentum: [f64; 3],
    prongs: [Prong; N],
    track: CascadeTrack,
}

/// Stage driver owning one fitter per arity.
#[derive(Debug, Clone)]
pub struct CandidateAssembler {
    preselection: PreselectionConfig,
    cascades: CascadeConfig,
    selector: CandidateSelector,
    fitter2: DcaFitter<2>,
    fitter3: DcaFitter<3>,
}

impl CandidateAssembler {
    pub fn new(config: &ReconstructionConfig, masses: ChannelMasses) -> Self {
        Self {
            preselection: config.preselection.clone(),
            cascades: config.cascades.clone(),
            selector: CandidateSelector::new(config.selection.clone(), masses),
            fitter2: DcaFitter::new(config.fitter.clone()),
            fitter3: DcaFitter::new(config.fitter.clone()),
        }
    }

    pub fn bz(&self) -> f64 {
        self.fitter2.config().bz
    }

    pub fn selector(&self) -> &CandidateSelector {
        &self.selector
    }

    pub fn masses(&self) -> &ChannelMasses {
        self.selector.masses()
    }

    /// Counters of both fitters combined.
    pub fn fitter_stats(&self) -> FitterStats {
        let mut stats = self.fitter2.stats().clone();
        stats.merge(self.fitter3.stats());
        stats
    }

    /// Opposite-sign pairs ordered `(positive, negative)`.
    pub fn two_prong(&mut self, ctx: &EventContext<'_>) -> StageOutput {
        let mut out = StageOutput::default();
        let tracks = ctx.tracks;
        for i in 0..tracks.len() {
            for j in (i + 1)..tracks.len() {
                out.stats.combinations += 1;
                let (a, b) = (&tracks[i], &tracks[j]);
                if a.charge() * b.charge() >= 0 {
                    out.stats.charge_pruned += 1;
                    continue;
                }
                let (pos, neg) = if a.charge() > 0 { (a, b) } else { (b, a) };
                let bz = self.bz();
                let Some(fitted) = fit_vertex(&mut self.fitter2, bz, [pos, neg]) else {
                    out.stats.fits_failed += 1;
                    continue;
                };
                let prongs = ProngSet::TwoProng(fitted.prongs);
                self.preselect_and_select(ctx, fitted.vertex, fitted.momentum, prongs, fitted.track, &mut out);
            }
        }
        tracing::debug!(
            "2-prong: {} combinations, {} fits failed, {} accepted",
            out.stats.combinations,
            out.stats.fits_failed,
            out.stats.accepted
        );
        out
    }

    /// Triplets ordered `(q, -q, q)`; the two same-sign tracks appear in
    /// index order so every triplet is fitted once.
    pub fn three_prong(&mut self, ctx: &EventContext<'_>) -> StageOutput {
        let mut out = StageOutput::default();
        for q in [1i8, -1] {
            let same: Vec<&PreparedTrack> = ctx.tracks.iter().filter(|t| t.charge() == q).collect();
            let opposite: Vec<&PreparedTrack> =
                ctx.tracks.iter().filter(|t| t.charge() == -q).collect();
            for a in 0..same.len() {
                for c in (a + 1)..same.len() {
                    for b in &opposite {
                        out.stats.combinations += 1;
                        let bz = self.bz();
                        let Some(fitted) = fit_vertex(&mut self.fitter3, bz, [same[a], *b, same[c]])
                        else {
                            out.stats.fits_failed += 1;
                            continue;
                        };
                        let prongs = ProngSet::ThreeProng(fitted.prongs);
                        self.preselect_and_select(
                            ctx,
                            fitted.vertex,
                            fitted.momentum,
                            prongs,
                            fitted.track,
                            &mut out,
                        );
                    }
                }
            }
        }
        tracing::debug!(
            "3-prong: {} combinations, {} fits failed, {} accepted",
            out.stats.combinations,
            out.stats.fits_failed,
            out.stats.accepted
        );
        out
    }

    /// Selected lower-stage candidates combined with one bachelor track.
    ///
    /// Bachelors already used inside the lower-stage candidate are skipped.
    pub fn cascade(
        &mut self,
        channel: DecayChannel,
        lower: &[Candidate],
        ctx: &EventContext<'_>,
    ) -> StageOutput {
        let mut out = StageOutput::default();
        let Some(stage) = self.cascades.stage(channel).cloned() else {
            return out;
        };
        if !stage.enabled {
            return out;
        }
        let bz = self.bz();
        for cand in lower {
            let charges = cascade::bachelor_charges(channel, &stage, cand, self.masses());
            if charges.is_empty() {
                continue;
            }
            let composite = match PreparedTrack::new(cand.track.clone(), ctx.primary_vertex, bz) {
                Ok(c) => c,
                Err(e) => {
                    tracing::trace!("{channel}: composite not usable: {e}");
                    out.stats.fits_failed += 1;
                    continue;
                }
            };
            for bachelor in ctx.tracks {
                if bachelor
                    .track
                    .raw_index()
                    .is_some_and(|i| cand.track.uses_track(i))
                {
                    continue;
                }
                out.stats.combinations += 1;
                if !charges.contains(&bachelor.charge()) {
                    out.stats.charge_pruned += 1;
                    continue;
                }
                let Some(fitted) = fit_vertex(&mut self.fitter2, bz, [&composite, bachelor]) else {
                    out.stats.fits_failed += 1;
                    continue;
                };
                let prongs = ProngSet::Cascade(fitted.prongs);
                let observables =
                    Observables::compute(ctx.primary_vertex, &fitted.vertex, fitted.momentum, prongs.as_slice());
                if observables.pt < stage.pt_min {
                    out.stats.preselection_rejected += 1;
                    continue;
                }
                let candidate = Candidate {
                    collision_id: ctx.collision_id,
                    flags: [channel].into_iter().collect(),
                    status: SelectionStatus::default(),
                    vertex: fitted.vertex,
                    momentum: fitted.momentum,
                    prongs,
                    observables,
                    track: fitted.track,
                };
                self.select_into(ctx, candidate, &mut out);
            }
        }
        tracing::debug!(
            "{channel}: {} combinations, {} fits failed, {} accepted",
            out.stats.combinations,
            out.stats.fits_failed,
            out.stats.accepted
        );
        out
    }

    fn preselect_and_select(
        &self,
        ctx: &EventContext<'_>,
        vertex: SecondaryVertex,
        momentum: [f64; 3],
        prongs: ProngSet,
        track: CascadeTrack,
        out: &mut StageOutput,
    ) {
        let observables = Observables::compute(ctx.primary_vertex, &vertex, momentum, prongs.as_slice());
        let flags: HfFlags = self.preselection.flags(&prongs, &observables, self.masses());
        if flags.is_empty() {
            out.stats.preselection_rejected += 1;
            return;
        }
        let candidate = Candidate {
            collision_id: ctx.collision_id,
            flags,
            status: SelectionStatus::default(),
            vertex,
            momentum,
            prongs,
            observables,
            track,
        };
        self.select_into(ctx, candidate, out);
    }

    fn select_into(&self, ctx: &EventContext<'_>, mut candidate: Candidate, out: &mut StageOutput) {
        let status = self.selector.select(&candidate, ctx.pid);
        if status.is_empty() {
            out.stats.selection_rejected += 1;
            return;
        }
        candidate.status = status;
        out.stats.accepted += 1;
        out.candidates.push(candidate);
    }
}

fn fit_vertex<const N: usize>(
    fitter: &mut DcaFitter<N>,
    bz: f64,
    inputs: [&PreparedTrack; N],
) -> Option<Fitted<N>> {
    let states: [TrackParCov; N] = std::array::from_fn(|i| inputs[i].track.state);
    let solution = fitter.process(&states).into_best()?;
    let at_vertex = solution.daughters_at_vertex(bz).ok()?;
    let daughters: [CascadeTrack; N] = std::array::from_fn(|i| inputs[i].track.clone());
    let track = match build_composite(&solution, &at_vertex, &daughters) {
        Ok(t) => t,
        Err(e) => {
            tracing::trace!("{N}-prong composite rejected: {e}");
            return None;
        }
    };
    let momenta: [[f64; 3]; N] = std::array::from_fn(|i| at_vertex[i].pxpypz_glo());
    let prongs: [Prong; N] = std::array::from_fn(|i| Prong {
        track: daughters[i].clone(),
        momentum: momenta[i],
        impact_parameter: inputs[i].impact_parameter,
    });
    Some(Fitted {
        vertex: SecondaryVertex {
            position: solution.position,
            covariance: solution.covariance,
            chi2: solution.chi2,
        },
        momentum: sum_momenta(&momenta),
        prongs,
        track,
    })
}
