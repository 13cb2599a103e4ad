//! Per-event reconstruction: 2-prong -> B+, 3-prong -> Xicc.

mod event;


pub use event::{Event, PrimaryVertex};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::assembler::{CandidateAssembler, EventContext, PreparedTrack, StageStats};
use crate::candidate::{Candidate, CandidateRow};
use crate::config::{ConfigError, ReconstructionConfig};
use crate::decay::{ChannelMasses, DecayChannel};
use crate::fitter::FitterStats;
use crate::pdg::MassLookup;
use crate::selector::PidResponse;

/// Combination counters of every stage of one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EventStats {
    /// Track records that could not be turned into usable states.
    pub tracks_rejected: u64,
    pub two_prong: StageStats,
    pub three_prong: StageStats,
    pub bplus: StageStats,
    pub xicc: StageStats,
}

impl EventStats {
    pub fn merge(&mut self, other: &EventStats) {
        self.tracks_rejected += other.tracks_rejected;
        self.two_prong.merge(&other.two_prong);
        self.three_prong.merge(&other.three_prong);
        self.bplus.merge(&other.bplus);
        self.xicc.merge(&other.xicc);
    }
}

#[derive(Debug, Clone)]
pub struct EventOutput {
    pub collision_id: u64,
    pub primary_vertex: PrimaryVertex,
    /// Accepted candidates of every stage, lower stages first.
    pub candidates: Vec<Candidate>,
    pub stats: EventStats,
}

impl EventOutput {
    pub fn rows(&self, masses: &ChannelMasses) -> Vec<CandidateRow> {
        self.candidates
            .iter()
            .flat_map(|c| c.to_rows(&self.primary_vertex, masses))
            .collect()
    }
}

/// Runs every stage on one event. Owns private fitters, so give each
/// worker thread its own clone.
#[derive(Debug, Clone)]
pub struct EventReconstructor {
    assembler: CandidateAssembler,
}

impl EventReconstructor {
    /// Validate `config` and resolve the channel masses once.
    pub fn new(config: &ReconstructionConfig, masses: &dyn MassLookup) -> Result<Self, ConfigError> {
        config.validate()?;
        let masses = ChannelMasses::resolve(masses)?;
        Ok(Self {
            assembler: CandidateAssembler::new(config, masses),
        })
    }

    pub fn masses(&self) -> &ChannelMasses {
        self.assembler.masses()
    }

    pub fn fitter_stats(&self) -> FitterStats {
        self.assembler.fitter_stats()
    }

    /// Reconstruct with the PID responses carried by the track records.
    pub fn process(&mut self, event: &Event) -> EventOutput {
        let pid = event.pid_table();
        self.process_with_pid(event, &pid)
    }

    pub fn process_with_pid(&mut self, event: &Event, pid: &dyn PidResponse) -> EventOutput {
        let bz = self.assembler.bz();
        let pv = &event.primary_vertex;
        let mut stats = EventStats::default();

        let mut tracks = Vec::with_capacity(event.tracks.len());
        for record in &event.tracks {
            match PreparedTrack::from_record(record, pv, bz) {
                Ok(t) => tracks.push(t),
                Err(e) => {
                    tracing::debug!("track {} skipped: {e}", record.global_index);
                    stats.tracks_rejected += 1;
                }
            }
        }

        let ctx = EventContext {
            collision_id: event.collision_id,
            primary_vertex: pv,
            tracks: &tracks,
            pid,
        };

        let two = self.assembler.two_prong(&ctx);
        let bplus = self
            .assembler
            .cascade(DecayChannel::BPlusToD0Pi, &two.candidates, &ctx);
        let three = self.assembler.three_prong(&ctx);
        let xicc = self
            .assembler
            .cascade(DecayChannel::XiccToXicPi, &three.candidates, &ctx);

        stats.two_prong = two.stats;
        stats.bplus = bplus.stats;
        stats.three_prong = three.stats;
        stats.xicc = xicc.stats;

        let mut candidates = two.candidates;
        candidates.extend(three.candidates);
        candidates.extend(bplus.candidates);
        candidates.extend(xicc.candidates);

        tracing::info!(
            "collision {}: {} tracks, {} candidates ({} 2-prong, {} 3-prong, {} B+, {} Xicc)",
            event.collision_id,
            tracks.len(),
            candidates.len(),
            stats.two_prong.accepted,
            stats.three_prong.accepted,
            stats.bplus.accepted,
            stats.xicc.accepted
        );

        EventOutput {
            collision_id: event.collision_id,
            primary_vertex: *pv,
            candidates,
            stats,
        }
    }
}

/// Reconstruct independent events; output order follows input order.
#[cfg(feature = "parallel")]
pub fn reconstruct_events(
    events: &[Event],
    config: &ReconstructionConfig,
    masses: &dyn MassLookup,
) -> Result<Vec<EventOutput>, ConfigError> {
    let prototype = EventReconstructor::new(config, masses)?;
    Ok(events
        .par_iter()
        .map_init(|| prototype.clone(), |reco, event| reco.process(event))
        .collect())
}

/// Reconstruct independent events; output order follows input order.
#[cfg(not(feature = "parallel"))]
pub fn reconstruct_events(
    events: &[Event],
    config: &ReconstructionConfig,
    masses: &dyn MassLookup,
) -> Result<Vec<EventOutput>, ConfigError> {
    let mut reco = EventReconstructor::new(config, masses)?;
    Ok(events.iter().map(|event| reco.process(event)).collect())
}
