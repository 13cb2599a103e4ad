use super::TrackParCov;

/// A track-like input to a vertex fit together with its provenance.
///
/// Raw tracks point back to the event's track list; composites own the
/// daughters they were built from, so any decay tree can be flattened back
/// to the set of raw track indices it consumes.
#[derive(Debug, Clone)]
pub struct CascadeTrack {
    pub state: TrackParCov,
    /// Physical charge (sum of daughter charges for composites).
    pub charge: i8,
    pub origin: TrackOrigin,
}

#[derive(Debug, Clone)]
pub enum TrackOrigin {
    Raw { index: usize },
    Composite(Box<CompositeOrigin>),
}

/// Secondary vertex and daughters of a composite trajectory.
#[derive(Debug, Clone)]
pub struct CompositeOrigin {
    pub vertex: [f64; 3],
    /// Packed `[xx, xy, yy, xz, yz, zz]`.
    pub vertex_cov: [f64; 6],
    pub chi2: f64,
    pub daughters: Vec<CascadeTrack>,
}

impl CascadeTrack {
    pub fn raw(index: usize, state: TrackParCov) -> Self {
        Self {
            charge: state.charge(),
            state,
            origin: TrackOrigin::Raw { index },
        }
    }

    /// Raw track index when this is not a composite.
    pub fn raw_index(&self) -> Option<usize> {
        match self.origin {
            TrackOrigin::Raw { index } => Some(index),
            TrackOrigin::Composite(_) => None,
        }
    }

    /// All raw track indices reachable through the decay tree.
    pub fn track_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_indices(&mut out);
        out
    }

    fn collect_indices(&self, out: &mut Vec<usize>) {
        match &self.origin {
            TrackOrigin::Raw { index } => out.push(*index),
            TrackOrigin::Composite(c) => {
                for d in &c.daughters {
                    d.collect_indices(out);
                }
            }
        }
    }

    pub fn uses_track(&self, index: usize) -> bool {
        match &self.origin {
            TrackOrigin::Raw { index: i } => *i == index,
            TrackOrigin::Composite(c) => c.daughters.iter().any(|d| d.uses_track(index)),
        }
    }

    /// Number of composite levels below this node (raw tracks have depth 0).
    pub fn depth(&self) -> usize {
        match &self.origin {
            TrackOrigin::Raw { .. } => 0,
            TrackOrigin::Composite(c) => {
                1 + c.daughters.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }
}
