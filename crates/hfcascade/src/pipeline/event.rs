use crate::selector::PidTable;
use crate::track::TrackRecord;

/// Collision vertex the candidates are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PrimaryVertex {
    pub position: [f64; 3],
    /// Packed `[xx, xy, yy, xz, yz, zz]`; zero when not provided.
    #[serde(default)]
    pub covariance: [f64; 6],
}

/// Tracks sharing one collision vertex.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub collision_id: u64,
    pub primary_vertex: PrimaryVertex,
    pub tracks: Vec<TrackRecord>,
}

impl Event {
    /// PID responses attached to the track records, keyed by global index.
    pub fn pid_table(&self) -> PidTable {
        let mut table = PidTable::default();
        for record in &self.tracks {
            for m in &record.pid {
                table.insert(record.global_index, m);
            }
        }
        table
    }
}
