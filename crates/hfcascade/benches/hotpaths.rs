use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hfcascade::{
    DcaFitter, Event, EventReconstructor, FitterConfig, PdgTable, PrimaryVertex,
    ReconstructionConfig, TrackParCov, TrackRecord,
};

const BZ: f64 = 5.0;

fn diag_cov21() -> [f64; 21] {
    let mut cov = [0.0; 21];
    for i in 0..6 {
        cov[i * (i + 1) / 2 + i] = 1e-4;
    }
    cov
}

fn random_track(rng: &mut StdRng, vertex: [f64; 3], charge: i8) -> TrackParCov {
    let pt = rng.gen_range(0.3..4.0);
    let phi = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
    let tgl: f64 = rng.gen_range(-0.8..0.8);
    let p = [pt * phi.cos(), pt * phi.sin(), pt * tgl];
    TrackParCov::from_global(vertex, p, &diag_cov21(), charge).expect("valid bench track")
}

fn random_vertex(rng: &mut StdRng) -> [f64; 3] {
    [
        rng.gen_range(-0.1..0.1),
        rng.gen_range(-0.1..0.1),
        rng.gen_range(-1.0..1.0),
    ]
}

/// Event with `n` tracks from a handful of displaced vertices.
fn random_event(rng: &mut StdRng, collision_id: u64, n: usize) -> Event {
    let vertices: Vec<[f64; 3]> = (0..4).map(|_| random_vertex(rng)).collect();
    let tracks: Vec<TrackRecord> = (0..n)
        .map(|i| {
            let vertex = vertices[i % vertices.len()];
            let charge = if rng.gen_bool(0.5) { 1 } else { -1 };
            random_track(rng, vertex, charge).to_record(i)
        })
        .collect();
    Event {
        collision_id,
        primary_vertex: PrimaryVertex::default(),
        tracks,
    }
}

fn bench_two_prong_fit(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let pairs: Vec<[TrackParCov; 2]> = (0..64)
        .map(|_| {
            let v = random_vertex(&mut rng);
            [random_track(&mut rng, v, 1), random_track(&mut rng, v, -1)]
        })
        .collect();
    let mut fitter = DcaFitter::<2>::new(FitterConfig {
        bz: BZ,
        ..FitterConfig::default()
    });

    c.bench_function("dca_fit_2prong_x64", |b| {
        b.iter(|| {
            for pair in &pairs {
                black_box(fitter.process(black_box(pair)).into_best());
            }
        })
    });
}

fn bench_three_prong_fit(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let triplets: Vec<[TrackParCov; 3]> = (0..64)
        .map(|_| {
            let v = random_vertex(&mut rng);
            [
                random_track(&mut rng, v, 1),
                random_track(&mut rng, v, -1),
                random_track(&mut rng, v, 1),
            ]
        })
        .collect();
    let mut fitter = DcaFitter::<3>::new(FitterConfig::default());

    c.bench_function("dca_fit_3prong_x64", |b| {
        b.iter(|| {
            for triplet in &triplets {
                black_box(fitter.process(black_box(triplet)).into_best());
            }
        })
    });
}

fn bench_event(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let event = random_event(&mut rng, 0, 24);
    let mut reco = EventReconstructor::new(&ReconstructionConfig::default(), &PdgTable::default())
        .expect("default config");

    c.bench_function("event_24_tracks", |b| {
        b.iter(|| black_box(reco.process(black_box(&event))))
    });
}

criterion_group!(benches, bench_two_prong_fit, bench_three_prong_fit, bench_event);
criterion_main!(benches);
