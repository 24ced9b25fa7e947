use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wator_core::{partition_planet, Cell, CellState, Counts, Params, Planet};

fn seeded_planet(nrow: usize, ncol: usize, seed: u64) -> Planet {
    let planet = Planet::new(nrow, ncol).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    for row in 0..nrow {
        for col in 0..ncol {
            let kind = match rand::Rng::gen_range(&mut rng, 0..10) {
                0..=2 => Cell::Fish,
                3 => Cell::Shark,
                _ => Cell::Water,
            };
            planet.set(
                row,
                col,
                CellState {
                    kind,
                    btime: 0,
                    dtime: 0,
                },
            );
        }
    }
    planet
}

fn chronon_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("chronon");
    for &workers in &[1usize, 2, 4, 8] {
        let planet = seeded_planet(200, 200, 42);
        let batches = partition_planet(planet.nrow(), planet.ncol(), workers).unwrap();
        let skip_map = wator_core::SkipMap::new(planet.nrow(), planet.ncol());
        let counts = Counts::new(planet.fish_count() as i64, planet.shark_count() as i64);
        let params = Params {
            sd: 5,
            sb: 5,
            fb: 5,
            chron_interval: 1,
            chron_delay_us: 0,
            total_workers: workers,
        };
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| {
                skip_map.reset();
                let mut rng = StdRng::seed_from_u64(7);
                for rect in &batches.batch1 {
                    wator_core::rect::sweep(&planet, &skip_map, &counts, &params, rect, &mut rng);
                }
                for rect in &batches.batch2 {
                    wator_core::rect::sweep(&planet, &skip_map, &counts, &params, rect, &mut rng);
                }
                wator_core::rect::sweep(&planet, &skip_map, &counts, &params, &batches.batch3, &mut rng);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, chronon_throughput);
criterion_main!(benches);
