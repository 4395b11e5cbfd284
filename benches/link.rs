use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fsolink::channel::{ChannelModel, Weather};
use fsolink::modulation::{ModulationScheme, Modulator};
use fsolink::rng::SimRng;
use fsolink::tracking::BeamTracker;

fn bench_modulation(c: &mut Criterion) {
    let frame: Vec<u8> = (0..255).map(|i| i as u8).collect();

    let mut ook = Modulator::new(ModulationScheme::Ook, 1e6).unwrap();
    c.bench_function("ook_modulate_255B", |b| {
        b.iter(|| ook.modulate(black_box(&frame)).unwrap())
    });
    let ook_symbols = ook.modulate(&frame).unwrap();
    c.bench_function("ook_demodulate_255B", |b| {
        b.iter(|| ook.demodulate(black_box(&ook_symbols), 20.0).unwrap())
    });

    for order in [4usize, 16] {
        let mut ppm = Modulator::ppm(1e6, order).unwrap();
        let symbols = ppm.modulate(&frame).unwrap();
        c.bench_with_input(BenchmarkId::new("ppm_demodulate_255B", order), &order, |b, _| {
            b.iter(|| ppm.demodulate(black_box(&symbols), 20.0).unwrap())
        });
    }

    let mut dpsk = Modulator::new(ModulationScheme::Dpsk, 1e6).unwrap();
    c.bench_function("dpsk_modulate_255B", |b| {
        b.iter(|| dpsk.modulate(black_box(&frame)).unwrap())
    });
}

fn bench_channel(c: &mut Criterion) {
    let mut channel =
        ChannelModel::new(1000.0, 1550e-9, Weather::HighTurbulence, SimRng::new(1)).unwrap();

    c.bench_function("channel_apply_effects_uncorrelated", |b| {
        b.iter(|| channel.apply_effects(black_box(1e-3), 1e-12, 0.0).unwrap())
    });

    c.bench_function("channel_apply_effects_correlated", |b| {
        b.iter(|| channel.apply_effects(black_box(1e-3), 1e-12, 1e-4).unwrap())
    });
}

fn bench_tracking(c: &mut Criterion) {
    let beam = |az: f64, el: f64| (-(az * az + el * el) / (2.0 * 0.05 * 0.05)).exp();

    c.bench_function("tracker_update", |b| {
        let mut tracker = BeamTracker::new(0.05, 0.03, 41, 41, 0.5, 0.5).unwrap();
        tracker.scan(0.4, 0.4, 0.01, &mut |az, el| beam(az, el)).unwrap();
        b.iter(|| {
            let s = beam(tracker.azimuth(), tracker.elevation());
            tracker.update(black_box(s)).unwrap()
        })
    });

    c.bench_function("tracker_scan_41x41", |b| {
        let mut tracker = BeamTracker::new(0.0, 0.0, 41, 41, 0.5, 0.5).unwrap();
        b.iter(|| {
            tracker
                .scan(0.4, 0.4, 0.01, &mut |az, el| black_box(beam(az, el)))
                .unwrap()
        })
    });
}

criterion_group!(link_benches, bench_modulation, bench_channel, bench_tracking);
criterion_main!(link_benches);
