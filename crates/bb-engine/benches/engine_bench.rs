//! Benchmarks for the per-tick hot paths
//!
//! Run with: cargo bench --bench engine_bench -p bb-engine

use bb_engine::{
    LayerMixer, LayerScheduler, MusicSequencer, NoteTimeline, SchedulerConfig, TimelineConfig,
};
use bb_ir::{Clip, ClipBank, DspTime, EventNote, LayerDef, SegmentDef, SequenceDef, TempoConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn dense_chart(notes: usize) -> Vec<EventNote> {
    (0..notes).map(|i| EventNote::new(i % 3, i as f64 * 0.125)).collect()
}

fn bench_timeline_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_advance");

    for notes in [64, 512, 4096].iter() {
        let chart = dense_chart(*notes);
        group.bench_with_input(BenchmarkId::from_parameter(notes), notes, |b, _| {
            b.iter(|| {
                let mut timeline = NoteTimeline::new(TimelineConfig::default()).unwrap();
                timeline.load_segment_notes(&chart);
                let mut t = 0.0;
                while !timeline.is_complete() {
                    timeline.advance(black_box(t));
                    // Strike lane 0 on every tick
                    let _ = timeline.judge(0, t);
                    t += 1.0 / 60.0;
                }
                timeline.signals().drain().count()
            });
        });
    }

    group.finish();
}

fn bench_sequencer_tick(c: &mut Criterion) {
    let mut bank = ClipBank::new();
    let clip = bank.insert(Clip::new("loop", 48_000, vec![0.1; 48_000 * 4]));
    let mut segment = SegmentDef::new("Loop", TempoConfig::common(128.0).unwrap())
        .unwrap()
        .with_layer(LayerDef::new("Base", clip).unwrap().primary().looping(true));
    for i in 0..7 {
        let name = format!("Layer{i}");
        segment = segment.with_layer(LayerDef::new(&name, clip).unwrap().looping(true).with_volume(0.0));
    }
    let def = SequenceDef::new().with_segment(segment).then("Loop").unwrap();

    c.bench_function("sequencer_tick_render_800_frames", |b| {
        let mut mixer = LayerMixer::new(bank.clone(), 48_000);
        let mut scheduler = LayerScheduler::new(SchedulerConfig::default());
        let mut sequencer = MusicSequencer::new();
        sequencer.start(&def, DspTime::ZERO, &mut scheduler, &mut mixer).unwrap();

        b.iter(|| {
            let now = bb_engine::ClockSource::now(&mixer);
            sequencer.tick(now, &mut scheduler, &mut mixer);
            for _ in 0..800 {
                black_box(mixer.render_frame());
            }
        });
    });
}

criterion_group!(benches, bench_timeline_advance, bench_sequencer_tick);
criterion_main!(benches);
