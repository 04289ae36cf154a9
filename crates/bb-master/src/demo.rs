//! A built-in three-segment sequence with synthesized clips.
//!
//! Intro (2 measures) hands off to Main (4 measures, with a miss layer and
//! a peak layer) and then to Outro, all at 120 BPM in 4/4.

use std::f64::consts::TAU;

use bb_chart::{parse_document, resolve, ChartError, LoadedSequence};
use bb_ir::{Clip, ClipBank};

pub const DEMO_DOCUMENT: &str = r#"{
  "segments": [
    {
      "name": "Intro",
      "bpm": 120,
      "layers": [{ "name": "Base", "clip": "intro_pad", "primary": true }],
      "chart": [
        { "lane": 0, "measure": 1, "position": 0 },
        { "lane": 1, "measure": 1, "position": 1 },
        { "lane": 2, "measure": 1, "position": 2 },
        { "lane": 1, "measure": 1, "position": 3 }
      ]
    },
    {
      "name": "Main",
      "bpm": 120,
      "layers": [
        { "name": "Base", "clip": "main_bass", "primary": true },
        { "name": "Layer1", "clip": "main_drums" },
        { "name": "Layer2", "clip": "main_lead", "volume": 0.0 }
      ],
      "chart": [
        { "lane": 0, "measure": 0, "position": 0 },
        { "lane": 1, "measure": 0, "position": 1 },
        { "lane": 2, "measure": 0, "position": 2 },
        { "lane": 1, "measure": 0, "position": 3 },
        { "lane": 0, "measure": 1, "position": 0 },
        { "lane": 1, "measure": 1, "position": 1 },
        { "lane": 2, "measure": 1, "position": 2 },
        { "lane": 1, "measure": 1, "position": 3 },
        { "lane": 0, "measure": 2, "position": 0 },
        { "lane": 2, "measure": 2, "position": 2, "length": "eighth" },
        { "lane": 1, "measure": 2, "position": 1 },
        { "lane": 0, "measure": 2, "position": 3 },
        { "lane": 2, "measure": 3, "position": 0 },
        { "lane": 1, "measure": 3, "position": 1 },
        { "lane": 0, "measure": 3, "position": 2 },
        { "lane": 2, "measure": 3, "position": 3 }
      ]
    },
    {
      "name": "Outro",
      "bpm": 120,
      "layering": false,
      "layers": [{ "name": "Base", "clip": "outro_pad", "primary": true }],
      "chart": [
        { "lane": 1, "measure": 0, "position": 0, "length": "half" },
        { "lane": 1, "measure": 0, "position": 1, "length": "half" }
      ]
    }
  ],
  "order": ["Intro", "Main", "Outro"]
}"#;

/// Notes across all demo charts.
pub const DEMO_NOTES: usize = 22;

const BEAT: f64 = 0.5;

/// Synthesize the demo's clips at `sample_rate`.
pub fn demo_bank(sample_rate: u32) -> ClipBank {
    let mut bank = ClipBank::new();
    bank.insert(synth("intro_pad", sample_rate, 4.0, |t| pad(&[220.0, 277.18, 329.63], t, 4.0)));
    bank.insert(synth("main_bass", sample_rate, 8.0, bass));
    bank.insert(synth("main_drums", sample_rate, 8.0, kick));
    bank.insert(synth("main_lead", sample_rate, 8.0, lead));
    bank.insert(synth("outro_pad", sample_rate, 4.0, |t| pad(&[196.0, 246.94, 293.66], t, 4.0)));
    bank
}

/// Resolve the demo document against a bank from `demo_bank`.
pub fn demo_sequence(bank: &ClipBank) -> Result<LoadedSequence, ChartError> {
    resolve(&parse_document(DEMO_DOCUMENT)?, bank)
}

fn synth(name: &str, sample_rate: u32, seconds: f64, f: impl Fn(f64) -> f64) -> Clip {
    let len = (seconds * sample_rate as f64).round() as usize;
    let data = (0..len).map(|i| f(i as f64 / sample_rate as f64) as f32).collect();
    Clip::new(name, sample_rate, data)
}

fn pad(freqs: &[f64], t: f64, length: f64) -> f64 {
    let envelope = (t / 0.05).min(1.0) * ((length - t) / 0.2).clamp(0.0, 1.0);
    let sum: f64 = freqs.iter().map(|f| (TAU * f * t).sin()).sum();
    0.12 * envelope * sum
}

fn bass(t: f64) -> f64 {
    let phase = t % BEAT;
    0.35 * (TAU * 55.0 * t).sin() * (-phase * 6.0).exp()
}

fn kick(t: f64) -> f64 {
    let phase = t % BEAT;
    let sweep = 50.0 + 100.0 * (-phase * 30.0).exp();
    0.5 * (TAU * sweep * phase).sin() * (-phase * 12.0).exp()
}

fn lead(t: f64) -> f64 {
    const NOTES: [f64; 4] = [440.0, 554.37, 659.25, 880.0];
    let step = (t / (BEAT / 2.0)) as usize % NOTES.len();
    let phase = t % (BEAT / 2.0);
    0.1 * (TAU * NOTES[step] * t).sin().signum() * (-phase * 8.0).exp()
}
