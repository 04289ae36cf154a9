//! Integration tests for loading sequence documents and clips from disk.

use bb_chart::{load_sequence_file, ChartError};
use bb_ir::ClipBank;
use std::fs;
use std::path::{Path, PathBuf};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bb-chart-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// 16-bit mono PCM of `samples`.
fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
    let data_size = samples.len() as u32 * 2;
    let mut buf = Vec::new();
    buf.extend(b"RIFF");
    buf.extend(&(36 + data_size).to_le_bytes());
    buf.extend(b"WAVE");
    buf.extend(b"fmt ");
    buf.extend(&16u32.to_le_bytes());
    buf.extend(&1u16.to_le_bytes());
    buf.extend(&1u16.to_le_bytes());
    buf.extend(&sample_rate.to_le_bytes());
    buf.extend(&(sample_rate * 2).to_le_bytes());
    buf.extend(&2u16.to_le_bytes());
    buf.extend(&16u16.to_le_bytes());
    buf.extend(b"data");
    buf.extend(&data_size.to_le_bytes());
    for s in samples {
        buf.extend(&s.to_le_bytes());
    }
    fs::write(path, buf).unwrap();
}

const DOC: &str = r#"{
    "clips": [
        { "name": "verse", "path": "clips/verse.wav" },
        { "name": "hats", "path": "clips/hats.wav" }
    ],
    "segments": [{
        "name": "Verse",
        "bpm": 90,
        "time_signature": [6, 8],
        "layers": [
            { "name": "Base", "clip": "verse", "primary": true, "looping": true },
            { "name": "Hats", "clip": "hats", "volume": 0.5, "looping": true }
        ],
        "chart": [
            { "lane": 0, "measure": 0, "position": 1, "length": "eighth" },
            { "lane": 2, "measure": 1, "position": 0, "length": "quarter" }
        ]
    }],
    "order": ["Verse", "Verse"]
}"#;

#[test]
fn loads_clips_relative_to_the_document() {
    let dir = scratch_dir("load");
    fs::create_dir_all(dir.join("clips")).unwrap();
    write_wav(&dir.join("clips/verse.wav"), 1000, &[0; 4000]);
    write_wav(&dir.join("clips/hats.wav"), 1000, &[16384; 1000]);
    let path = dir.join("song.json");
    fs::write(&path, DOC).unwrap();

    let mut bank = ClipBank::new();
    let loaded = load_sequence_file(&path, &mut bank).unwrap();
    assert_eq!(bank.len(), 2);
    let hats = bank.find("hats").unwrap();
    assert_eq!(bank.get(hats).unwrap().data[0], 0.5);
    assert_eq!(bank.duration(bank.find("verse").unwrap()), Some(4.0));

    let sequence = loaded.sequence.resolve().unwrap();
    assert_eq!(sequence.len(), 2);
    let verse = sequence.get(0).unwrap();
    assert_eq!(verse.tempo.beats_per_measure(), 6);
    assert_eq!(verse.layers[1].base_volume, 0.5);

    // 6/8 at 90 BPM: eighth-note beats of 2/3 s, six per measure
    let chart = loaded.chart("Verse").unwrap();
    assert!((chart[0].time_stamp - 2.0 / 3.0).abs() < 1e-9);
    assert!((chart[1].time_stamp - 4.0).abs() < 1e-9);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_clip_file_names_the_path() {
    let dir = scratch_dir("missing");
    let path = dir.join("song.json");
    fs::write(&path, DOC).unwrap();

    let err = load_sequence_file(&path, &mut ClipBank::new()).unwrap_err();
    let ChartError::Io { path: missing, .. } = err else {
        panic!("expected an I/O error, got {:?}", err);
    };
    assert!(missing.ends_with("verse.wav"), "{}", missing);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_document() {
    let err = load_sequence_file(Path::new("/nonexistent/song.json"), &mut ClipBank::new());
    assert!(matches!(err, Err(ChartError::Io { .. })));
}
