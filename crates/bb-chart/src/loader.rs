//! Resolve documents into validated sequence definitions.

use std::collections::BTreeMap;
use std::path::Path;

use bb_ir::{
    convert_chart, ClipBank, EventNote, LayerDef, NoteDefinition, SegmentDef, SequenceDef,
    TempoConfig, TimeSignature,
};
use log::{debug, info};

use crate::document::{SegmentDocument, SequenceDocument};
use crate::wav_format::load_wav;
use crate::ChartError;

/// A sequence ready to play, with each segment's chart converted to note
/// times.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedSequence {
    pub sequence: SequenceDef,
    /// Note events keyed by segment name; segments without a chart have no
    /// entry
    pub charts: BTreeMap<String, Vec<EventNote>>,
}

impl LoadedSequence {
    pub fn chart(&self, segment: &str) -> Option<&[EventNote]> {
        self.charts.get(segment).map(Vec::as_slice)
    }
}

/// Parse a JSON document.
pub fn parse_document(json: &str) -> Result<SequenceDocument, ChartError> {
    Ok(serde_json::from_str(json)?)
}

/// Resolve a document against clips already in `bank`.
///
/// Every segment is validated and the play order resolved, so a sequence
/// returned from here will start.
pub fn resolve(doc: &SequenceDocument, bank: &ClipBank) -> Result<LoadedSequence, ChartError> {
    let mut sequence = SequenceDef::new();
    let mut charts = BTreeMap::new();

    for segment in &doc.segments {
        let (def, notes) = resolve_segment(segment, bank)?;
        if !notes.is_empty() {
            debug!("segment '{}': {} chart notes", segment.name, notes.len());
            charts.insert(segment.name.clone(), notes);
        }
        sequence = sequence.with_segment(def);
    }
    for entry in &doc.order {
        sequence = sequence.then(entry)?;
    }
    sequence.resolve()?;

    Ok(LoadedSequence { sequence, charts })
}

fn resolve_segment(
    doc: &SegmentDocument,
    bank: &ClipBank,
) -> Result<(SegmentDef, Vec<EventNote>), ChartError> {
    let [numerator, denominator] = doc.time_signature;
    let tempo = TempoConfig::new(doc.bpm, TimeSignature::new(numerator, denominator)?)?;

    let mut segment = SegmentDef::new(&doc.name, tempo)?.with_layering(doc.layering);
    for layer in &doc.layers {
        let mut def = LayerDef::new(&layer.name, bank.resolve(&layer.clip)?)?
            .with_volume(layer.volume)
            .looping(layer.looping);
        if layer.primary {
            def = def.primary();
        }
        segment = segment.with_layer(def);
    }

    let chart: Vec<NoteDefinition> = doc
        .chart
        .iter()
        .map(|n| NoteDefinition {
            lane: n.lane,
            measure: n.measure,
            position: n.position,
            length: n.length.into(),
        })
        .collect();
    let notes = convert_chart(&tempo, &chart)?;
    Ok((segment, notes))
}

/// Load clips named by the document into `bank`, reading paths relative
/// to `base`.
pub fn load_clips(
    doc: &SequenceDocument,
    base: &Path,
    bank: &mut ClipBank,
) -> Result<usize, ChartError> {
    for clip in &doc.clips {
        let path = base.join(&clip.path);
        let bytes = std::fs::read(&path).map_err(|source| ChartError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let decoded = load_wav(&bytes, &clip.name)?;
        debug!(
            "clip '{}': {:.3}s at {} Hz",
            clip.name,
            decoded.duration(),
            decoded.sample_rate
        );
        bank.insert(decoded);
    }
    Ok(doc.clips.len())
}

/// Read a document from disk, load its clips and resolve it.
pub fn load_sequence_file(
    path: &Path,
    bank: &mut ClipBank,
) -> Result<LoadedSequence, ChartError> {
    let json = std::fs::read_to_string(path).map_err(|source| ChartError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let doc = parse_document(&json)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let clips = load_clips(&doc, base, bank)?;
    let loaded = resolve(&doc, bank)?;
    info!(
        "loaded '{}': {} segments, {} clips",
        path.display(),
        loaded.sequence.order.len(),
        clips
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bb_ir::{Clip, ConfigError};

    fn bank() -> ClipBank {
        let mut bank = ClipBank::new();
        bank.insert(Clip::new("intro", 100, vec![0.0; 500]));
        bank.insert(Clip::new("loop", 100, vec![0.0; 200]));
        bank.insert(Clip::new("drums", 100, vec![0.0; 200]));
        bank
    }

    const DOC: &str = r#"{
        "segments": [
            {
                "name": "Intro",
                "bpm": 120,
                "layers": [{ "name": "Base", "clip": "intro", "primary": true }],
                "chart": [
                    { "lane": 1, "measure": 1, "position": 2 },
                    { "lane": 0, "measure": 0, "position": 1, "length": "eighth" }
                ]
            },
            {
                "name": "LoopA",
                "bpm": 90,
                "time_signature": [3, 4],
                "layering": false,
                "layers": [
                    { "name": "Base", "clip": "loop", "primary": true, "looping": true },
                    { "name": "Drums", "clip": "drums", "volume": 0.0, "looping": true }
                ]
            }
        ],
        "order": ["Intro", "LoopA"]
    }"#;

    #[test]
    fn document_defaults() {
        let doc = parse_document(DOC).unwrap();
        assert!(doc.clips.is_empty());
        let intro = &doc.segments[0];
        assert_eq!(intro.time_signature, [4, 4]);
        assert!(intro.layering);
        assert_eq!(intro.layers[0].volume, 1.0);
        assert!(!intro.layers[0].looping);
        assert!(!doc.segments[1].layering);
    }

    #[test]
    fn resolves_layers_and_tempo() {
        let bank = bank();
        let loaded = resolve(&parse_document(DOC).unwrap(), &bank).unwrap();
        let sequence = loaded.sequence.resolve().unwrap();
        assert_eq!(sequence.len(), 2);

        let loop_a = sequence.get(1).unwrap();
        assert_eq!(loop_a.tempo.beats_per_measure(), 3);
        assert!(!loop_a.layering);
        assert_eq!(loop_a.primary_index(), Some(0));
        assert_eq!(loop_a.layers[1].base_volume, 0.0);
        assert_eq!(loop_a.layers[1].clip, bank.find("drums").unwrap());
    }

    #[test]
    fn charts_are_converted_and_sorted() {
        let loaded = resolve(&parse_document(DOC).unwrap(), &bank()).unwrap();
        let intro = loaded.chart("Intro").unwrap();
        assert_eq!(intro.len(), 2);
        // eighth 1 of measure 0 at 120 BPM
        assert_eq!(intro[0].lane, 0);
        assert_relative_eq!(intro[0].time_stamp, 0.25);
        // quarter 2 of measure 1: beat 6
        assert_eq!(intro[1].lane, 1);
        assert_relative_eq!(intro[1].time_stamp, 3.0);
        assert!(loaded.chart("LoopA").is_none());
    }

    #[test]
    fn unknown_clip_is_a_config_error() {
        let doc = DOC.replace("\"drums\"", "\"cymbals\"");
        let err = resolve(&parse_document(&doc).unwrap(), &bank()).unwrap_err();
        assert!(matches!(
            err,
            ChartError::Config(ConfigError::UnknownClip(ref name)) if name == "cymbals"
        ));
    }

    #[test]
    fn unknown_segment_in_order() {
        let doc = DOC.replace("\"order\": [\"Intro\", \"LoopA\"]", "\"order\": [\"Outro\"]");
        let err = resolve(&parse_document(&doc).unwrap(), &bank()).unwrap_err();
        assert!(matches!(err, ChartError::Config(ConfigError::UnknownSegment(_))));
    }

    #[test]
    fn note_outside_measure_is_rejected() {
        let doc = DOC.replace("\"position\": 2 }", "\"position\": 4 }");
        let err = resolve(&parse_document(&doc).unwrap(), &bank()).unwrap_err();
        assert!(matches!(
            err,
            ChartError::Config(ConfigError::NoteOutsideMeasure { measure: 1, position: 4 })
        ));
    }

    #[test]
    fn non_positive_bpm_is_rejected() {
        let doc = DOC.replace("\"bpm\": 90", "\"bpm\": 0");
        let err = resolve(&parse_document(&doc).unwrap(), &bank()).unwrap_err();
        assert!(matches!(err, ChartError::Config(ConfigError::NonPositiveBpm(_))));
    }

    #[test]
    fn missing_primary_is_rejected() {
        let doc = DOC.replace("\"primary\": true, \"looping\": true", "\"looping\": true");
        let err = resolve(&parse_document(&doc).unwrap(), &bank()).unwrap_err();
        assert!(matches!(err, ChartError::Config(ConfigError::MissingPrimary(_))));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(parse_document("{ \"segments\": ["), Err(ChartError::Json(_))));
    }

    #[test]
    fn unknown_note_length() {
        let doc = DOC.replace("\"eighth\"", "\"dotted\"");
        assert!(matches!(parse_document(&doc), Err(ChartError::Json(_))));
    }
}
