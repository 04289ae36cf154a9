//! Load-time configuration for the backbeat rhythm core.
//!
//! Reads JSON sequence documents and WAV clips and resolves them into
//! validated `bb-ir` definitions plus per-segment note charts.

mod document;
mod error;
mod loader;
mod wav_format;

pub use document::{
    ClipDocument, LayerDocument, NoteDocument, NoteValue, SegmentDocument, SequenceDocument,
};
pub use error::ChartError;
pub use loader::{load_clips, load_sequence_file, parse_document, resolve, LoadedSequence};
pub use wav_format::load_wav;
