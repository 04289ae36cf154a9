//! Core types for the backbeat rhythm core.
//!
//! This crate defines the data shared by the scheduler, sequencer and note
//! timeline: audio-clock instants, tempo, clips, segment and sequence
//! definitions, authored notes, scheduled events, signals and the error
//! taxonomy. Loaders emit these types and the engine consumes them.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clip;
mod dsp_time;
mod error;
mod event;
mod note;
pub mod segment;
mod signal;
mod tempo;

pub use clip::{Clip, ClipBank, ClipKey};
pub use dsp_time::DspTime;
pub use error::{ConfigError, PlayError};
pub use event::{EventId, LayerAction, LayerRef, ScheduledEvent};
pub use note::{convert_chart, measure_position, EventNote, MeasurePosition, NoteDefinition, NoteLength};
pub use segment::{LayerDef, Name, SegmentDef, Sequence, SequenceDef};
pub use signal::{Signal, SignalKind, SignalQueue};
pub use tempo::{TempoConfig, TimeSignature};
