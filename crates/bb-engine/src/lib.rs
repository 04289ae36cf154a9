//! Timing engine for the backbeat rhythm core.
//!
//! Derives beat and measure boundaries from the audio clock, schedules
//! layer starts, stops and fades ahead of time, walks a sequence of music
//! segments and keeps the note timeline and hit judgment on the same
//! timebase. Also carries a software mixer that can serve as the audio
//! backend and clock for offline rendering.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod backend;
mod beat_clock;
mod clock;
mod error;
mod event_queue;
mod frame;
mod layer;
mod mixer;
mod note_pool;
pub mod scheduler;
pub mod sequencer;
mod timeline;
mod voice;
mod volume;

pub use backend::{AudioBackend, BackendError};
pub use beat_clock::{BeatClock, Granularity};
pub use clock::{ClockSource, ManualClock};
pub use error::EngineError;
pub use event_queue::EventQueue;
pub use frame::Frame;
pub use layer::{Layer, LayerSet, LayerTable, Playback, VolumeRamp};
pub use mixer::{LayerMixer, MixerCommand, MAX_VOICES};
pub use note_pool::{NoteInstance, NoteKey, NotePool, NoteState, NoteVisual};
pub use scheduler::{LayerScheduler, SchedulerConfig, SchedulerStats};
pub use sequencer::{MusicSequencer, PendingAdvance, PendingCompletion, PendingEntry, SequencerState};
pub use timeline::{HitWindow, Judgment, NoteTimeline, TimelineConfig};
pub use voice::{Voice, VoiceState};
pub use volume::{LayerVolumeController, VolumeConfig, VolumeRequest};
