//! bb-cli: run a backbeat sequence headless.
//!
//! Plays a sequence document (or the built-in demo) with scripted input,
//! printing signals as they are raised and a score summary at the end.

use std::path::PathBuf;

use anyhow::{bail, Context};
use bb_ir::ClipBank;
use bb_master::{
    demo, live_session, load_sequence_file, offline_session, render, run_live, Autoplay,
    LiveOptions, RenderOptions, SessionConfig, Signal, SignalKind,
};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "bb-cli")]
#[command(about = "Run a backbeat sequence with scripted input")]
struct Args {
    /// Sequence document (JSON); plays the built-in demo when omitted
    sequence: Option<PathBuf>,

    /// Render offline and write the result to this WAV file
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Play through the default audio device instead of rendering offline
    #[arg(long, conflicts_with = "wav")]
    live: bool,

    /// Sample rate for offline rendering and synthesized demo clips
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Stop after this many seconds
    #[arg(long, default_value = "300")]
    max_seconds: f64,

    /// Strike each note this many seconds late (negative for early)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    offset: f64,

    /// Leave every n-th note unplayed
    #[arg(long)]
    skip_every: Option<usize>,

    /// Disable autoplay entirely
    #[arg(long)]
    no_input: bool,

    /// Disable combo-driven layer volumes
    #[arg(long)]
    no_combo: bool,

    /// Do not print individual signals
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.sample_rate == 0 {
        bail!("sample rate must be positive");
    }

    let (bank, loaded) = match &args.sequence {
        Some(path) => {
            let mut bank = ClipBank::new();
            let loaded = load_sequence_file(path, &mut bank)
                .with_context(|| format!("loading {}", path.display()))?;
            (bank, loaded)
        }
        None => {
            let bank = demo::demo_bank(args.sample_rate);
            let loaded = demo::demo_sequence(&bank).context("resolving the demo sequence")?;
            (bank, loaded)
        }
    };

    let config = if args.no_combo {
        SessionConfig::default()
    } else {
        SessionConfig::with_combo_layering()
    };

    let mut autoplay = Autoplay::new(args.offset);
    if let Some(n) = args.skip_every {
        autoplay = autoplay.skip_every(n);
    }
    let autoplay = (!args.no_input).then_some(&mut autoplay);

    let scoreboard = if args.live {
        let mut session = live_session(bank, loaded, config).context("opening audio output")?;
        if !args.quiet {
            session.subscribe(&SignalKind::ALL, Box::new(print_signal));
        }
        let options = LiveOptions { max_seconds: args.max_seconds, ..LiveOptions::default() };
        run_live(&mut session, &options, autoplay)?;
        session.scoreboard().clone()
    } else {
        let mut session = offline_session(bank, loaded, config, args.sample_rate)?;
        if !args.quiet {
            session.subscribe(&SignalKind::ALL, Box::new(print_signal));
        }
        let options = RenderOptions {
            sample_rate: args.sample_rate,
            max_seconds: args.max_seconds,
            ..RenderOptions::default()
        };
        let output = render(&mut session, &options, autoplay)?;
        if !output.finished {
            println!("stopped after {:.1}s without finishing", output.duration());
        }
        if let Some(path) = &args.wav {
            std::fs::write(path, output.to_wav())
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {:.2}s to {}", output.duration(), path.display());
        }
        output.scoreboard
    };

    println!("{}", scoreboard);
    if let Some(accuracy) = scoreboard.accuracy() {
        println!("accuracy {:.1}%", accuracy * 100.0);
    }
    Ok(())
}

fn print_signal(signal: &Signal) {
    match signal {
        Signal::NoteHit { lane, time_stamp, delta } => {
            println!("  hit   lane {} @ {:>7.3}s  {:+.0} ms", lane, time_stamp, delta * 1000.0)
        }
        Signal::NoteMiss { lane, time_stamp } => {
            println!("  miss  lane {} @ {:>7.3}s", lane, time_stamp)
        }
        Signal::BadInput { lane, time } => println!("  bad   lane {} @ {:>7.3}s", lane, time),
        Signal::SegmentAdvanced { index, name } => println!("segment {}: {}", index, name),
        Signal::SequenceFinished => println!("sequence finished"),
    }
}
