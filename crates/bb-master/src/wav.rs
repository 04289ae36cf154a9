//! WAV encoding for 16-bit stereo PCM.

use bb_engine::Frame;
use std::io::Write;

const HEADER_LEN: usize = 44;

pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    w.write_all(&frames_to_wav(frames, sample_rate))
}

/// Encode `frames` as a complete WAV file, clamping samples to [-1, 1].
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = frames.len() as u32 * block_align as u32;

    let mut buf = Vec::with_capacity(HEADER_LEN + data_size as usize);
    riff_header(&mut buf, data_size);
    fmt_chunk(&mut buf, num_channels, sample_rate, block_align, bits_per_sample);
    data_chunk(&mut buf, frames, data_size);
    buf
}

fn riff_header(buf: &mut Vec<u8>, data_size: u32) {
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
}

fn fmt_chunk(
    buf: &mut Vec<u8>,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) {
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());
}

fn data_chunk(buf: &mut Vec<u8>, frames: &[Frame], data_size: u32) {
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for frame in frames {
        let (left, right) = frame.to_i16();
        buf.extend_from_slice(&left.to_le_bytes());
        buf.extend_from_slice(&right.to_le_bytes());
    }
}
