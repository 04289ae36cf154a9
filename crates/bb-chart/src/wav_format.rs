//! WAV decoding into mono clips.
//!
//! Accepts 8-bit unsigned and 16-bit signed PCM, mono or stereo. Stereo is
//! folded to mono by averaging the two channels.

use bb_ir::Clip;

use crate::ChartError;

struct WavHeader {
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_offset: usize,
    data_size: usize,
}

/// Decode a WAV file held in memory into a clip named `name`.
pub fn load_wav(data: &[u8], name: &str) -> Result<Clip, ChartError> {
    let header = parse_header(data).map_err(|reason| ChartError::Wav {
        name: name.to_string(),
        reason,
    })?;

    let end = (header.data_offset + header.data_size).min(data.len());
    let raw = &data[header.data_offset..end];
    let mono = match header.bits_per_sample {
        8 => fold(raw.iter().map(|&b| (b as f32 - 128.0) / 128.0), header.num_channels),
        _ => fold(
            raw.chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0),
            header.num_channels,
        ),
    };
    Ok(Clip::new(name, header.sample_rate, mono))
}

fn fold(samples: impl Iterator<Item = f32>, channels: u16) -> Vec<f32> {
    if channels == 1 {
        return samples.collect();
    }
    let samples: Vec<f32> = samples.collect();
    samples.chunks_exact(2).map(|pair| (pair[0] + pair[1]) * 0.5).collect()
}

fn parse_header(data: &[u8]) -> Result<WavHeader, &'static str> {
    if data.len() < 44 {
        return Err("file too short");
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err("not a RIFF/WAVE file");
    }

    let mut pos = 12;
    let mut fmt: Option<(u16, u32, u16)> = None;
    let mut data_chunk: Option<(usize, usize)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32_le(data, pos + 4) as usize;

        if chunk_id == b"fmt " {
            if chunk_size < 16 || pos + 8 + 16 > data.len() {
                return Err("truncated fmt chunk");
            }
            if read_u16_le(data, pos + 8) != 1 {
                return Err("only PCM is supported");
            }
            let channels = read_u16_le(data, pos + 10);
            let rate = read_u32_le(data, pos + 12);
            let bits = read_u16_le(data, pos + 22);
            fmt = Some((channels, rate, bits));
        } else if chunk_id == b"data" {
            data_chunk = Some((pos + 8, chunk_size));
        }

        pos = pos.saturating_add(8).saturating_add(chunk_size);
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    let (num_channels, sample_rate, bits_per_sample) = fmt.ok_or("missing fmt chunk")?;
    let (data_offset, data_size) = data_chunk.ok_or("missing data chunk")?;

    if bits_per_sample != 8 && bits_per_sample != 16 {
        return Err("unsupported bit depth");
    }
    if !(1..=2).contains(&num_channels) {
        return Err("unsupported channel count");
    }
    if sample_rate == 0 {
        return Err("zero sample rate");
    }

    Ok(WavHeader { num_channels, sample_rate, bits_per_sample, data_offset, data_size })
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Build a minimal valid WAV file from raw parameters.
    fn make_wav(channels: u16, sample_rate: u32, bits: u16, pcm_data: &[u8]) -> Vec<u8> {
        let block_align = channels * (bits / 8);
        let byte_rate = sample_rate * block_align as u32;
        let data_size = pcm_data.len() as u32;

        let mut buf = Vec::new();
        buf.extend(b"RIFF");
        buf.extend(&(36 + data_size).to_le_bytes());
        buf.extend(b"WAVE");
        buf.extend(b"fmt ");
        buf.extend(&16u32.to_le_bytes());
        buf.extend(&1u16.to_le_bytes());
        buf.extend(&channels.to_le_bytes());
        buf.extend(&sample_rate.to_le_bytes());
        buf.extend(&byte_rate.to_le_bytes());
        buf.extend(&block_align.to_le_bytes());
        buf.extend(&bits.to_le_bytes());
        buf.extend(b"data");
        buf.extend(&data_size.to_le_bytes());
        buf.extend(pcm_data);
        buf
    }

    fn pcm16(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn load_8bit_mono() {
        let wav = make_wav(1, 22050, 8, &[128, 192, 64, 0]);
        let clip = load_wav(&wav, "click").unwrap();
        assert_eq!(clip.sample_rate, 22050);
        assert_eq!(clip.data, [0.0, 0.5, -0.5, -1.0]);
    }

    #[test]
    fn load_16bit_mono() {
        let wav = make_wav(1, 44100, 16, &pcm16(&[0, 16384, -16384, -32768]));
        let clip = load_wav(&wav, "bass").unwrap();
        assert_eq!(clip.data, [0.0, 0.5, -0.5, -1.0]);
        assert_relative_eq!(clip.duration(), 4.0 / 44100.0);
    }

    #[test]
    fn stereo_is_folded_to_mono() {
        let wav = make_wav(2, 48000, 16, &pcm16(&[16384, 0, -16384, -16384]));
        let clip = load_wav(&wav, "pad").unwrap();
        assert_eq!(clip.data, [0.25, -0.5]);
    }

    #[test]
    fn invalid_header_rejected() {
        let err = load_wav(&[0; 48], "bad").unwrap_err();
        assert!(matches!(err, ChartError::Wav { reason: "not a RIFF/WAVE file", .. }));
    }

    #[test]
    fn too_short_rejected() {
        assert!(load_wav(&[0; 10], "short").is_err());
    }

    #[test]
    fn fmt_chunk_cut_short_is_an_error() {
        // RIFF/WAVE, a 24-byte JUNK chunk, then a fmt header with 2 of its 16 bytes
        let mut wav = Vec::new();
        wav.extend(b"RIFF");
        wav.extend(&46u32.to_le_bytes());
        wav.extend(b"WAVE");
        wav.extend(b"JUNK");
        wav.extend(&24u32.to_le_bytes());
        wav.extend(&[0u8; 24]);
        wav.extend(b"fmt ");
        wav.extend(&16u32.to_le_bytes());
        wav.extend(&1u16.to_le_bytes());
        assert_eq!(wav.len(), 54);

        assert!(matches!(
            load_wav(&wav, "cut"),
            Err(ChartError::Wav { reason: "truncated fmt chunk", .. })
        ));
    }

    #[test]
    fn undersized_fmt_chunk_is_an_error() {
        let mut wav = make_wav(1, 8000, 16, &pcm16(&[0; 8]));
        wav[16..20].copy_from_slice(&14u32.to_le_bytes());
        assert!(matches!(
            load_wav(&wav, "small"),
            Err(ChartError::Wav { reason: "truncated fmt chunk", .. })
        ));
    }

    #[test]
    fn unsupported_depth_rejected() {
        let wav = make_wav(1, 44100, 24, &[0; 6]);
        assert!(matches!(
            load_wav(&wav, "deep"),
            Err(ChartError::Wav { reason: "unsupported bit depth", .. })
        ));
    }
}
