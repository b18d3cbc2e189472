//! WAV encoding and decoding for PCM audio.

use std::io::{Cursor, Write};

use binrw::{binrw, BinWrite};
use cz_ir::AudioBuffer;

use crate::FormatError;

/// Canonical 44-byte header: RIFF, a 16-byte `fmt ` chunk, then `data`.
#[binrw]
#[brw(little, magic = b"RIFF")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CanonicalHeader {
    riff_size: u32,
    #[brw(magic = b"WAVEfmt ")]
    fmt_size: u32,
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
    #[brw(magic = b"data")]
    data_size: u32,
}

const PCM: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

// --- Writing ---

/// Quantize to signed 16-bit, clamping to [-1, 1] first.
fn quantize(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Write `buffer` as interleaved 16-bit PCM.
pub fn write_wav(w: &mut impl Write, buffer: &AudioBuffer) -> std::io::Result<()> {
    let channels = buffer.channels();
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let data_size = (buffer.frames() * block_align as usize) as u32;

    let header = CanonicalHeader {
        riff_size: 36 + data_size,
        fmt_size: 16,
        format_tag: PCM,
        channels,
        sample_rate: buffer.sample_rate(),
        byte_rate: buffer.sample_rate() * block_align as u32,
        block_align,
        bits_per_sample: BITS_PER_SAMPLE,
        data_size,
    };
    let mut head = Cursor::new(Vec::with_capacity(44));
    header
        .write_le(&mut head)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    w.write_all(head.get_ref())?;

    for frame in 0..buffer.frames() {
        for ch in 0..channels {
            w.write_all(&quantize(buffer.sample(ch, frame)).to_le_bytes())?;
        }
    }
    Ok(())
}

pub fn audio_buffer_to_wav(buffer: &AudioBuffer) -> Vec<u8> {
    let mut buf = Vec::new();
    write_wav(&mut buf, buffer).expect("Vec<u8> write cannot fail");
    tracing::debug!(
        frames = buffer.frames(),
        channels = buffer.channels(),
        bytes = buf.len(),
        "wav written"
    );
    buf
}

// --- Reading ---

/// Load an 8- or 16-bit mono or stereo WAV file into a buffer.
pub fn load_wav(data: &[u8]) -> Result<AudioBuffer, FormatError> {
    let header = parse_header(data)?;
    let planes = read_pcm_data(data, &header)?;
    Ok(AudioBuffer::from_planes(&planes, header.sample_rate))
}

struct WavHeader {
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_offset: usize,
    data_size: usize,
}

fn parse_header(data: &[u8]) -> Result<WavHeader, FormatError> {
    if data.len() < 44 {
        return Err(FormatError::UnexpectedEof);
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut pos = 12;
    let mut fmt: Option<(u16, u32, u16)> = None;
    let mut data_chunk: Option<(usize, usize)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32_le(data, pos + 4) as usize;

        if chunk_id == b"fmt " && chunk_size >= 16 && pos + 24 <= data.len() {
            let format = read_u16_le(data, pos + 8);
            if format != PCM {
                return Err(FormatError::UnsupportedVersion);
            }
            let channels = read_u16_le(data, pos + 10);
            let rate = read_u32_le(data, pos + 12);
            let bits = read_u16_le(data, pos + 22);
            fmt = Some((channels, rate, bits));
        } else if chunk_id == b"data" {
            data_chunk = Some((pos + 8, chunk_size));
        }

        pos = pos.saturating_add(8 + chunk_size);
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    let (num_channels, sample_rate, bits_per_sample) = fmt.ok_or(FormatError::InvalidHeader)?;
    let (data_offset, data_size) = data_chunk.ok_or(FormatError::InvalidHeader)?;

    if bits_per_sample != 8 && bits_per_sample != 16 {
        return Err(FormatError::UnsupportedVersion);
    }
    if !(1..=2).contains(&num_channels) {
        return Err(FormatError::UnsupportedVersion);
    }

    Ok(WavHeader {
        num_channels,
        sample_rate,
        bits_per_sample,
        data_offset,
        data_size,
    })
}

fn read_pcm_data(data: &[u8], header: &WavHeader) -> Result<Vec<Vec<f32>>, FormatError> {
    let end = header.data_offset.saturating_add(header.data_size).min(data.len());
    let raw = &data[header.data_offset.min(end)..end];
    let channels = header.num_channels as usize;

    let samples: Vec<f32> = match header.bits_per_sample {
        // 8-bit WAV is unsigned, centered on 128
        8 => raw.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
        16 => raw
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
            .collect(),
        _ => return Err(FormatError::UnsupportedVersion),
    };

    let mut planes = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, &s) in planes.iter_mut().zip(frame) {
            plane.push(s);
        }
    }
    Ok(planes)
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

    /// Build a minimal valid WAV file from raw parameters.
    fn make_wav(channels: u16, sample_rate: u32, bits: u16, pcm_data: &[u8]) -> Vec<u8> {
        let block_align = channels * (bits / 8);
        let byte_rate = sample_rate * block_align as u32;
        let data_size = pcm_data.len() as u32;
        let file_size = 36 + data_size;

        let mut buf = Vec::new();
        buf.extend(b"RIFF");
        buf.extend(&file_size.to_le_bytes());
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

    #[test]
    fn header_layout() {
        let buffer = AudioBuffer::new(2, 3, 44_100);
        let wav = audio_buffer_to_wav(&buffer);
        assert_eq!(wav.len(), 44 + 12);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(read_u32_le(&wav, 4), 36 + 12);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(read_u32_le(&wav, 16), 16);
        assert_eq!(read_u16_le(&wav, 20), 1);
        assert_eq!(read_u16_le(&wav, 22), 2);
        assert_eq!(read_u32_le(&wav, 24), 44_100);
        assert_eq!(read_u32_le(&wav, 28), 44_100 * 4);
        assert_eq!(read_u16_le(&wav, 32), 4);
        assert_eq!(read_u16_le(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(read_u32_le(&wav, 40), 12);
    }

    #[test]
    fn samples_are_clamped_and_interleaved() {
        let buffer = AudioBuffer::from_planes(&[vec![2.0, -0.5], vec![-3.0, 0.0]], 8_000);
        let wav = audio_buffer_to_wav(&buffer);
        let pcm: Vec<i16> = wav[44..]
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(pcm, [32767, -32768, -16384, 0]);
    }

    #[test]
    fn mono_buffer_writes_one_channel() {
        let buffer = AudioBuffer::from_mono(vec![0.0; 10], 22_050);
        let wav = audio_buffer_to_wav(&buffer);
        assert_eq!(read_u16_le(&wav, 22), 1);
        assert_eq!(wav.len(), 44 + 20);
    }

    #[test]
    fn load_8bit_mono() {
        let wav = make_wav(1, 22050, 8, &[128, 255, 0, 192]);
        let buffer = load_wav(&wav).unwrap();
        assert_eq!(buffer.sample_rate(), 22050);
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.channel(0), &[0.0, 127.0 / 128.0, -1.0, 0.5]);
    }

    #[test]
    fn load_16bit_stereo() {
        let pcm: Vec<u8> = [16384i16, -16384, -32768, 0]
            .iter()
            .flat_map(|&v| v.to_le_bytes())
            .collect();
        let wav = make_wav(2, 44100, 16, &pcm);
        let buffer = load_wav(&wav).unwrap();
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0), &[0.5, -1.0]);
        assert_eq!(buffer.channel(1), &[-0.5, 0.0]);
    }

    #[test]
    fn written_wav_loads_back() {
        let buffer = AudioBuffer::from_planes(&[vec![0.25, -0.25], vec![0.5, -0.5]], 48_000);
        let loaded = load_wav(&audio_buffer_to_wav(&buffer)).unwrap();
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.sample_rate(), 48_000);
        for ch in 0..2 {
            for i in 0..2 {
                assert!((loaded.sample(ch, i) - buffer.sample(ch, i)).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn invalid_header_rejected() {
        assert!(load_wav(b"not a wav").is_err());
        let mut wav = make_wav(1, 8000, 16, &[0, 0]);
        wav[8..12].copy_from_slice(b"AVI ");
        assert_eq!(load_wav(&wav).unwrap_err(), FormatError::InvalidHeader);
    }

    #[test]
    fn unsupported_depth_rejected() {
        let wav = make_wav(1, 8000, 24, &[0, 0, 0]);
        assert_eq!(load_wav(&wav).unwrap_err(), FormatError::UnsupportedVersion);
    }
}
