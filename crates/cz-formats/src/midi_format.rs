//! Standard multi-track note file writer.
//!
//! Layout: an `MThd` header, a tempo track, then one `MTrk` per exported
//! track. All multi-byte fields are big-endian. Delta times are
//! variable-length quantities.

use std::io::Cursor;

use binrw::{binrw, BinRead, BinWrite};
use cz_ir::{micros_per_quarter, Track, TICKS_PER_QUARTER};

use crate::FormatError;

/// Header format field: simultaneous tracks.
pub const NOTE_FILE_FORMAT: u16 = 1;

/// Largest value a four-byte variable-length quantity can hold.
const VLQ_MAX: u32 = 0x0FFF_FFFF;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const META: u8 = 0xFF;
const META_TRACK_NAME: u8 = 0x03;
const META_END_OF_TRACK: u8 = 0x2F;
const META_TEMPO: u8 = 0x51;
const META_TIME_SIGNATURE: u8 = 0x58;

#[binrw]
#[brw(big, magic = b"MThd")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderChunk {
    length: u32,
    format: u16,
    track_count: u16,
    division: u16,
}

#[binrw]
#[brw(big, magic = b"MTrk")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackChunkHeader {
    length: u32,
}

// --- Variable-length quantities ---

/// Append `value` as a variable-length quantity: 7 bits per byte, most
/// significant group first, continuation bit set on all but the last.
/// Values above 28 bits are clamped.
pub fn write_vlq(out: &mut Vec<u8>, value: u32) {
    let mut value = value.min(VLQ_MAX);
    let mut groups = [0u8; 4];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7F) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | continuation);
    }
}

/// Decode a variable-length quantity from the start of `data`.
/// Returns the value and the number of bytes consumed.
pub fn read_vlq(data: &[u8]) -> Result<(u32, usize), FormatError> {
    let mut value: u32 = 0;
    for (i, &byte) in data.iter().enumerate().take(4) {
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if data.len() < 4 {
        Err(FormatError::UnexpectedEof)
    } else {
        Err(FormatError::InvalidHeader)
    }
}

// --- Writing ---

/// One channel event at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct NoteEvent {
    tick: u64,
    /// Offs sort before ons at the same tick
    is_on: bool,
    pitch: u8,
    velocity: u8,
}

fn velocity_byte(velocity: f32) -> u8 {
    let v = (velocity * 127.0).round();
    if v.is_nan() {
        1
    } else {
        v.clamp(1.0, 127.0) as u8
    }
}

fn note_events(track: &Track) -> Vec<NoteEvent> {
    let mut events: Vec<NoteEvent> = track
        .clips
        .iter()
        .flat_map(|clip| clip.absolute_notes())
        .flat_map(|note| {
            let pitch = note.pitch & 0x7F;
            [
                NoteEvent {
                    tick: note.start_tick,
                    is_on: true,
                    pitch,
                    velocity: velocity_byte(note.velocity),
                },
                NoteEvent {
                    tick: note.end_tick(),
                    is_on: false,
                    pitch,
                    velocity: 0,
                },
            ]
        })
        .collect();
    events.sort();
    events
}

fn push_meta(out: &mut Vec<u8>, kind: u8, payload: &[u8]) {
    out.push(0);
    out.push(META);
    out.push(kind);
    write_vlq(out, payload.len() as u32);
    out.extend_from_slice(payload);
}

fn end_of_track(out: &mut Vec<u8>) {
    push_meta(out, META_END_OF_TRACK, &[]);
}

fn tempo_track(bpm: f64) -> Vec<u8> {
    let mut out = Vec::new();
    let tempo = micros_per_quarter(bpm).min(0x00FF_FFFF).to_be_bytes();
    push_meta(&mut out, META_TEMPO, &tempo[1..]);
    // 4/4, 24 clocks per click, 8 32nds per quarter
    push_meta(&mut out, META_TIME_SIGNATURE, &[4, 2, 24, 8]);
    end_of_track(&mut out);
    out
}

fn data_track(track: &Track, channel: u8) -> Vec<u8> {
    let mut out = Vec::new();
    push_meta(&mut out, META_TRACK_NAME, track.name.as_bytes());

    let mut last_tick = 0u64;
    for event in note_events(track) {
        let delta = (event.tick - last_tick).min(VLQ_MAX as u64) as u32;
        last_tick = event.tick;
        write_vlq(&mut out, delta);
        let status = if event.is_on { NOTE_ON } else { NOTE_OFF };
        out.push(status | channel);
        out.push(event.pitch);
        out.push(event.velocity);
    }
    end_of_track(&mut out);
    out
}

fn write_chunk(out: &mut Cursor<Vec<u8>>, payload: &[u8]) {
    TrackChunkHeader {
        length: payload.len() as u32,
    }
    .write_be(out)
    .expect("Vec<u8> write cannot fail");
    out.get_mut().extend_from_slice(payload);
    out.set_position(out.get_ref().len() as u64);
}

/// Serialize `tracks` as a multi-track note file at `bpm`.
///
/// Track `i` is written on channel `i mod 16`, after a tempo track
/// carrying `round(60_000_000 / bpm)` microseconds per quarter note.
pub fn write_note_file(tracks: &[Track], bpm: f64) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    HeaderChunk {
        length: 6,
        format: NOTE_FILE_FORMAT,
        track_count: (tracks.len() + 1).min(u16::MAX as usize) as u16,
        division: TICKS_PER_QUARTER as u16,
    }
    .write_be(&mut out)
    .expect("Vec<u8> write cannot fail");

    write_chunk(&mut out, &tempo_track(bpm));
    for (i, track) in tracks.iter().enumerate() {
        write_chunk(&mut out, &data_track(track, (i % 16) as u8));
    }

    let bytes = out.into_inner();
    tracing::debug!(tracks = tracks.len(), bytes = bytes.len(), "note file written");
    bytes
}

// --- Reading ---

/// A chunk located in a note file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub id: [u8; 4],
    /// Declared payload length
    pub length: u32,
    /// Byte offset of the payload
    pub offset: usize,
}

/// Walk every chunk of a note file, checking that each declared length
/// fits the data, that the chunks exactly fill the file, and that the
/// header's track count matches.
pub fn note_file_chunks(data: &[u8]) -> Result<Vec<ChunkInfo>, FormatError> {
    let header = HeaderChunk::read_be(&mut Cursor::new(data))?;
    if header.length < 6 {
        return Err(FormatError::InvalidHeader);
    }
    if header.format > 2 {
        return Err(FormatError::UnsupportedVersion);
    }

    let mut chunks = vec![ChunkInfo {
        id: *b"MThd",
        length: header.length,
        offset: 8,
    }];
    let mut pos = 8 + header.length as usize;
    while pos < data.len() {
        if pos + 8 > data.len() {
            return Err(FormatError::UnexpectedEof);
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&data[pos..pos + 4]);
        let length = u32::from_be_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);
        let offset = pos + 8;
        let end = offset
            .checked_add(length as usize)
            .filter(|&end| end <= data.len())
            .ok_or(FormatError::UnexpectedEof)?;
        chunks.push(ChunkInfo { id, length, offset });
        pos = end;
    }

    let tracks = chunks.iter().filter(|c| &c.id == b"MTrk").count();
    if tracks != header.track_count as usize {
        return Err(FormatError::InvalidHeader);
    }
    Ok(chunks)
}
