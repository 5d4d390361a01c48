//! ISO base media (MP4/MOV) box walker
//!
//! Finds the first `trak` whose handler is `vide` and reads its pixel size
//! from `tkhd`, falling back to the first visual sample entry in `stsd`.

use super::DimensionProber;
use crate::media::{IntrinsicSize, VideoAsset};

/// One box: four-character type and payload (header stripped)
#[derive(Debug, Clone, Copy)]
struct Atom<'a> {
    kind: [u8; 4],
    body: &'a [u8],
}

/// Iterator over sibling boxes in a byte range.
///
/// Stops at the first truncated or malformed header.
struct Atoms<'a> {
    data: &'a [u8],
}

impl<'a> Atoms<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for Atoms<'a> {
    type Item = Atom<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < 8 {
            return None;
        }

        let size = read_u32(self.data, 0)? as u64;
        let kind = [self.data[4], self.data[5], self.data[6], self.data[7]];

        let (size, header_size) = match size {
            // Extended 64-bit size
            1 => (read_u64(self.data, 8)?, 16u64),
            // Box extends to end of data
            0 => (self.data.len() as u64, 8u64),
            _ => (size, 8u64),
        };

        if size < header_size || size > self.data.len() as u64 {
            self.data = &[];
            return None;
        }

        let size = size as usize;
        let body = &self.data[header_size as usize..size];
        self.data = &self.data[size..];
        Some(Atom { kind, body })
    }
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}

fn child<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    Atoms::new(data).find(|a| &a.kind == kind).map(|a| a.body)
}

/// Track header width/height (16.16 fixed point), integer part only
fn tkhd_dimensions(tkhd: &[u8]) -> Option<(u32, u32)> {
    let version = *tkhd.first()?;
    // version/flags, then creation/modification times, track id, reserved, duration
    let header_len = if version == 1 { 36 } else { 24 };
    // reserved(8) layer(2) alternate_group(2) volume(2) reserved(2) matrix(36)
    let dim_offset = header_len + 52;
    let width = read_u32(tkhd, dim_offset)? >> 16;
    let height = read_u32(tkhd, dim_offset + 4)? >> 16;
    Some((width, height))
}

fn handler_is_video(hdlr: &[u8]) -> bool {
    // version/flags(4) pre_defined(4) handler_type(4)
    hdlr.get(8..12) == Some(b"vide".as_slice())
}

/// Width/height of the first visual sample entry
fn stsd_dimensions(stsd: &[u8]) -> Option<(u32, u32)> {
    // version/flags(4) entry_count(4), then sample entries as boxes
    let entries = stsd.get(8..)?;
    let entry = Atoms::new(entries).next()?;
    // reserved(6) data_reference_index(2) pre_defined(2) reserved(2) pre_defined(12)
    let width = read_u16(entry.body, 24)? as u32;
    let height = read_u16(entry.body, 26)? as u32;
    Some((width, height))
}

fn video_track_size(trak: &[u8]) -> Option<Option<IntrinsicSize>> {
    let mdia = child(trak, b"mdia")?;
    let hdlr = child(mdia, b"hdlr")?;
    if !handler_is_video(hdlr) {
        return None;
    }

    let from_tkhd = child(trak, b"tkhd")
        .and_then(tkhd_dimensions)
        .and_then(|(w, h)| IntrinsicSize::new(w, h));

    let size = from_tkhd.or_else(|| {
        let stsd = child(mdia, b"minf")
            .and_then(|minf| child(minf, b"stbl"))
            .and_then(|stbl| child(stbl, b"stsd"))?;
        let (w, h) = stsd_dimensions(stsd)?;
        IntrinsicSize::new(w, h)
    });

    Some(size)
}

/// Pixel size of the first video track in an ISO-BMFF buffer
pub fn first_video_track_size(data: &[u8]) -> Option<IntrinsicSize> {
    let moov = child(data, b"moov")?;
    // The first video track decides, even if its dimensions are unusable
    Atoms::new(moov)
        .filter(|a| &a.kind == b"trak")
        .find_map(|trak| video_track_size(trak.body))
        .flatten()
}

/// Pure-Rust prober for MP4/MOV containers
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerProber;

impl DimensionProber for ContainerProber {
    fn name(&self) -> &'static str {
        "container"
    }

    fn probe(&self, video: &VideoAsset) -> Option<IntrinsicSize> {
        let size = first_video_track_size(video.data());
        if size.is_none() {
            tracing::debug!(
                bytes = video.len(),
                mime = video.mime_type(),
                "No usable video track in container"
            );
        }
        size
    }
}
