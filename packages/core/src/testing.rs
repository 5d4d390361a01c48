//! In-memory MP4 and `.pptx` builders for tests
//!
//! Compiled into the crate's own tests, pulled into the integration tests by
//! path, and exported to dependent crates with the `test-support` feature.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 16:9 slide size in EMU
pub const WIDESCREEN: (i64, i64) = (12_192_000, 6_858_000);

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="/ppt/presentation.xml"/></Relationships>"#;

const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

pub fn atom(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

pub fn tkhd_v0(width: u32, height: u32) -> Vec<u8> {
    let mut body = vec![0u8; 84];
    body[76..80].copy_from_slice(&(width << 16).to_be_bytes());
    body[80..84].copy_from_slice(&(height << 16).to_be_bytes());
    atom(b"tkhd", &body)
}

pub fn tkhd_v1(width: u32, height: u32) -> Vec<u8> {
    let mut body = vec![0u8; 96];
    body[0] = 1;
    body[88..92].copy_from_slice(&(width << 16).to_be_bytes());
    body[92..96].copy_from_slice(&(height << 16).to_be_bytes());
    atom(b"tkhd", &body)
}

fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut body = vec![0u8; 25];
    body[8..12].copy_from_slice(handler);
    atom(b"hdlr", &body)
}

fn stsd(width: u16, height: u16) -> Vec<u8> {
    let mut entry = vec![0u8; 78];
    entry[24..26].copy_from_slice(&width.to_be_bytes());
    entry[26..28].copy_from_slice(&height.to_be_bytes());
    let mut body = vec![0, 0, 0, 0, 0, 0, 0, 1];
    body.extend(atom(b"avc1", &entry));
    atom(b"stsd", &body)
}

/// One `trak` with the given header, handler and optional sample entry size
pub fn trak(tkhd: Vec<u8>, handler: &[u8; 4], sample: Option<(u16, u16)>) -> Vec<u8> {
    let mut mdia = hdlr(handler);
    if let Some((w, h)) = sample {
        let stbl = atom(b"stbl", &stsd(w, h));
        mdia.extend(atom(b"minf", &stbl));
    }
    let mut body = tkhd;
    body.extend(atom(b"mdia", &mdia));
    atom(b"trak", &body)
}

/// `ftyp`, an empty `mdat`, then `moov` holding `traks`
pub fn mp4(traks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = atom(b"ftyp", b"isom\0\0\x02\0isomiso2avc1mp41");
    out.extend(atom(b"mdat", &[0u8; 32]));
    out.extend(atom(b"moov", &traks.concat()));
    out
}

/// MP4 with one video track of the given size
pub fn video_mp4(width: u32, height: u32) -> Vec<u8> {
    mp4(&[trak(tkhd_v0(width, height), b"vide", None)])
}

/// Slide part with `extra_shapes` at the end of the shape tree and `tail`
/// before `</p:sld>`
pub fn slide_xml(extra_shapes: &str, tail: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{extra_shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>{tail}</p:sld>"#
    )
}

/// Package with `slides` in presentation order.
///
/// Part numbering runs opposite to presentation order, and entries are
/// stored uncompressed so tests can tamper with their bytes.
pub fn pptx_with(slides: &[String], slide_size: Option<(i64, i64)>) -> Vec<u8> {
    let mut ids = String::new();
    let mut main_rels = String::new();
    for i in 0..slides.len() {
        let part = slides.len() - i;
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, 10 + i));
        main_rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{}" Target="slides/slide{}.xml"/>"#,
            10 + i,
            SLIDE_REL,
            part
        ));
    }
    let size = slide_size
        .map(|(cx, cy)| format!(r#"<p:sldSz cx="{cx}" cy="{cy}"/>"#))
        .unwrap_or_default();
    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{ids}</p:sldIdLst>{size}<p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    );
    let presentation_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{main_rels}</Relationships>"#
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut add = |name: &str, data: &[u8]| {
        writer.start_file(name, options).unwrap();
        writer.write_all(data).unwrap();
    };
    add("[Content_Types].xml", CONTENT_TYPES.as_bytes());
    add("_rels/.rels", ROOT_RELS.as_bytes());
    add("ppt/presentation.xml", presentation.as_bytes());
    add("ppt/_rels/presentation.xml.rels", presentation_rels.as_bytes());
    for (i, slide) in slides.iter().enumerate() {
        let part = slides.len() - i;
        add(&format!("ppt/slides/slide{part}.xml"), slide.as_bytes());
    }
    writer.finish().unwrap().into_inner()
}

/// Widescreen package with `slide_count` empty slides
pub fn sample_pptx(slide_count: usize) -> Vec<u8> {
    let slides: Vec<String> = (0..slide_count).map(|_| slide_xml("", "")).collect();
    pptx_with(&slides, Some(WIDESCREEN))
}

/// Flip the byte following the first occurrence of `marker`.
///
/// On a stored package this breaks the entry's checksum while the archive
/// directory still parses.
pub fn corrupt_after(package: &[u8], marker: &str) -> Vec<u8> {
    let mut out = package.to_vec();
    let at = out
        .windows(marker.len())
        .position(|w| w == marker.as_bytes())
        .unwrap()
        + marker.len();
    out[at] ^= 0x20;
    out
}

/// Rewrite the uncompressed size the central directory records for `entry`
pub fn declare_size(package: &[u8], entry: &str, size: u32) -> Vec<u8> {
    let mut out = package.to_vec();
    let mut at = 0;
    while let Some(offset) = out[at..].windows(4).position(|w| w == b"PK\x01\x02") {
        let header = at + offset;
        let name_len = u16::from_le_bytes([out[header + 28], out[header + 29]]) as usize;
        if &out[header + 46..header + 46 + name_len] == entry.as_bytes() {
            out[header + 24..header + 28].copy_from_slice(&size.to_le_bytes());
            return out;
        }
        at = header + 4;
    }
    panic!("no central directory entry for {entry}");
}
