//! PresentationML package access
//!
//! A [`Presentation`] holds every part of a `.pptx` package in memory, in
//! archive order, and knows which parts are the slides and how large they
//! are. Edits replace whole parts; parts added during an embed are appended
//! after the original ones when the package is written back.

pub mod content_types;
pub mod rels;
pub mod xml;

use crate::placement::SlideGeometry;
use crate::{DeckError, DeckResult};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// PowerPoint's 4:3 default, 10in x 7.5in
pub const DEFAULT_SLIDE_WIDTH_EMU: i64 = 9_144_000;
pub const DEFAULT_SLIDE_HEIGHT_EMU: i64 = 6_858_000;

const FALLBACK_MAIN_PART: &str = "ppt/presentation.xml";

/// Pre-allocation cap per entry, as a multiple of the archive size
const MAX_EXPANSION: usize = 4;

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// A slide addressed by its 1-based position in the presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideTarget {
    pub index: usize,
    pub part_name: String,
}

/// In-memory `.pptx` package
#[derive(Debug, Clone)]
pub struct Presentation {
    parts: Vec<Part>,
    main_part: String,
    slides: Vec<String>,
    geometry: SlideGeometry,
}

impl Presentation {
    /// Read a package from raw `.pptx` bytes
    pub fn from_bytes(bytes: &[u8]) -> DeckResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            // Declared sizes are untrusted
            let capacity = (file.size() as usize).min(bytes.len().saturating_mul(MAX_EXPANSION));
            let mut data = Vec::with_capacity(capacity);
            file.read_to_end(&mut data)
                .map_err(|e| DeckError::Archive(format!("{}: {}", name, e)))?;
            parts.push(Part { name, data });
        }

        let mut presentation = Self {
            parts,
            main_part: String::new(),
            slides: Vec::new(),
            geometry: SlideGeometry::from_emu(DEFAULT_SLIDE_WIDTH_EMU, DEFAULT_SLIDE_HEIGHT_EMU),
        };
        presentation.main_part = presentation.resolve_main_part()?;
        presentation.load_main_part()?;

        tracing::debug!(
            parts = presentation.parts.len(),
            slides = presentation.slides.len(),
            width_in = presentation.geometry.width_inches(),
            height_in = presentation.geometry.height_inches(),
            "Loaded presentation"
        );

        Ok(presentation)
    }

    fn resolve_main_part(&self) -> DeckResult<String> {
        if let Some(root_rels) = self.text(&rels::rels_path("")) {
            let relationships = rels::parse(root_rels)?;
            if let Some(main) = relationships
                .iter()
                .find(|r| r.rel_type == rels::OFFICE_DOCUMENT && !r.external)
            {
                let name = rels::resolve_target("", &main.target);
                if self.has_part(&name) {
                    return Ok(name);
                }
                return Err(DeckError::MalformedDocument(format!(
                    "main document part {} is missing",
                    name
                )));
            }
        }

        if self.has_part(FALLBACK_MAIN_PART) {
            tracing::warn!("Package relationships missing, assuming {}", FALLBACK_MAIN_PART);
            return Ok(FALLBACK_MAIN_PART.to_string());
        }

        Err(DeckError::MalformedDocument(
            "no presentation part found".to_string(),
        ))
    }

    fn load_main_part(&mut self) -> DeckResult<()> {
        let main_xml = self.text(&self.main_part).ok_or_else(|| {
            DeckError::MalformedDocument(format!("{} is not valid UTF-8", self.main_part))
        })?;
        let tags = xml::scan(main_xml)?;

        let geometry = tags
            .iter()
            .find(|t| t.opens("p:sldSz"))
            .and_then(|t| {
                let cx = t.attr("cx")?.parse::<i64>().ok()?;
                let cy = t.attr("cy")?.parse::<i64>().ok()?;
                (cx > 0 && cy > 0).then_some((cx, cy))
            });
        let (cx, cy) = geometry.unwrap_or_else(|| {
            tracing::warn!("Slide size missing, assuming 10in x 7.5in");
            (DEFAULT_SLIDE_WIDTH_EMU, DEFAULT_SLIDE_HEIGHT_EMU)
        });

        let main_rels = match self.text(&rels::rels_path(&self.main_part)) {
            Some(text) => rels::parse(text)?,
            None => Vec::new(),
        };

        let mut slides = Vec::new();
        for tag in tags.iter().filter(|t| t.opens("p:sldId")) {
            let rel_id = tag.attr("r:id").ok_or_else(|| {
                DeckError::MalformedDocument("slide entry without relationship id".to_string())
            })?;
            let rel = main_rels.iter().find(|r| r.id == rel_id).ok_or_else(|| {
                DeckError::MalformedDocument(format!("slide relationship {} not found", rel_id))
            })?;
            let part_name = rels::resolve_target(&self.main_part, &rel.target);
            if !self.has_part(&part_name) {
                return Err(DeckError::MalformedDocument(format!(
                    "slide part {} is missing",
                    part_name
                )));
            }
            slides.push(part_name);
        }

        self.geometry = SlideGeometry::from_emu(cx, cy);
        self.slides = slides;
        Ok(())
    }

    /// Write the package back to `.pptx` bytes
    pub fn to_bytes(&self) -> DeckResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            writer.start_file(part.name.as_str(), options)?;
            writer.write_all(&part.data)?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Slide at 1-based `index`
    pub fn slide(&self, index: usize) -> Option<SlideTarget> {
        let part_name = self.slides.get(index.checked_sub(1)?)?;
        Some(SlideTarget {
            index,
            part_name: part_name.clone(),
        })
    }

    pub fn slide_geometry(&self) -> SlideGeometry {
        self.geometry
    }

    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Part contents as UTF-8 text, `None` if missing or not UTF-8
    pub fn text(&self, name: &str) -> Option<&str> {
        std::str::from_utf8(self.part(name)?).ok()
    }

    /// Replace a part's contents, appending it if new
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// First unused `<dir>/<stem>N.<ext>`, counting from 1.
    ///
    /// A number is taken if any part uses it with the same stem, whatever
    /// its extension.
    pub fn next_part_name(&self, dir: &str, stem: &str, ext: &str) -> String {
        let prefix = format!("{dir}/{stem}");
        let used: Vec<u32> = self
            .parts
            .iter()
            .filter_map(|p| {
                let rest = p.name.strip_prefix(&prefix)?;
                let (number, _) = rest.split_once('.')?;
                number.parse::<u32>().ok()
            })
            .collect();

        let n = (1..).find(|n| !used.contains(n)).unwrap_or(1);
        format!("{prefix}{n}.{ext}")
    }
}
