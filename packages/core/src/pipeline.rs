//! Batch embedding: probe, place, render a poster and embed for each entry

use crate::config::EmbedConfig;
use crate::document::Presentation;
use crate::embed::embed;
use crate::media::{IntrinsicSize, VideoAsset};
use crate::placement::{place, EmuRect, PlacementPolicy, PlacementRect};
use crate::poster::{PosterGenerator, PosterSource};
use crate::probe::{probe_or_fallback, DimensionProber};
use crate::{DeckError, DeckResult};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One video to embed on a 1-based slide
#[derive(Debug, Clone)]
pub struct EmbedEntry {
    pub slide_index: usize,
    pub video: VideoAsset,
}

impl EmbedEntry {
    pub fn new(slide_index: usize, video: VideoAsset) -> Self {
        Self { slide_index, video }
    }
}

/// What happened to one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementReport {
    pub slide_index: usize,
    pub intrinsic: IntrinsicSize,
    /// False when the fallback size was used
    pub probed: bool,
    /// In the slide's unit (EMU for documents)
    pub rect: PlacementRect,
    pub emu: EmuRect,
    pub poster_source: PosterSource,
    pub media_part: String,
}

/// Rewritten document plus one report per entry, in entry order
#[derive(Debug, Clone)]
pub struct EmbedOutput {
    pub document: Vec<u8>,
    pub reports: Vec<PlacementReport>,
}

/// Stateless embed pipeline; one value can serve many batches
pub struct EmbedPipeline {
    prober: Box<dyn DimensionProber>,
    poster: Box<dyn PosterGenerator>,
    policy: PlacementPolicy,
    fallback: IntrinsicSize,
}

impl EmbedPipeline {
    /// Build the configured backends
    pub fn new(config: &EmbedConfig) -> DeckResult<Self> {
        config.validate()?;
        let timeout = config.media_timeout();

        let prober = config.probe_backend.build(timeout);
        let poster = config
            .poster_backend
            .build(config.poster.placeholder(), timeout);

        tracing::debug!(
            prober = prober.name(),
            poster = poster.name(),
            "Embed pipeline configured"
        );

        Ok(Self::with_backends(
            prober,
            poster,
            config.placement,
            config.fallback_size,
        ))
    }

    pub fn with_backends(
        prober: Box<dyn DimensionProber>,
        poster: Box<dyn PosterGenerator>,
        policy: PlacementPolicy,
        fallback: IntrinsicSize,
    ) -> Self {
        Self {
            prober,
            poster,
            policy,
            fallback,
        }
    }

    /// Embed every entry into `document`.
    ///
    /// Slide indices are all checked before the document is touched. Any
    /// failure discards the batch; no partial document is returned.
    pub fn run(&self, document: &[u8], entries: Vec<EmbedEntry>) -> DeckResult<EmbedOutput> {
        if entries.is_empty() {
            return Err(DeckError::NoEntries);
        }
        self.run_document(Presentation::from_bytes(document)?, entries)
    }

    /// [`run`](Self::run) for an already loaded presentation
    pub fn run_document(
        &self,
        mut doc: Presentation,
        entries: Vec<EmbedEntry>,
    ) -> DeckResult<EmbedOutput> {
        if entries.is_empty() {
            return Err(DeckError::NoEntries);
        }

        let started = Instant::now();
        let slide_count = doc.slide_count();
        if slide_count == 0 {
            return Err(DeckError::EmptyPresentation);
        }

        let mut targets = Vec::with_capacity(entries.len());
        for (entry_index, entry) in entries.iter().enumerate() {
            let target = doc
                .slide(entry.slide_index)
                .ok_or(DeckError::InvalidSlideIndex {
                    entry: entry_index,
                    slide_index: entry.slide_index,
                    slide_count,
                })?;
            targets.push(target);
        }

        tracing::info!(
            entries = entries.len(),
            slides = slide_count,
            "Embedding videos"
        );

        let geometry = doc.slide_geometry();
        let mut reports = Vec::with_capacity(entries.len());

        for (entry, target) in entries.into_iter().zip(targets) {
            let probed = probe_or_fallback(self.prober.as_ref(), &entry.video, self.fallback);
            let rect = place(probed.size, geometry, &self.policy);
            let poster = self.poster.generate(&entry.video, probed.size);

            tracing::debug!(
                slide = target.index,
                size = %probed.size,
                probed = probed.probed,
                poster = ?poster.source(),
                "Placing video"
            );

            let embedded = embed(&mut doc, &target, &entry.video, &poster, &rect)
                .map_err(|e| e.on_slide(target.index))?;

            reports.push(PlacementReport {
                slide_index: target.index,
                intrinsic: probed.size,
                probed: probed.probed,
                rect,
                emu: embedded.rect,
                poster_source: poster.source(),
                media_part: embedded.media_part,
            });
        }

        let document = doc.to_bytes()?;

        tracing::info!(
            entries = reports.len(),
            bytes = document.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Embedding complete"
        );

        Ok(EmbedOutput { document, reports })
    }
}
