//! Video embedding into a slide
//!
//! An embed adds the video and poster as media parts, links them from the
//! slide's relationships, places a picture shape bound to both, and registers
//! a playback timing node for the shape. Every new part is rendered before
//! anything is written back, so a failed embed leaves the package as it was.

use crate::document::xml::{self, Tag, TagKind};
use crate::document::{content_types, rels, Presentation, SlideTarget};
use crate::error::EmbedError;
use crate::media::{video_extension, VideoAsset};
use crate::placement::{EmuRect, PlacementRect};
use crate::poster::PosterImage;
use serde::{Deserialize, Serialize};
use std::ops::Range;

const MEDIA_DIR: &str = "ppt/media";
const P14_NS: &str = "http://schemas.microsoft.com/office/powerpoint/2010/main";
const MEDIA_EXT_URI: &str = "{DAA4B4D4-6D71-4841-9C94-3DE7FCFB9230}";
/// Playback volume in thousandths of a percent
const MEDIA_VOLUME: u32 = 80_000;

/// Parts and ids created by one embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedMedia {
    pub shape_id: u32,
    pub media_part: String,
    pub poster_part: String,
    pub rect: EmuRect,
    /// False when an existing timing tree had no root list to extend
    pub timing_added: bool,
}

fn malformed(part: &str, detail: impl std::fmt::Display) -> EmbedError {
    EmbedError::MalformedDocument(format!("{part}: {detail}"))
}

/// Media type without parameters, lowercased
fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Embed `video` on `target`, shown as `poster` inside `rect`
pub fn embed(
    doc: &mut Presentation,
    target: &SlideTarget,
    video: &VideoAsset,
    poster: &PosterImage,
    rect: &PlacementRect,
) -> Result<EmbeddedMedia, EmbedError> {
    let ext = video_extension(video.mime_type())
        .ok_or_else(|| EmbedError::UnsupportedMimeType(video.mime_type().to_string()))?;
    let png = poster
        .to_png()
        .map_err(|e| EmbedError::Image(e.to_string()))?;

    let slide_part = target.part_name.as_str();
    let slide_xml = doc
        .text(slide_part)
        .ok_or_else(|| malformed(slide_part, "slide part missing or not UTF-8"))?;
    let tags = xml::scan(slide_xml).map_err(|e| malformed(slide_part, e))?;

    let media_part = doc.next_part_name(MEDIA_DIR, "media", ext);
    let poster_part = doc.next_part_name(MEDIA_DIR, "image", "png");

    // Relationships
    let rels_part = rels::rels_path(slide_part);
    let rels_xml = doc.text(&rels_part);
    if doc.has_part(&rels_part) && rels_xml.is_none() {
        return Err(malformed(&rels_part, "not UTF-8"));
    }
    let existing = match rels_xml {
        Some(text) => rels::parse(text).map_err(|e| malformed(&rels_part, e))?,
        None => Vec::new(),
    };
    let first_id = rels::next_id_number(&existing);
    let media_rid = format!("rId{}", first_id);
    let video_rid = format!("rId{}", first_id + 1);
    let image_rid = format!("rId{}", first_id + 2);

    let media_target = rels::relative_target(slide_part, &media_part);
    let poster_target = rels::relative_target(slide_part, &poster_part);
    let new_rels = rels::append(
        rels_xml,
        &[
            rels::element(&media_rid, rels::MEDIA, &media_target),
            rels::element(&video_rid, rels::VIDEO, &media_target),
            rels::element(&image_rid, rels::IMAGE, &poster_target),
        ],
    )
    .map_err(|e| malformed(&rels_part, e))?
    .ok_or_else(|| malformed(&rels_part, "no Relationships root"))?;

    // Picture shape
    let shape_id = next_shape_id(&tags);
    let emu = rect.to_emu(&doc.slide_geometry());
    let sp_tree = xml::find_open(&tags, "p:spTree", 0)
        .ok_or_else(|| malformed(slide_part, "no shape tree"))?;
    let sp_tree_close = xml::matching_close(&tags, sp_tree)
        .filter(|&close| tags[close].kind == TagKind::Close)
        .ok_or_else(|| malformed(slide_part, "unterminated shape tree"))?;

    let shape_at = tags[sp_tree_close].span.start;
    let mut edits = vec![(
        shape_at..shape_at,
        picture_xml(shape_id, &media_rid, &video_rid, &image_rid, &emu),
    )];

    // Timing
    let timing = timing_insert(&tags, shape_id).map_err(|e| malformed(slide_part, e))?;
    let timing_added = timing.is_some();
    match timing {
        Some(edit) => edits.push(edit),
        None => tracing::warn!(
            slide = target.index,
            "Slide timing has no root time node list, video will only play from its controls"
        ),
    }
    let new_slide = xml::replace(slide_xml, edits);

    // Content types
    let types_xml = doc
        .text(content_types::PART_NAME)
        .ok_or_else(|| malformed(content_types::PART_NAME, "missing or not UTF-8"))?;
    let video_type = essence(video.mime_type());
    let new_types = content_types::ensure_defaults(
        types_xml,
        &[(ext, video_type.as_str()), ("png", "image/png")],
    )
    .map_err(|e| malformed(content_types::PART_NAME, e))?
    .ok_or_else(|| malformed(content_types::PART_NAME, "no Types root"))?;

    // Commit
    doc.set_part(&media_part, video.data().to_vec());
    doc.set_part(&poster_part, png);
    doc.set_part(&rels_part, new_rels.into_bytes());
    doc.set_part(slide_part, new_slide.into_bytes());
    doc.set_part(content_types::PART_NAME, new_types.into_bytes());

    tracing::debug!(
        slide = target.index,
        shape_id,
        media = %media_part,
        poster = %poster_part,
        x = emu.x,
        y = emu.y,
        cx = emu.cx,
        cy = emu.cy,
        "Embedded video"
    );

    Ok(EmbeddedMedia {
        shape_id,
        media_part,
        poster_part,
        rect: emu,
        timing_added,
    })
}

fn max_numeric_attr(tags: &[Tag], name: &str, attr: &str) -> u32 {
    tags.iter()
        .filter(|t| t.opens(name))
        .filter_map(|t| t.attr(attr)?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

fn next_shape_id(tags: &[Tag]) -> u32 {
    max_numeric_attr(tags, "p:cNvPr", "id") + 1
}

fn picture_xml(shape_id: u32, media_rid: &str, video_rid: &str, image_rid: &str, emu: &EmuRect) -> String {
    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Movie {n}">"#,
            r#"<a:hlinkClick r:id="" action="ppaction://media"/></p:cNvPr>"#,
            r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>"#,
            r#"<p:nvPr><a:videoFile r:link="{video}"/><p:extLst><p:ext uri="{ext_uri}">"#,
            r#"<p14:media xmlns:p14="{p14}" r:embed="{media}"/></p:ext></p:extLst></p:nvPr></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{image}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        ),
        id = shape_id,
        n = shape_id.saturating_sub(1),
        video = video_rid,
        ext_uri = MEDIA_EXT_URI,
        p14 = P14_NS,
        media = media_rid,
        image = image_rid,
        x = emu.x,
        y = emu.y,
        cx = emu.cx,
        cy = emu.cy,
    )
}

fn video_node_xml(ctn_id: u32, shape_id: u32) -> String {
    format!(
        concat!(
            r#"<p:video><p:cMediaNode vol="{vol}"><p:cTn id="{ctn}" fill="hold" display="0">"#,
            r#"<p:stCondLst><p:cond delay="indefinite"/></p:stCondLst></p:cTn>"#,
            r#"<p:tgtEl><p:spTgt spid="{spid}"/></p:tgtEl></p:cMediaNode></p:video>"#,
        ),
        vol = MEDIA_VOLUME,
        ctn = ctn_id,
        spid = shape_id,
    )
}

/// Span to replace with the shape's timing markup.
///
/// `Ok(None)` when the slide already has timing without a root list.
fn timing_insert(tags: &[Tag], shape_id: u32) -> Result<Option<(Range<usize>, String)>, String> {
    let Some(timing) = xml::find_open(tags, "p:timing", 0) else {
        let offset = new_timing_offset(tags)?;
        let markup = format!(
            concat!(
                r#"<p:timing><p:tnLst><p:par>"#,
                r#"<p:cTn id="1" dur="indefinite" restart="never" nodeType="tmRoot">"#,
                r#"<p:childTnLst>{}</p:childTnLst></p:cTn></p:par></p:tnLst></p:timing>"#,
            ),
            video_node_xml(2, shape_id)
        );
        return Ok(Some((offset..offset, markup)));
    };

    let Some(timing_close) = xml::matching_close(tags, timing) else {
        return Err("unterminated timing".to_string());
    };

    let root_list = tags[timing..=timing_close]
        .iter()
        .position(|t| t.opens("p:cTn") && t.attr("nodeType") == Some("tmRoot"))
        .map(|i| i + timing)
        .and_then(|root| xml::children(tags, root).into_iter().find(|&c| tags[c].is("p:childTnLst")));

    let Some(list) = root_list else {
        return Ok(None);
    };

    let node = video_node_xml(max_numeric_attr(tags, "p:cTn", "id") + 1, shape_id);
    match tags[list].kind {
        // <p:childTnLst/> becomes a list holding the node
        TagKind::Empty => Ok(Some((
            tags[list].span.clone(),
            format!("<p:childTnLst>{node}</p:childTnLst>"),
        ))),
        _ => {
            let close = xml::matching_close(tags, list)
                .filter(|&c| tags[c].kind == TagKind::Close)
                .ok_or("unterminated root time node list")?;
            let at = tags[close].span.start;
            Ok(Some((at..at, node)))
        }
    }
}

/// Offset for a new `p:timing`: before the slide's own `p:extLst`, else at
/// the end of `p:sld`
fn new_timing_offset(tags: &[Tag]) -> Result<usize, String> {
    let sld = xml::find_open(tags, "p:sld", 0).ok_or("no slide root")?;
    let close = xml::matching_close(tags, sld)
        .filter(|&c| tags[c].kind == TagKind::Close)
        .ok_or("unterminated slide root")?;

    let ext_lst = xml::children(tags, sld)
        .into_iter()
        .find(|&c| tags[c].is("p:extLst"));

    Ok(match ext_lst {
        Some(ext) => tags[ext].span.start,
        None => tags[close].span.start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pptx_with, sample_pptx, slide_xml};
    use crate::media::IntrinsicSize;
    use crate::placement::{place, PlacementPolicy};
    use crate::poster::PlaceholderPoster;

    fn fixture(doc: &Presentation) -> (VideoAsset, PosterImage, PlacementRect) {
        let video = VideoAsset::new(vec![0, 0, 0, 24, b'f', b't', b'y', b'p'], "video/mp4");
        let size = IntrinsicSize::FALLBACK;
        let poster = PlaceholderPoster::default().render(size);
        let rect = place(size, doc.slide_geometry(), &PlacementPolicy::default());
        (video, poster, rect)
    }

    fn slide_tags(doc: &Presentation, index: usize) -> Vec<Tag> {
        let part = doc.slide(index).unwrap().part_name;
        xml::scan(doc.text(&part).unwrap()).unwrap()
    }

    #[test]
    fn test_embed_adds_parts_and_relationships() {
        let mut doc = Presentation::from_bytes(&sample_pptx(2)).unwrap();
        let target = doc.slide(1).unwrap();
        let (video, poster, rect) = fixture(&doc);

        let embedded = embed(&mut doc, &target, &video, &poster, &rect).unwrap();
        assert_eq!(embedded.media_part, "ppt/media/media1.mp4");
        assert_eq!(embedded.poster_part, "ppt/media/image1.png");
        assert_eq!(embedded.shape_id, 2);
        assert!(embedded.timing_added);
        assert_eq!(doc.part("ppt/media/media1.mp4"), Some(video.data()));
        assert_eq!(&doc.part("ppt/media/image1.png").unwrap()[..4], b"\x89PNG");

        let rels_xml = doc.text(&rels::rels_path(&target.part_name)).unwrap();
        let relationships = rels::parse(rels_xml).unwrap();
        assert_eq!(relationships.len(), 3);
        assert!(relationships
            .iter()
            .any(|r| r.rel_type == rels::MEDIA && r.target == "../media/media1.mp4"));
        assert!(relationships
            .iter()
            .any(|r| r.rel_type == rels::VIDEO && r.target == "../media/media1.mp4"));
        assert!(relationships
            .iter()
            .any(|r| r.rel_type == rels::IMAGE && r.target == "../media/image1.png"));

        let types = doc.text(content_types::PART_NAME).unwrap();
        assert!(types.contains(r#"Extension="mp4" ContentType="video/mp4""#));
        assert!(types.contains(r#"Extension="png" ContentType="image/png""#));
    }

    #[test]
    fn test_picture_shape_binds_media_and_poster() {
        let mut doc = Presentation::from_bytes(&sample_pptx(1)).unwrap();
        let target = doc.slide(1).unwrap();
        let (video, poster, rect) = fixture(&doc);
        let embedded = embed(&mut doc, &target, &video, &poster, &rect).unwrap();

        let tags = slide_tags(&doc, 1);
        let video_file = tags.iter().find(|t| t.opens("a:videoFile")).unwrap();
        let media = tags.iter().find(|t| t.opens("p14:media")).unwrap();
        let blip = tags.iter().find(|t| t.opens("a:blip")).unwrap();
        assert_eq!(video_file.attr("r:link"), Some("rId2"));
        assert_eq!(media.attr("r:embed"), Some("rId1"));
        assert_eq!(blip.attr("r:embed"), Some("rId3"));

        let off = tags.iter().find(|t| t.opens("a:off")).unwrap();
        let ext = tags.iter().find(|t| t.opens("a:ext")).unwrap();
        assert_eq!(off.attr("x"), Some(embedded.rect.x.to_string().as_str()));
        assert_eq!(ext.attr("cx"), Some("1828800"));
        assert_eq!(ext.attr("cy"), Some("1028700"));
        // Bottom-right corner lands on the slide corner
        assert_eq!(embedded.rect.x + embedded.rect.cx, 12_192_000);
        assert_eq!(embedded.rect.y + embedded.rect.cy, 6_858_000);

        // Picture sits inside the shape tree
        let pic = tags.iter().position(|t| t.opens("p:pic")).unwrap();
        let sp_tree_close = tags
            .iter()
            .position(|t| t.kind == TagKind::Close && t.is("p:spTree"))
            .unwrap();
        assert!(pic < sp_tree_close);
    }

    #[test]
    fn test_creates_timing_node() {
        let mut doc = Presentation::from_bytes(&sample_pptx(1)).unwrap();
        let target = doc.slide(1).unwrap();
        let (video, poster, rect) = fixture(&doc);
        embed(&mut doc, &target, &video, &poster, &rect).unwrap();

        let tags = slide_tags(&doc, 1);
        let root = tags
            .iter()
            .find(|t| t.opens("p:cTn") && t.attr("nodeType") == Some("tmRoot"))
            .unwrap();
        assert_eq!(root.attr("id"), Some("1"));
        let sp_tgt = tags.iter().find(|t| t.opens("p:spTgt")).unwrap();
        assert_eq!(sp_tgt.attr("spid"), Some("2"));

        let timing = tags.iter().position(|t| t.opens("p:timing")).unwrap();
        let clr_map = tags.iter().position(|t| t.opens("p:clrMapOvr")).unwrap();
        assert!(timing > clr_map);
    }

    #[test]
    fn test_timing_goes_before_slide_ext_list() {
        let ext = r#"<p:extLst><p:ext uri="{BB962C8B-B14F-4D97-AF65-F5344CB8AC3E}"/></p:extLst>"#;
        let bytes = pptx_with(&[slide_xml("", ext)], Some((9_144_000, 6_858_000)));
        let mut doc = Presentation::from_bytes(&bytes).unwrap();
        let target = doc.slide(1).unwrap();
        let (video, poster, rect) = fixture(&doc);
        embed(&mut doc, &target, &video, &poster, &rect).unwrap();

        let text = doc.text(&target.part_name).unwrap();
        let timing = text.find("<p:timing>").unwrap();
        let slide_ext = text.rfind("<p:extLst>").unwrap();
        assert!(timing < slide_ext);
    }

    #[test]
    fn test_appends_to_existing_timing() {
        let shape = r#"<p:sp><p:nvSpPr><p:cNvPr id="7" name="Title"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp>"#;
        let timing = r#"<p:timing><p:tnLst><p:par><p:cTn id="1" dur="indefinite" restart="never" nodeType="tmRoot"><p:childTnLst><p:seq concurrent="1" nextAc="seek"><p:cTn id="2" dur="indefinite" nodeType="mainSeq"><p:childTnLst/></p:cTn></p:seq></p:childTnLst></p:cTn></p:par></p:tnLst></p:timing>"#;
        let bytes = pptx_with(&[slide_xml(shape, timing)], None);
        let mut doc = Presentation::from_bytes(&bytes).unwrap();
        let target = doc.slide(1).unwrap();
        let (video, poster, rect) = fixture(&doc);

        let embedded = embed(&mut doc, &target, &video, &poster, &rect).unwrap();
        assert_eq!(embedded.shape_id, 8);
        assert!(embedded.timing_added);

        let tags = slide_tags(&doc, 1);
        assert_eq!(tags.iter().filter(|t| t.opens("p:timing")).count(), 1);
        let video_ctn = tags
            .iter()
            .skip_while(|t| !t.opens("p:video"))
            .find(|t| t.opens("p:cTn"))
            .unwrap();
        assert_eq!(video_ctn.attr("id"), Some("3"));

        // The video node is a sibling of the main sequence
        let text = doc.text(&target.part_name).unwrap();
        assert!(text.contains("</p:seq><p:video>"));
    }

    #[test]
    fn test_fills_empty_root_list() {
        let timing = r#"<p:timing><p:tnLst><p:par><p:cTn id="1" dur="indefinite" restart="never" nodeType="tmRoot"><p:childTnLst/></p:cTn></p:par></p:tnLst></p:timing>"#;
        let bytes = pptx_with(&[slide_xml("", timing)], None);
        let mut doc = Presentation::from_bytes(&bytes).unwrap();
        let target = doc.slide(1).unwrap();
        let (video, poster, rect) = fixture(&doc);

        let embedded = embed(&mut doc, &target, &video, &poster, &rect).unwrap();
        assert!(embedded.timing_added);

        let tags = slide_tags(&doc, 1);
        assert_eq!(tags.iter().filter(|t| t.opens("p:childTnLst")).count(), 1);
        let video_ctn = tags
            .iter()
            .skip_while(|t| !t.opens("p:video"))
            .find(|t| t.opens("p:cTn"))
            .unwrap();
        assert_eq!(video_ctn.attr("id"), Some("2"));

        let text = doc.text(&target.part_name).unwrap();
        assert!(text.contains(r#"nodeType="tmRoot"><p:childTnLst><p:video>"#));
        assert!(text.contains("</p:video></p:childTnLst></p:cTn>"));
    }

    #[test]
    fn test_timing_without_root_list_is_skipped() {
        let timing = r#"<p:timing><p:bldLst/></p:timing>"#;
        let bytes = pptx_with(&[slide_xml("", timing)], None);
        let mut doc = Presentation::from_bytes(&bytes).unwrap();
        let target = doc.slide(1).unwrap();
        let (video, poster, rect) = fixture(&doc);

        let embedded = embed(&mut doc, &target, &video, &poster, &rect).unwrap();
        assert!(!embedded.timing_added);
        let tags = slide_tags(&doc, 1);
        assert!(tags.iter().any(|t| t.opens("p:pic")));
        assert!(!tags.iter().any(|t| t.opens("p:video")));
    }

    #[test]
    fn test_repeated_embeds_stay_unique() {
        let mut doc = Presentation::from_bytes(&sample_pptx(1)).unwrap();
        let target = doc.slide(1).unwrap();
        let (video, poster, rect) = fixture(&doc);

        let first = embed(&mut doc, &target, &video, &poster, &rect).unwrap();
        let second = embed(&mut doc, &target, &video, &poster, &rect).unwrap();
        assert_eq!(second.shape_id, first.shape_id + 1);
        assert_eq!(second.media_part, "ppt/media/media2.mp4");
        assert_eq!(second.poster_part, "ppt/media/image2.png");

        let relationships =
            rels::parse(doc.text(&rels::rels_path(&target.part_name)).unwrap()).unwrap();
        let mut ids: Vec<_> = relationships.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);

        let tags = slide_tags(&doc, 1);
        let ctn_ids: Vec<_> = tags
            .iter()
            .filter(|t| t.opens("p:cTn"))
            .filter_map(|t| t.attr("id"))
            .collect();
        assert_eq!(ctn_ids, ["1", "2", "3"]);
    }

    #[test]
    fn test_unsupported_mime_leaves_document_unchanged() {
        let mut doc = Presentation::from_bytes(&sample_pptx(1)).unwrap();
        let before = doc.clone();
        let target = doc.slide(1).unwrap();
        let (_, poster, rect) = fixture(&doc);
        let video = VideoAsset::new(vec![1, 2, 3], "application/pdf");

        let err = embed(&mut doc, &target, &video, &poster, &rect).unwrap_err();
        assert!(matches!(err, EmbedError::UnsupportedMimeType(ref m) if m == "application/pdf"));
        assert_eq!(
            doc.part_names().collect::<Vec<_>>(),
            before.part_names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_malformed_slide_leaves_document_unchanged() {
        let mut doc = Presentation::from_bytes(&sample_pptx(1)).unwrap();
        let target = doc.slide(1).unwrap();
        doc.set_part(&target.part_name, b"<p:sld><p:cSld></p:sld>".to_vec());
        let before: Vec<String> = doc.part_names().map(str::to_string).collect();
        let (video, poster, rect) = fixture(&doc);

        let err = embed(&mut doc, &target, &video, &poster, &rect).unwrap_err();
        assert!(matches!(err, EmbedError::MalformedDocument(_)));
        assert_eq!(doc.part_names().collect::<Vec<_>>(), before);
        assert!(!doc.has_part(&rels::rels_path(&target.part_name)));
    }

    #[test]
    fn test_mime_parameters_and_other_containers() {
        let mut doc = Presentation::from_bytes(&sample_pptx(1)).unwrap();
        let target = doc.slide(1).unwrap();
        let (_, poster, rect) = fixture(&doc);
        let video = VideoAsset::new(vec![0; 16], "Video/QuickTime; codecs=avc1");

        let embedded = embed(&mut doc, &target, &video, &poster, &rect).unwrap();
        assert_eq!(embedded.media_part, "ppt/media/media1.mov");
        let types = doc.text(content_types::PART_NAME).unwrap();
        assert!(types.contains(r#"Extension="mov" ContentType="video/quicktime""#));
    }
}
