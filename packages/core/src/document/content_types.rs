//! `[Content_Types].xml` maintenance

use super::xml::{self, TagKind};

pub const PART_NAME: &str = "[Content_Types].xml";

/// Add `Default` entries for any extensions not yet registered.
///
/// Returns `None` if the part has no `Types` root.
pub fn ensure_defaults(
    content_types_xml: &str,
    defaults: &[(&str, &str)],
) -> quick_xml::Result<Option<String>> {
    let tags = xml::scan(content_types_xml)?;
    let Some(root) = xml::find_open(&tags, "Types", 0) else {
        return Ok(None);
    };

    let registered: Vec<String> = tags
        .iter()
        .filter(|t| t.opens("Default"))
        .filter_map(|t| t.attr("Extension"))
        .map(|ext| ext.to_ascii_lowercase())
        .collect();

    let mut missing: Vec<(String, &str)> = Vec::new();
    for (ext, content_type) in defaults {
        let ext = ext.to_ascii_lowercase();
        if !registered.contains(&ext) && !missing.iter().any(|(e, _)| *e == ext) {
            missing.push((ext, *content_type));
        }
    }

    if missing.is_empty() {
        return Ok(Some(content_types_xml.to_string()));
    }

    let markup: String = missing
        .iter()
        .map(|(ext, content_type)| {
            format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                xml::escape_attr(ext),
                xml::escape_attr(content_type)
            )
        })
        .collect();

    if tags[root].kind == TagKind::Empty {
        return Ok(None);
    }

    // Defaults precede Overrides by convention; insert right after the root
    let offset = tags[root].span.end;
    Ok(Some(xml::splice(content_types_xml, vec![(offset, markup)])))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="PNG" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/></Types>"#;

    fn extensions(xml: &str) -> Vec<String> {
        xml::scan(xml)
            .unwrap()
            .iter()
            .filter(|t| t.opens("Default"))
            .filter_map(|t| t.attr("Extension").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_adds_missing_defaults() {
        let out = ensure_defaults(TYPES, &[("mp4", "video/mp4"), ("png", "image/png")])
            .unwrap()
            .unwrap();
        assert_eq!(extensions(&out), ["mp4", "rels", "PNG"]);
        assert!(out.contains(r#"<Default Extension="mp4" ContentType="video/mp4"/>"#));
    }

    #[test]
    fn test_existing_defaults_untouched() {
        let out = ensure_defaults(TYPES, &[("png", "image/png")]).unwrap().unwrap();
        assert_eq!(out, TYPES);
    }

    #[test]
    fn test_duplicate_request_added_once() {
        let out = ensure_defaults(TYPES, &[("mov", "video/quicktime"), ("MOV", "video/quicktime")])
            .unwrap()
            .unwrap();
        assert_eq!(extensions(&out).iter().filter(|e| *e == "mov").count(), 1);
    }

    #[test]
    fn test_missing_root() {
        assert!(ensure_defaults("<Other/>", &[("mp4", "video/mp4")]).unwrap().is_none());
    }
}
