//! Package relationships (`_rels/*.rels`) and part name arithmetic

use super::xml::{self, TagKind};

pub const OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const VIDEO: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/video";
pub const MEDIA: &str = "http://schemas.microsoft.com/office/2007/relationships/media";

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Parse the relationships in a `.rels` part
pub fn parse(rels_xml: &str) -> quick_xml::Result<Vec<Relationship>> {
    let tags = xml::scan(rels_xml)?;
    Ok(tags
        .iter()
        .filter(|t| t.opens("Relationship"))
        .filter_map(|t| {
            Some(Relationship {
                id: t.attr("Id")?.to_string(),
                rel_type: t.attr("Type")?.to_string(),
                target: t.attr("Target")?.to_string(),
                external: t.attr("TargetMode") == Some("External"),
            })
        })
        .collect())
}

/// Numeric suffix one past the highest `rIdN` in use
pub fn next_id_number(rels: &[Relationship]) -> u32 {
    rels.iter()
        .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u32>().ok())
        .max()
        .map_or(1, |n| n + 1)
}

/// Render one internal `Relationship` element
pub fn element(id: &str, rel_type: &str, target: &str) -> String {
    format!(
        r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
        xml::escape_attr(id),
        xml::escape_attr(rel_type),
        xml::escape_attr(target)
    )
}

/// Append relationship elements to an existing `.rels` part, or create one
pub fn append(rels_xml: Option<&str>, elements: &[String]) -> quick_xml::Result<Option<String>> {
    let joined = elements.concat();

    let Some(existing) = rels_xml else {
        return Ok(Some(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
             <Relationships xmlns=\"{RELATIONSHIPS_NS}\">{joined}</Relationships>"
        )));
    };

    let tags = xml::scan(existing)?;
    let Some(root) = xml::find_open(&tags, "Relationships", 0) else {
        return Ok(None);
    };

    let inserted = match tags[root].kind {
        // <Relationships .../> has no children yet
        TagKind::Empty => {
            let span = tags[root].span.clone();
            let open = existing[span.start..span.end - 2].trim_end();
            format!(
                "{}{}>{}</Relationships>{}",
                &existing[..span.start],
                open,
                joined,
                &existing[span.end..]
            )
        }
        _ => {
            let Some(close) = xml::matching_close(&tags, root) else {
                return Ok(None);
            };
            xml::splice(existing, vec![(tags[close].span.start, joined)])
        }
    };
    Ok(Some(inserted))
}

/// Relationship part that describes `part_name`
pub fn rels_path(part_name: &str) -> String {
    match part_name.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None if part_name.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{part_name}.rels"),
    }
}

fn directory(part_name: &str) -> &str {
    part_name.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Resolve a relationship target against the part that owns it
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let (base, target) = match target.strip_prefix('/') {
        Some(absolute) => ("", absolute),
        None => (directory(source_part), target),
    };

    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Target text that reaches `target_part` from `source_part`
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let from: Vec<&str> = directory(source_part)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let to: Vec<&str> = target_part.split('/').collect();
    let (to_dirs, file) = to.split_at(to.len().saturating_sub(1));

    let common = from
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to_dirs[common..]);
    parts.extend(file);
    parts.join("/")
}
