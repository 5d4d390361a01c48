//! `POST /upload` body validation
//!
//! The body is checked by hand against a loose JSON value so each failure
//! gets its own message, in the order clients have always seen them.

use crate::error::ApiError;
use serde_json::{Map, Value};

/// One requested embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRequest {
    /// 1-based slide number
    pub number: usize,
    pub video_link: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub ppt: String,
    pub slides: Vec<SlideRequest>,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_slide(index: usize, value: &Value) -> Result<SlideRequest, ApiError> {
    let info = value.as_object().ok_or(ApiError::InvalidSlideInfo(index))?;
    let (Some(number), Some(link)) = (info.get("number"), info.get("videoLink")) else {
        return Err(ApiError::InvalidSlideInfo(index));
    };
    let video_link = link
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ApiError::InvalidSlideInfo(index))?
        .to_string();

    let number = number
        .as_u64()
        .filter(|n| *n >= 1)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ApiError::InvalidSlideNumber(display_value(number)))?;

    let mime_type = info
        .get("mimeType")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(SlideRequest {
        number,
        video_link,
        mime_type,
    })
}

fn fields(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

impl UploadRequest {
    /// Validate a raw request body
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        let map = fields(body).ok_or(ApiError::MissingFields)?;
        let (Some(ppt), Some(slides)) = (map.get("ppt"), map.get("slides")) else {
            return Err(ApiError::MissingFields);
        };
        let ppt = ppt.as_str().ok_or(ApiError::MissingFields)?.to_string();

        let slides = match slides.as_array() {
            Some(list) if !list.is_empty() => list,
            _ => return Err(ApiError::InvalidSlides),
        };

        let slides = slides
            .iter()
            .enumerate()
            .map(|(index, value)| parse_slide(index, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { ppt, slides })
    }

    /// Reject slide numbers past the end of the presentation
    pub fn check_slide_numbers(&self, slide_count: usize) -> Result<(), ApiError> {
        match self.slides.iter().find(|s| s.number > slide_count) {
            Some(slide) => Err(ApiError::InvalidSlideNumber(slide.number.to_string())),
            None => Ok(()),
        }
    }
}
