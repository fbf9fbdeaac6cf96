use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::openrtb::BidRequest;

/// Media type enumeration.
///
/// Variants are declared alphabetically so that ordered sets print sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaType {
    Audio,
    Banner,
    Native,
    Video,
}

impl MediaType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Banner => "banner",
            MediaType::Native => "native",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaType::Audio),
            "banner" => Ok(MediaType::Banner),
            "native" => Ok(MediaType::Native),
            "video" => Ok(MediaType::Video),
            _ => Err(()),
        }
    }
}

/// Collect the media types present across all impressions of `request`.
#[must_use]
pub fn classify(request: &BidRequest) -> BTreeSet<MediaType> {
    let mut media_types = BTreeSet::new();

    for imp in &request.imp {
        if imp.banner.is_some() {
            media_types.insert(MediaType::Banner);
        }
        if imp.video.is_some() {
            media_types.insert(MediaType::Video);
        }
        if imp.audio.is_some() {
            media_types.insert(MediaType::Audio);
        }
        if imp.native.is_some() {
            media_types.insert(MediaType::Native);
        }
    }

    media_types
}

/// Render media types as `[a, b]`, in sorted order.
#[must_use]
pub fn format_media_types(media_types: &BTreeSet<MediaType>) -> String {
    let joined = media_types
        .iter()
        .map(|media_type| media_type.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}
