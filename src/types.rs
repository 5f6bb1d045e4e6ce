use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Track formats the registry knows how to route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FormatTag {
    #[serde(rename = "bigwig")]
    BigWig,
    #[serde(rename = "bigbed")]
    BigBed,
    #[serde(rename = "bigbedLarge")]
    BigBedLarge,
    #[serde(rename = "hic")]
    Hic,
    #[serde(rename = "image")]
    Image,
    #[default]
    #[serde(rename = "unsupported")]
    Unsupported,
}

impl FormatTag {
    /// Every tag that can own tracks, in a stable order.
    pub const SUPPORTED: [FormatTag; 5] = [
        FormatTag::BigWig,
        FormatTag::BigBed,
        FormatTag::BigBedLarge,
        FormatTag::Hic,
        FormatTag::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::BigWig => "bigwig",
            FormatTag::BigBed => "bigbed",
            FormatTag::BigBedLarge => "bigbedLarge",
            FormatTag::Hic => "hic",
            FormatTag::Image => "image",
            FormatTag::Unsupported => "unsupported",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FormatTag::BigWig => "application/x-bigwig",
            FormatTag::BigBed | FormatTag::BigBedLarge => "application/x-bigbed",
            FormatTag::Hic => "application/x-hic",
            FormatTag::Image => "application/x-bgzip",
            FormatTag::Unsupported => "application/octet-stream",
        }
    }

    /// Formats that can be registered from a raw byte stream rather than a location.
    pub fn is_stream_ingestible(&self) -> bool {
        matches!(self, FormatTag::Hic | FormatTag::BigWig | FormatTag::BigBed)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FormatTag::Unsupported)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "bigwig" => FormatTag::BigWig,
            "bigbed" => FormatTag::BigBed,
            "bigbedLarge" => FormatTag::BigBedLarge,
            "hic" => FormatTag::Hic,
            "image" => FormatTag::Image,
            _ => FormatTag::Unsupported,
        })
    }
}

/// One row of the namespace-level `/list` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub id: String,
    pub format: FormatTag,
}

/// Per-track metadata served by a backend's `info` command
#[derive(Debug, Serialize)]
pub struct TrackInfo {
    pub id: String,
    pub format: FormatTag,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub buffered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
}
