//! Typed generation parameters and their validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Largest `num_images` the queue accepts.
pub const MAX_IMAGES: u32 = 4;

/// Largest number of reference images for edit mode.
pub const MAX_REFERENCE_IMAGES: usize = 4;

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 21:9
    #[serde(rename = "21:9")]
    UltraWide,
    /// 16:9
    #[serde(rename = "16:9")]
    Wide,
    /// 3:2
    #[serde(rename = "3:2")]
    Landscape3x2,
    /// 4:3
    #[serde(rename = "4:3")]
    Landscape4x3,
    /// 5:4
    #[serde(rename = "5:4")]
    Landscape5x4,
    /// 1:1
    #[serde(rename = "1:1")]
    Square,
    /// 4:5
    #[serde(rename = "4:5")]
    Portrait4x5,
    /// 3:4
    #[serde(rename = "3:4")]
    Portrait3x4,
    /// 2:3
    #[serde(rename = "2:3")]
    Portrait2x3,
    /// 9:16
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    const ALL: [(Self, &'static str); 10] = [
        (Self::UltraWide, "21:9"),
        (Self::Wide, "16:9"),
        (Self::Landscape3x2, "3:2"),
        (Self::Landscape4x3, "4:3"),
        (Self::Landscape5x4, "5:4"),
        (Self::Square, "1:1"),
        (Self::Portrait4x5, "4:5"),
        (Self::Portrait3x4, "3:4"),
        (Self::Portrait2x3, "2:3"),
        (Self::Tall, "9:16"),
    ];

    /// Wire representation, e.g. `"16:9"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(r, _)| *r == self)
            .map_or("1:1", |(_, s)| *s)
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(r, _)| *r)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|(_, n)| *n).collect();
                format!(
                    "Unsupported aspect ratio '{s}'. Valid: {}",
                    valid.join(", ")
                )
            })
    }
}

/// Output resolution class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// About 1024 px on the long edge.
    #[serde(rename = "1K")]
    OneK,
    /// About 2048 px.
    #[serde(rename = "2K")]
    TwoK,
    /// About 4096 px.
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "1K" => Ok(Self::OneK),
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            _ => Err(format!("Unsupported resolution '{s}'. Valid: 1K, 2K, 4K")),
        }
    }
}

/// Encoded format of the generated images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG
    Jpeg,
    /// PNG
    Png,
    /// WebP
    Webp,
}

impl OutputFormat {
    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// File extension for saved images.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            _ => Err(format!("Unsupported format '{s}'. Valid: jpeg, png, webp")),
        }
    }
}

macro_rules! display_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(AspectRatio, Resolution, OutputFormat);

/// Validate the requested image count.
///
/// # Errors
///
/// Returns an error if the count is outside `1..=MAX_IMAGES`.
pub fn validate_count(count: u32) -> Result<(), String> {
    if (1..=MAX_IMAGES).contains(&count) {
        Ok(())
    } else {
        Err(format!(
            "Unsupported image count {count}. Valid: 1-{MAX_IMAGES}"
        ))
    }
}

/// Validate the shape of a credential.
///
/// # Errors
///
/// Returns an error if the key is blank or lacks the `fal-` prefix.
pub fn validate_credential(key: &str) -> Result<(), String> {
    const PREFIX: &str = "fal-";
    let key = key.trim();
    if key.is_empty() {
        Err("API key is empty".to_string())
    } else if !key.starts_with(PREFIX) {
        Err(format!(
            "Invalid API key format. Keys must start with \"{PREFIX}\""
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_parses_all_supported() {
        for s in ["21:9", "16:9", "3:2", "4:3", "5:4", "1:1", "4:5", "3:4", "2:3", "9:16"] {
            let ratio: AspectRatio = s.parse().unwrap();
            assert_eq!(ratio.to_string(), s);
        }
    }

    #[test]
    fn aspect_ratio_rejects_unknown() {
        let err = "100:200".parse::<AspectRatio>().unwrap_err();
        assert!(err.contains("Unsupported aspect ratio"));
    }

    #[test]
    fn aspect_ratio_wire_format() {
        let wire = serde_json::to_string(&AspectRatio::Wide).unwrap();
        assert_eq!(wire, "\"16:9\"");
    }

    #[test]
    fn resolution_parsing() {
        assert_eq!("2K".parse::<Resolution>().unwrap(), Resolution::TwoK);
        assert_eq!("4k".parse::<Resolution>().unwrap(), Resolution::FourK);
        assert!("8K".parse::<Resolution>().is_err());
        let wire = serde_json::to_string(&Resolution::OneK).unwrap();
        assert_eq!(wire, "\"1K\"");
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("gif".parse::<OutputFormat>().is_err());
        let wire = serde_json::to_string(&OutputFormat::Webp).unwrap();
        assert_eq!(wire, "\"webp\"");
    }

    #[test]
    fn output_format_extension() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Webp.extension(), "webp");
    }

    #[test]
    fn count_bounds() {
        assert!(validate_count(1).is_ok());
        assert!(validate_count(4).is_ok());
        assert!(validate_count(0).is_err());
        assert!(validate_count(5).is_err());
    }

    #[test]
    fn credential_shape() {
        assert!(validate_credential("fal-abc123").is_ok());
        assert!(validate_credential("  ").is_err());
        assert!(validate_credential("sk-abc").unwrap_err().contains("fal-"));
    }
}
