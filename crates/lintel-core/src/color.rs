use std::fmt;

use anyhow::anyhow;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const BLACK: Rgb = Rgb { r: 0x00, g: 0x00, b: 0x00 };
pub const WHITE: Rgb = Rgb { r: 0xff, g: 0xff, b: 0xff };

// Badge color for users without a stored one, and the fixed weekend cell color.
pub const DEFAULT_USER_COLOR: Rgb = Rgb { r: 0x34, g: 0x98, b: 0xdb };
pub const WEEKEND_COLOR: Rgb = Rgb { r: 0x4c, g: 0xaf, b: 0x50 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let re = Regex::new(r"^#?(?P<hex>[0-9a-fA-F]{6})$")
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
        let caps = re
            .captures(raw.trim())
            .ok_or_else(|| anyhow!("invalid color string: {raw:?} (expected #RRGGBB)"))?;
        let hex = caps
            .name("hex")
            .ok_or_else(|| anyhow!("invalid color string: {raw:?}"))?
            .as_str();

        let byte_at = |pos: usize| -> anyhow::Result<u8> {
            u8::from_str_radix(&hex[pos..pos + 2], 16)
                .map_err(|e| anyhow!("invalid color component in {raw:?}: {e}"))
        };

        Ok(Self {
            r: byte_at(0)?,
            g: byte_at(2)?,
            b: byte_at(4)?,
        })
    }

    // ITU-R BT.601 luma, scaled by 1000.
    fn luma_milli(self) -> u32 {
        299 * u32::from(self.r) + 587 * u32::from(self.g) + 114 * u32::from(self.b)
    }

    #[must_use]
    pub fn contrast_text(self) -> Rgb {
        if self.luma_milli() > 128_000 { BLACK } else { WHITE }
    }
}

pub fn contrast_text_color(raw: &str) -> anyhow::Result<&'static str> {
    let rgb = Rgb::parse(raw)?;
    Ok(if rgb.contrast_text() == BLACK {
        "#000000"
    } else {
        "#ffffff"
    })
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Rgb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Rgb {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Rgb::parse(&raw).map_err(serde::de::Error::custom)
    }
}
