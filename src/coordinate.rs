//! Free-form coordinate text → signed decimal degrees
//!
//! Metadata backends disagree on how they render a coordinate: plain decimal
//! (`48.8584`), decimal with a hemisphere letter (`45.0S`), or
//! degrees-minutes-seconds (`40° 26' 46.8"`, ExifTool's `40 deg 26' 46.80" N`).
//! [`parse_coordinate`] accepts all of them and returns `None` for anything
//! else so that one malformed field never aborts an analysis.

use regex::Regex;
use std::sync::LazyLock;

/// `<deg><sep><min>'<sec>"`, separator being a degree sign variant or `deg`
static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(\d+(?:\.\d+)?)\s*(?:°|º|˚|deg)\s*(\d+(?:\.\d+)?)\s*'\s*(\d+(?:\.\d+)?)\s*"\s*$"#,
    )
    .expect("DMS pattern compiles")
});

/// Hemisphere suffix of a coordinate string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    fn from_suffix(c: char) -> Option<Self> {
        match c {
            'N' => Some(Self::North),
            'S' => Some(Self::South),
            'E' => Some(Self::East),
            'W' => Some(Self::West),
            _ => None,
        }
    }

    /// South and West are negative
    pub fn sign(self) -> f64 {
        match self {
            Self::South | Self::West => -1.0,
            Self::North | Self::East => 1.0,
        }
    }
}

/// Parse a coordinate string into signed decimal degrees.
///
/// The hemisphere letter is only recognized as the final character and is
/// case-sensitive. Decimal parsing is tried before the DMS grammar.
pub fn parse_coordinate(text: &str) -> Option<f64> {
    let mut body = text.trim();
    let mut hemisphere = None;

    if let Some(last) = body.chars().last() {
        if let Some(h) = Hemisphere::from_suffix(last) {
            hemisphere = Some(h);
            body = &body[..body.len() - last.len_utf8()];
        }
    }

    let magnitude = match body.trim().parse::<f64>() {
        Ok(value) => value,
        Err(_) => parse_dms(body)?,
    };

    if !magnitude.is_finite() {
        return None;
    }

    Some(hemisphere.map_or(magnitude, |h| magnitude * h.sign()))
}

/// Degrees-minutes-seconds text → unsigned decimal degrees
fn parse_dms(text: &str) -> Option<f64> {
    let caps = DMS_PATTERN.captures(text)?;
    let degrees: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;

    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}
