//! Colormaps and value normalization.
//!
//! Sequential, matplotlib-inspired colormaps sampled by normalized
//! position, shared by the static raster renderer and the web map legend.

use std::fmt;
use std::str::FromStr;

/// An 8-bit RGB triple.
pub type Rgb = [u8; 3];

/// A named sequential colormap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    #[default]
    Viridis,
    Plasma,
    YlOrRd,
    Blues,
}

impl Colormap {
    /// Anchor stops as (position, color), ascending in position.
    fn stops(&self) -> &'static [(f64, Rgb)] {
        match self {
            Colormap::Viridis => &[
                (0.0, [68, 1, 84]),
                (0.125, [71, 44, 122]),
                (0.25, [59, 81, 139]),
                (0.375, [44, 113, 142]),
                (0.5, [33, 144, 141]),
                (0.625, [39, 173, 129]),
                (0.75, [92, 200, 99]),
                (0.875, [170, 220, 50]),
                (1.0, [253, 231, 37]),
            ],
            Colormap::Plasma => &[
                (0.0, [13, 8, 135]),
                (0.2, [126, 3, 168]),
                (0.4, [204, 71, 120]),
                (0.6, [248, 149, 64]),
                (0.8, [252, 206, 37]),
                (1.0, [240, 249, 33]),
            ],
            Colormap::YlOrRd => &[
                (0.0, [255, 255, 204]),
                (0.2, [254, 217, 118]),
                (0.4, [254, 178, 76]),
                (0.6, [253, 141, 60]),
                (0.8, [240, 59, 32]),
                (1.0, [189, 0, 38]),
            ],
            Colormap::Blues => &[
                (0.0, [247, 251, 255]),
                (0.25, [198, 219, 239]),
                (0.5, [107, 174, 214]),
                (0.75, [33, 113, 181]),
                (1.0, [8, 48, 107]),
            ],
        }
    }

    /// Sample the colormap at normalized position `t` (clamped to [0, 1]).
    pub fn sample(&self, t: f64) -> Rgb {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };

        let mut upper = 1;
        while upper < stops.len() - 1 && stops[upper].0 < t {
            upper += 1;
        }
        let (t0, c0) = stops[upper - 1];
        let (t1, c1) = stops[upper];

        let span = t1 - t0;
        let local = if span > 0.0 { (t - t0) / span } else { 0.0 };
        [
            lerp_channel(c0[0], c1[0], local),
            lerp_channel(c0[1], c1[1], local),
            lerp_channel(c0[2], c1[2], local),
        ]
    }

    /// All map names accepted by [`FromStr`].
    pub fn names() -> &'static [&'static str] {
        &["viridis", "plasma", "ylorrd", "blues"]
    }
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
            Colormap::YlOrRd => "ylorrd",
            Colormap::Blues => "blues",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "viridis" => Ok(Colormap::Viridis),
            "plasma" => Ok(Colormap::Plasma),
            "ylorrd" | "yl_or_rd" => Ok(Colormap::YlOrRd),
            "blues" => Ok(Colormap::Blues),
            other => Err(format!(
                "unknown colormap `{}` (expected one of: {})",
                other,
                Colormap::names().join(", ")
            )),
        }
    }
}

/// Maps a value range onto [0, 1] with clamping at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    /// A normalizer over an explicit range. A reversed range is swapped.
    pub fn new(vmin: f64, vmax: f64) -> Self {
        if vmax < vmin {
            Self {
                vmin: vmax,
                vmax: vmin,
            }
        } else {
            Self { vmin, vmax }
        }
    }

    /// A normalizer spanning the finite values of an iterator; `None` when
    /// the iterator holds no finite value.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut vmin = f64::INFINITY;
        let mut vmax = f64::NEG_INFINITY;
        for v in values {
            if v.is_finite() {
                vmin = vmin.min(v);
                vmax = vmax.max(v);
            }
        }
        if vmin <= vmax {
            Some(Self { vmin, vmax })
        } else {
            None
        }
    }

    /// Position of `value` in [0, 1]. Values outside the range clamp to the
    /// nearest end; a degenerate range maps everything to the middle.
    pub fn position(&self, value: f64) -> f64 {
        let span = self.vmax - self.vmin;
        if span <= 0.0 {
            return 0.5;
        }
        ((value - self.vmin) / span).clamp(0.0, 1.0)
    }
}

/// Parse a `#rrggbb` hex color.
pub fn parse_hex_color(s: &str) -> Result<Rgb, String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color `{s}` (expected #rrggbb)"));
    }
    let channel = |range| u8::from_str_radix(&hex[range], 16).map_err(|e| e.to_string());
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

/// Format an RGB triple as `#rrggbb`.
pub fn to_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_endpoints() {
        assert_eq!(Colormap::Viridis.sample(0.0), [68, 1, 84]);
        assert_eq!(Colormap::Viridis.sample(1.0), [253, 231, 37]);
        assert_eq!(Colormap::Blues.sample(0.0), [247, 251, 255]);
    }

    #[test]
    fn test_sample_clamps_out_of_range() {
        assert_eq!(
            Colormap::Viridis.sample(-4.0),
            Colormap::Viridis.sample(0.0)
        );
        assert_eq!(Colormap::Viridis.sample(9.0), Colormap::Viridis.sample(1.0));
        assert_eq!(
            Colormap::Viridis.sample(f64::NAN),
            Colormap::Viridis.sample(0.0)
        );
    }

    #[test]
    fn test_sample_interpolates_between_stops() {
        // Halfway between the first two viridis stops.
        let mid = Colormap::Viridis.sample(0.0625);
        assert_eq!(mid, [70, 23, 103]);
    }

    #[test]
    fn test_colormap_from_str() {
        assert_eq!("Viridis".parse::<Colormap>().unwrap(), Colormap::Viridis);
        assert_eq!("ylorrd".parse::<Colormap>().unwrap(), Colormap::YlOrRd);
        assert!("magma".parse::<Colormap>().is_err());
    }

    #[test]
    fn test_normalize_positions() {
        let norm = Normalize::new(0.0, 200.0);
        assert_eq!(norm.position(0.0), 0.0);
        assert_eq!(norm.position(100.0), 0.5);
        assert_eq!(norm.position(200.0), 1.0);
        // Clamped at both ends.
        assert_eq!(norm.position(-50.0), 0.0);
        assert_eq!(norm.position(900.0), 1.0);
    }

    #[test]
    fn test_normalize_reversed_and_degenerate() {
        let swapped = Normalize::new(10.0, 2.0);
        assert_eq!(swapped.vmin, 2.0);
        assert_eq!(swapped.vmax, 10.0);

        let flat = Normalize::new(5.0, 5.0);
        assert_eq!(flat.position(5.0), 0.5);
    }

    #[test]
    fn test_normalize_from_values() {
        let norm = Normalize::from_values([3.0, f64::NAN, -1.0, 7.0]).unwrap();
        assert_eq!(norm.vmin, -1.0);
        assert_eq!(norm.vmax, 7.0);
        assert!(Normalize::from_values(std::iter::empty()).is_none());
    }

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(parse_hex_color("#2b8cbe").unwrap(), [0x2b, 0x8c, 0xbe]);
        assert_eq!(parse_hex_color("ff0000").unwrap(), [255, 0, 0]);
        assert!(parse_hex_color("#abc").is_err());
        assert_eq!(to_hex([0x2b, 0x8c, 0xbe]), "#2b8cbe");
    }
}
