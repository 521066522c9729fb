//! Sensor/LED color palette and RGB helpers

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Indexed color used by the hub LED and reported by the color sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Pink = 1,
    Purple = 2,
    Blue = 3,
    LightBlue = 4,
    Cyan = 5,
    Green = 6,
    Yellow = 7,
    Orange = 8,
    Red = 9,
    White = 10,
    /// No color detected
    None = 255,
}

const COLOR_NAMES: [(Color, &str); 12] = [
    (Color::Black, "black"),
    (Color::Pink, "pink"),
    (Color::Purple, "purple"),
    (Color::Blue, "blue"),
    (Color::LightBlue, "lightblue"),
    (Color::Cyan, "cyan"),
    (Color::Green, "green"),
    (Color::Yellow, "yellow"),
    (Color::Orange, "orange"),
    (Color::Red, "red"),
    (Color::White, "white"),
    (Color::None, "none"),
];

impl Color {
    /// Decode a raw sensor byte; anything outside the palette means "no color"
    pub fn from_raw(raw: u8) -> Self {
        COLOR_NAMES
            .iter()
            .map(|(c, _)| *c)
            .find(|c| *c as u8 == raw)
            .unwrap_or(Color::None)
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        COLOR_NAMES
            .iter()
            .find(|(c, _)| c == self)
            .map(|(_, name)| *name)
            .unwrap_or("none")
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        COLOR_NAMES
            .iter()
            .find(|(_, name)| *name == lower)
            .map(|(c, _)| *c)
            .ok_or_else(|| format!("Unknown color: {}", s))
    }
}

/// RGB color value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create color from HSV values
    ///
    /// Hue in degrees (wrapped into `[0, 360)`), saturation and value in `[0, 1]`.
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let h = h.rem_euclid(360.0);
        let s = s.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match (h / 60.0) as i32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let to_byte = |channel: f64| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self {
            r: to_byte(r),
            g: to_byte(g),
            b: to_byte(b),
        }
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);
}
