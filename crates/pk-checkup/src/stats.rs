//! Load indicator text and colour for the parking subsystem.

/// 8-bit RGB colour.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GREEN:  Rgb = Rgb { r: 0, g: 255, b: 0 };
    pub const YELLOW: Rgb = Rgb { r: 255, g: 255, b: 0 };
    pub const RED:    Rgb = Rgb { r: 255, g: 0, b: 0 };

    /// Linear blend; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb { r: mix(self.r, other.r), g: mix(self.g, other.g), b: mix(self.b, other.b) }
    }
}

/// Below this many of both counters the indicator fades green to yellow.
pub const LOW_LOAD: usize = 1000;
/// Below this many of both counters the indicator fades yellow to red.
pub const HIGH_LOAD: usize = 2500;

/// `"{pathfinds} pathfinds; {checkups} parking checkups"`.
pub fn stats_label(pathfinds: usize, checkups: usize) -> String {
    format!("{pathfinds} pathfinds; {checkups} parking checkups")
}

/// Indicator colour for the given pending path-finds and queued checkups.
///
/// The blend factor follows the path-find count alone; the checkup count
/// only decides which band applies.
pub fn load_color(pathfinds: usize, checkups: usize) -> Rgb {
    if pathfinds < LOW_LOAD && checkups < LOW_LOAD {
        Rgb::GREEN.lerp(Rgb::YELLOW, pathfinds as f32 / LOW_LOAD as f32)
    } else if pathfinds < HIGH_LOAD && checkups < HIGH_LOAD {
        let t = pathfinds.saturating_sub(LOW_LOAD) as f32 / (HIGH_LOAD - LOW_LOAD) as f32;
        Rgb::YELLOW.lerp(Rgb::RED, t)
    } else {
        Rgb::RED
    }
}
