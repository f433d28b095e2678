use image::Rgb;

/// A piecewise-linear colour map over `[0, 1]`, one ramp per channel. Each ramp rises from 0 at
/// `start` to 255 at `end` and saturates after that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    ramps: [(f32, f32); 3],
}

impl Palette {
    /// The classic "hot" map: black through red and yellow to white.
    pub fn hot() -> Self {
        Palette {
            ramps: [(0.0, 0.375), (0.375, 0.75), (0.75, 1.0)],
        }
    }

    /// Colour for a normalised value. Inputs outside `[0, 1]` (or NaN) are clamped.
    pub fn color(&self, t: f32) -> Rgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mut rgb = [0u8; 3];
        for (channel, &(start, end)) in rgb.iter_mut().zip(self.ramps.iter()) {
            let level = ((t - start) / (end - start)).clamp(0.0, 1.0);
            *channel = (level * 255.0).round() as u8;
        }
        Rgb(rgb)
    }
}
