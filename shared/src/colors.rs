use crate::plot::TOTAL_PLOTS;

const BADGE_SATURATION: f64 = 0.7;
const BADGE_LIGHTNESS: f64 = 0.6;

/// Badge hue for a priority or assignment score: 120 (green) for 1 down to 0 (red) for
/// [`TOTAL_PLOTS`]. Values outside the range are clamped.
pub fn priority_hue(value: u32) -> f64 {
    let clamped = value.clamp(1, TOTAL_PLOTS);
    120.0 - ((clamped - 1) as f64 / (TOTAL_PLOTS - 1) as f64) * 120.0
}

/// Badge color for a priority or assignment score as RGB bytes.
pub fn priority_color(value: u32) -> (u8, u8, u8) {
    hsl_to_rgb(priority_hue(value), BADGE_SATURATION, BADGE_LIGHTNESS)
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
