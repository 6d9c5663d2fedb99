/// Number of discrete steps in the altitude gradient.
const GRADIENT_STEPS: usize = 256;

/// Hex color for one smoothed altitude value against the global raw-altitude
/// range. The value is mapped linearly onto `[0, 255]`, clamped at both ends
/// (smoothing can push values slightly past the raw min/max), and the
/// resulting index picks from the 256-step magma gradient.
pub fn altitude_hex(smoothed_altitude: f64, altitude_min: f64, altitude_max: f64) -> String {
    let index = gradient_index(smoothed_altitude, altitude_min, altitude_max);
    let color = colorous::MAGMA.eval_rational(index, GRADIENT_STEPS);
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn gradient_index(value: f64, min: f64, max: f64) -> usize {
    let span = max - min;
    if span <= 0.0 {
        // Degenerate range (flat route): pin everything to the low end.
        return 0;
    }
    let scaled = (value - min) / span * 255.0;
    scaled.clamp(0.0, 255.0) as usize
}
