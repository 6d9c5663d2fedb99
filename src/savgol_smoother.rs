/// Fraction of the retained row count used as the smoothing window length.
/// The window scales with sample density instead of a fixed time constant.
pub const WINDOW_FRACTION: f64 = 0.0455;

/// Smallest usable window: a degree-2 fit needs at least 3 samples, and the
/// window must be odd to have a center.
pub const MIN_WINDOW: usize = 3;

/// Window length for a series of `row_count` samples: `floor(0.0455 * n)`,
/// bumped to the next odd number, never below [`MIN_WINDOW`]. With
/// `row_count >= 3` the result never exceeds `row_count`.
pub fn smoothing_window(row_count: usize) -> usize {
    let mut window = (WINDOW_FRACTION * row_count as f64).floor() as usize;
    if window % 2 == 0 {
        window += 1;
    }
    window.max(MIN_WINDOW)
}

/// Savitzky-Golay smoothing: a centered least-squares quadratic fit over a
/// sliding window, evaluated at the window center. The first and last
/// `window / 2` points are taken from a single quadratic fitted to the first
/// (respectively last) `window` samples, so the edges interpolate instead of
/// shrinking the window.
///
/// `window` must be odd, at least [`MIN_WINDOW`] and no longer than `data`.
/// Linear and quadratic series are reproduced exactly.
pub fn savgol_smooth(data: &[f64], window: usize) -> Vec<f64> {
    debug_assert!(window % 2 == 1 && window >= MIN_WINDOW && window <= data.len());

    let n = data.len();
    let half = window / 2;
    let mut smoothed = vec![0.0; n];

    for i in half..n - half {
        let fit = QuadraticFit::over(&data[i - half..=i + half]);
        smoothed[i] = fit.eval_center();
    }

    let head = QuadraticFit::over(&data[..window]);
    for (i, slot) in smoothed.iter_mut().enumerate().take(half) {
        *slot = head.eval_offset(i);
    }
    let tail = QuadraticFit::over(&data[n - window..]);
    for (i, slot) in smoothed.iter_mut().enumerate().skip(n - half) {
        *slot = tail.eval_offset(i - (n - window));
    }

    smoothed
}

/// Least-squares fit of `y = a0 + a1*x + a2*x^2` over one odd-length window,
/// with x measured from the window center. Centered offsets zero out the odd
/// moment sums, so the normal equations collapse to a 2x2 system.
struct QuadraticFit {
    a0: f64,
    a1: f64,
    a2: f64,
    half: usize,
}

impl QuadraticFit {
    fn over(ys: &[f64]) -> Self {
        let half = ys.len() / 2;
        let mut s0 = 0.0;
        let mut s2 = 0.0;
        let mut s4 = 0.0;
        let mut t0 = 0.0;
        let mut t1 = 0.0;
        let mut t2 = 0.0;

        for (i, &y) in ys.iter().enumerate() {
            let x = i as f64 - half as f64;
            let x2 = x * x;
            s0 += 1.0;
            s2 += x2;
            s4 += x2 * x2;
            t0 += y;
            t1 += x * y;
            t2 += x2 * y;
        }

        let det = s0 * s4 - s2 * s2;
        Self {
            a0: (s4 * t0 - s2 * t2) / det,
            a1: t1 / s2,
            a2: (s0 * t2 - s2 * t0) / det,
            half,
        }
    }

    fn eval_center(&self) -> f64 {
        self.a0
    }

    /// Value of the fitted polynomial at position `offset` within the window
    /// (0 is the window's first sample).
    fn eval_offset(&self, offset: usize) -> f64 {
        let x = offset as f64 - self.half as f64;
        self.a0 + self.a1 * x + self.a2 * x * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_scales_with_row_count() {
        assert_eq!(smoothing_window(9), 3); // floor(0.41) = 0, clamped
        assert_eq!(smoothing_window(66), 3); // floor(3.00) = 3, already odd
        assert_eq!(smoothing_window(100), 5); // floor(4.55) = 4, bumped odd
        assert_eq!(smoothing_window(200), 9); // floor(9.1) = 9
        assert_eq!(smoothing_window(1000), 45);
    }

    #[test]
    fn window_is_always_odd_and_at_least_three() {
        for n in 3..500 {
            let w = smoothing_window(n);
            assert_eq!(w % 2, 1, "even window for n={n}");
            assert!(w >= MIN_WINDOW);
            assert!(w <= n, "window {w} longer than series {n}");
        }
    }

    #[test]
    fn constant_series_is_unchanged() {
        let data = vec![42.0; 20];
        let smoothed = savgol_smooth(&data, 5);
        assert_eq!(smoothed.len(), data.len());
        for &v in &smoothed {
            assert!((v - 42.0).abs() < 1e-9);
        }
    }

    #[test]
    fn linear_series_is_reproduced_exactly() {
        let data: Vec<f64> = (0..30).map(|i| 3.0 + 0.5 * i as f64).collect();
        let smoothed = savgol_smooth(&data, 7);
        for (raw, sm) in data.iter().zip(&smoothed) {
            assert!((raw - sm).abs() < 1e-9, "{raw} vs {sm}");
        }
    }

    #[test]
    fn quadratic_series_is_reproduced_exactly() {
        let data: Vec<f64> = (0..25).map(|i| 0.25 * (i * i) as f64 - 2.0 * i as f64).collect();
        let smoothed = savgol_smooth(&data, 5);
        for (raw, sm) in data.iter().zip(&smoothed) {
            assert!((raw - sm).abs() < 1e-8, "{raw} vs {sm}");
        }
    }

    #[test]
    fn window_five_center_matches_known_kernel() {
        // Quadratic kernel for window 5 is (-3, 12, 17, 12, -3) / 35; a unit
        // impulse at the center therefore smooths to 17/35 there.
        let data = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let smoothed = savgol_smooth(&data, 5);
        assert!((smoothed[3] - 17.0 / 35.0).abs() < 1e-9);
        assert!((smoothed[2] - 12.0 / 35.0).abs() < 1e-9);
        assert!((smoothed[4] - 12.0 / 35.0).abs() < 1e-9);
    }

    #[test]
    fn spike_is_damped() {
        let mut data = vec![100.0; 15];
        data[7] = 160.0;
        let smoothed = savgol_smooth(&data, 5);
        assert!(smoothed[7] < 140.0);
        assert!(smoothed[7] > 100.0);
    }

    #[test]
    fn minimum_window_on_three_samples() {
        let smoothed = savgol_smooth(&[100.0, 105.0, 110.0], 3);
        // A quadratic through three points is exact.
        assert!((smoothed[0] - 100.0).abs() < 1e-9);
        assert!((smoothed[1] - 105.0).abs() < 1e-9);
        assert!((smoothed[2] - 110.0).abs() < 1e-9);
    }
}
