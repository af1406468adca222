// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The calibrated response curve mapping a load fraction to an output gain.

/// Number of calibration points per channel, one for each of the load
/// percentages 0%, 10%, ..., 100%.
pub const CALIBRATION_POINTS: usize = 11;

/// A piecewise-linear volume curve given by its gain at every full decile
/// of the load percentage.
///
/// ```
/// use loadtone::curve::GainCurve;
///
/// let curve = GainCurve::new([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.0, 60.0, 80.0, 100.0]);
/// assert_eq!(curve.gain_for(0.75), 55.0);
/// assert!((curve.gain_for(0.72) - 52.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GainCurve {
    calibration: [f64; CALIBRATION_POINTS],
}

impl GainCurve {
    pub fn new(calibration: [f64; CALIBRATION_POINTS]) -> Self {
        Self { calibration }
    }

    /// Interpolate the gain for a load fraction in `[0, 1]`.
    ///
    /// Metric sources guarantee the range; a fraction outside of it is a bug
    /// in the caller, not something this curve can make sense of.
    pub fn gain_for(&self, fraction: f64) -> f64 {
        let percentage = 100.0 * fraction;
        debug_assert!(
            (0.0..=100.0).contains(&percentage),
            "load fraction {} outside [0, 1]",
            fraction
        );

        // Pick the two surrounding calibration points (72% -> 70% and 80%).
        // 100% reuses the 90%-100% bracket, there is no 100%-110% bracket.
        let index = ((percentage / 10.0) as usize).min(CALIBRATION_POINTS - 2);

        linear_map(
            10.0 * index as f64,
            10.0 * (index + 1) as f64,
            self.calibration[index],
            self.calibration[index + 1],
            percentage,
        )
    }
}

/// Map `value` from the range `[in_start, in_end]` onto `[out_start, out_end]`
/// with the two-point line equation.
fn linear_map(in_start: f64, in_end: f64, out_start: f64, out_end: f64, value: f64) -> f64 {
    let slope = (out_end - out_start) / (in_end - in_start);
    out_start + slope * (value - in_start)
}
