// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Renders one refresh cycle of the output tone into a PCM buffer.

use std::f64::consts::PI;

use crate::wave::{PcmBuffer, Stereo};

/// Generates a fixed-frequency sine tone, scaled per channel by the gains of
/// the current cycle.
///
/// The phase restarts from sample zero every cycle, so consecutive cycles are
/// acoustically independent. The discontinuity at the buffer boundary can
/// produce a tiny click; carrying phase across cycles is intentionally not
/// done here.
#[derive(Debug, Clone, Copy)]
pub struct ToneSynth {
    sample_rate: u32,
    frequency: u32,
}

impl ToneSynth {
    pub fn new(sample_rate: u32, frequency: u32) -> Self {
        Self {
            sample_rate,
            frequency,
        }
    }

    /// Overwrite the whole buffer with one cycle of the tone.
    pub fn fill(&self, gains: Stereo<f64>, buffer: &mut PcmBuffer) {
        for (i, frame) in buffer.samples_mut().iter_mut().enumerate() {
            // f64 time keeps the phase exact even late in the buffer
            let time = i as f64 / self.sample_rate as f64;
            let wave = (2.0 * PI * self.frequency as f64 * time).sin();
            *frame = Stereo::new(quantize(gains.left * wave), quantize(gains.right * wave));
        }
    }
}

/// Quantize an amplitude in `[-1, 1]` to a signed 16-bit sample.
///
/// An amplitude outside that range means the calibration produced a gain the
/// sink cannot represent; that is a miscalibration upstream, not something to
/// clamp silently.
fn quantize(amplitude: f64) -> i16 {
    debug_assert!(
        (-1.0..=1.0).contains(&amplitude),
        "amplitude {} outside [-1, 1]",
        amplitude
    );
    (f64::from(i16::MAX) * amplitude) as i16
}
