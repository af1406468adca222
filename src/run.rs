// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The refresh loop tying metrics, curves, synthesis and the sink together.

use std::io;
use std::time::Duration;

use log::{info, warn};

use crate::config::{ChannelConfig, Config};
use crate::curve::GainCurve;
use crate::metrics::MetricSource;
use crate::schedule::Scheduler;
use crate::sink::AudioSink;
use crate::synth::ToneSynth;
use crate::wave::{PcmBuffer, Stereo};

/// One output channel: the calibrated curve and the live metric it follows.
struct Channel {
    curve: GainCurve,
    metric: Box<dyn MetricSource>,
}

impl Channel {
    fn new(config: &ChannelConfig) -> Self {
        Channel {
            curve: GainCurve::new(config.calibration),
            // resolved once here; never re-resolved inside the loop
            metric: config.metric.source(),
        }
    }

    /// Sample the metric and run it through the calibration curve.
    /// Metrics are intentionally not cached across cycles.
    fn current_gain(&mut self) -> f64 {
        self.curve.gain_for(self.metric.sample())
    }
}

/// Run the refresh loop until the process is terminated.
///
/// Every cycle synthesizes one buffer from freshly sampled metrics, pushes
/// it to the player and waits out the rest of the interval. A dead player is
/// restarted and the failed cycle's audio dropped; everything else that goes
/// wrong here is fatal.
pub fn run(config: &Config) -> io::Result<()> {
    let [left, right] = &config.channels;
    let mut left = Channel::new(left);
    let mut right = Channel::new(right);

    let synth = ToneSynth::new(config.sample_rate, config.frequency);
    let mut buffer = PcmBuffer::new(config.samples_per_cycle());
    let mut bytes = vec![0u8; buffer.byte_len()];

    info!(
        "playing a {} Hz tone at {} Hz on {:?}, refreshing every {} seconds",
        config.frequency, config.sample_rate, config.audio_device, config.refresh_interval
    );

    let mut sink = AudioSink::start(config)?;
    let mut scheduler = Scheduler::new(Duration::from_secs_f64(config.refresh_interval));

    loop {
        let gains = Stereo::new(left.current_gain(), right.current_gain());
        synth.fill(gains, &mut buffer);
        buffer.copy_bytes_to(&mut bytes);

        if sink.write(&bytes).is_err() {
            warn!("there seems to be a problem with the player, restarting in 1 second");
            sink.restart()?;
        }

        scheduler.advance_and_wait();
    }
}
