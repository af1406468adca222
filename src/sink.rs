// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Easy interface for getting sound to play using an aplay subprocess.

use std::io::{self, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::Duration;

use log::info;

use crate::config::Config;

const PLAYER_PROGRAM: &str = "aplay";

/// Pause between reaping a dead player and launching its replacement.
/// Sink deaths are rare device hiccups, so a flat backoff is enough.
const RESTART_BACKOFF: Duration = Duration::from_secs(1);

/// Owns the playback subprocess and the pipe carrying raw PCM to its stdin.
///
/// The stream is headerless interleaved S16_LE frames; the player consumes
/// at its own pace, so a full pipe blocks the writer rather than queueing
/// audio anywhere on our side.
pub struct AudioSink {
    program: String,
    device: String,
    sample_rate: u32,
    buffer_time_usec: u64,
    child: Child,
    stream: ChildStdin,
}

impl AudioSink {
    /// Launch the player. Failing to launch it here is fatal for the caller;
    /// without a sink there is nothing to do.
    pub fn start(config: &Config) -> io::Result<AudioSink> {
        let buffer_time_usec = (config.refresh_interval * 1_000_000.0) as u64;
        Self::spawn(
            PLAYER_PROGRAM,
            &config.audio_device,
            config.sample_rate,
            buffer_time_usec,
        )
    }

    fn spawn(
        program: &str,
        device: &str,
        sample_rate: u32,
        buffer_time_usec: u64,
    ) -> io::Result<AudioSink> {
        let mut child = Command::new(program)
            .args(player_args(device, sample_rate, buffer_time_usec))
            .stdin(Stdio::piped())
            .spawn()?;
        let stream = child.stdin.take().expect("Used stdin(Stdio::piped())");
        info!("started {} with pid {}", program, child.id());

        Ok(AudioSink {
            program: program.to_string(),
            device: device.to_string(),
            sample_rate,
            buffer_time_usec,
            child,
            stream,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Push one cycle's buffer into the player.
    ///
    /// An error means the player died; the caller decides whether to
    /// restart. SIGPIPE is ignored by the Rust runtime, so a dead player
    /// shows up here as a plain write error.
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    /// Kill the dead player, reap it, back off briefly and launch a
    /// replacement. The old pid and pipe are discarded wholesale.
    pub fn restart(&mut self) -> io::Result<()> {
        // kill fails when the child already exited, which is the common case
        let _ = self.child.kill();
        // reap before launching a replacement so the old player cannot
        // linger as a zombie
        self.child.wait()?;

        thread::sleep(RESTART_BACKOFF);

        *self = Self::spawn(
            &self.program,
            &self.device,
            self.sample_rate,
            self.buffer_time_usec,
        )?;
        Ok(())
    }
}

fn player_args(device: &str, sample_rate: u32, buffer_time_usec: u64) -> Vec<String> {
    vec![
        "--format".to_string(),
        "S16_LE".to_string(),
        "--rate".to_string(),
        sample_rate.to_string(),
        "--channels".to_string(),
        "2".to_string(),
        "--device".to_string(),
        device.to_string(),
        "--buffer-time".to_string(),
        buffer_time_usec.to_string(),
    ]
}
