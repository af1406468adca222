// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Reading the configuration file.
//!
//! The format is line oriented: top-level `key = value` settings, `#`
//! comments, and two indented sections opened by `left:` and `right:` that
//! calibrate one output channel each. See `example-config.conf` in the
//! repository root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use snafu::Snafu;

use crate::curve::CALIBRATION_POINTS;
use crate::metrics::Metric;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cannot read config file {:?}: {}", path, source))]
    Unreadable { path: PathBuf, source: io::Error },
    #[snafu(display("config file {:?}, line {}: unexpected indentation", path, line))]
    UnexpectedIndentation { path: PathBuf, line: usize },
    #[snafu(display("config file {:?}, line {}: invalid syntax", path, line))]
    InvalidSyntax { path: PathBuf, line: usize },
    #[snafu(display("config file {:?}, line {}: {}", path, line, message))]
    BadValue {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[snafu(display("config file {:?}, line {}: metric {:?} not found", path, line, name))]
    UnknownMetric {
        path: PathBuf,
        line: usize,
        name: String,
    },
    #[snafu(display("config file {:?} is missing {}", path, name))]
    MissingSetting { path: PathBuf, name: &'static str },
    #[snafu(display(
        "config file {:?}: sample_rate {} and refresh_interval {} make less than one sample per cycle",
        path,
        sample_rate,
        refresh_interval
    ))]
    DegenerateCadence {
        path: PathBuf,
        sample_rate: u32,
        refresh_interval: f64,
    },
}

/// Calibration for one output channel: the gain at every load decile and the
/// metric the channel follows.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub calibration: [f64; CALIBRATION_POINTS],
    pub metric: Metric,
}

/// The whole configuration, immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub audio_device: String,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Frequency of the output tone in Hz.
    pub frequency: u32,
    /// Seconds between refreshes of the gains and the audio buffer.
    pub refresh_interval: f64,
    /// Left and right channel, in that order.
    pub channels: [ChannelConfig; 2],
}

impl Config {
    /// How many samples per channel one refresh cycle produces.
    pub fn samples_per_cycle(&self) -> usize {
        (self.sample_rate as f64 * self.refresh_interval) as usize
    }
}

pub fn load(path: &Path) -> Result<Config, Error> {
    let text = fs::read_to_string(path).map_err(|source| Error::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse(path, &text)
}

#[derive(Default)]
struct ChannelDraft {
    calibration: Option<[f64; CALIBRATION_POINTS]>,
    metric: Option<Metric>,
}

fn parse(path: &Path, text: &str) -> Result<Config, Error> {
    let mut audio_device = None;
    let mut sample_rate = None;
    let mut frequency = None;
    let mut refresh_interval = None;
    let mut channels = [ChannelDraft::default(), ChannelDraft::default()];
    // Index of the channel section we are inside of, if any.
    let mut current: Option<usize> = None;

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let uncommented = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };

        let indented = uncommented.starts_with(|c: char| c.is_whitespace());
        let content = uncommented.trim();
        if content.is_empty() {
            continue;
        }

        if indented && current.is_none() {
            return Err(Error::UnexpectedIndentation {
                path: path.to_path_buf(),
                line,
            });
        }
        if !indented {
            // end of any indented section
            current = None;
            if content == "left:" {
                current = Some(0);
                continue;
            }
            if content == "right:" {
                current = Some(1);
                continue;
            }
        }

        let eq = match content.find('=') {
            Some(pos) => pos,
            None => {
                return Err(Error::InvalidSyntax {
                    path: path.to_path_buf(),
                    line,
                })
            }
        };
        let key = content[..eq].trim();
        let value = content[eq + 1..].trim();

        let bad_value = |message: String| Error::BadValue {
            path: path.to_path_buf(),
            line,
            message,
        };

        match (current, key) {
            (None, "audio_device") => {
                audio_device = Some(strip_quotes(value).to_string());
            }
            (None, "sample_rate") => {
                sample_rate = Some(parse_positive_int(value).map_err(bad_value)?);
            }
            (None, "frequency") => {
                frequency = Some(parse_positive_int(value).map_err(bad_value)?);
            }
            (None, "refresh_interval") => {
                refresh_interval = Some(parse_positive_float(value).map_err(bad_value)?);
            }
            (Some(channel), "calibration") => {
                channels[channel].calibration = Some(parse_calibration(value).map_err(bad_value)?);
            }
            (Some(channel), "metric") => {
                let name = strip_quotes(value);
                match Metric::from_name(name) {
                    Some(metric) => channels[channel].metric = Some(metric),
                    None => {
                        return Err(Error::UnknownMetric {
                            path: path.to_path_buf(),
                            line,
                            name: name.to_string(),
                        })
                    }
                }
            }
            _ => warn!(
                "config file contains an unknown setting {:?} on line {}",
                key, line
            ),
        }
    }

    let missing = |name: &'static str| Error::MissingSetting {
        path: path.to_path_buf(),
        name,
    };

    let audio_device = audio_device.ok_or_else(|| missing("audio_device"))?;
    let sample_rate = sample_rate.ok_or_else(|| missing("sample_rate"))?;
    let frequency = frequency.ok_or_else(|| missing("frequency"))?;
    let refresh_interval = refresh_interval.ok_or_else(|| missing("refresh_interval"))?;

    let mut done = Vec::with_capacity(2);
    for draft in channels.iter_mut() {
        done.push(ChannelConfig {
            calibration: draft.calibration.take().ok_or_else(|| missing("calibration"))?,
            metric: draft.metric.take().ok_or_else(|| missing("metric"))?,
        });
    }
    let right = done.pop().unwrap();
    let left = done.pop().unwrap();

    // One cycle must produce at least one sample, otherwise there is
    // nothing to stream.
    if (sample_rate as f64 * refresh_interval) < 1.0 {
        return Err(Error::DegenerateCadence {
            path: path.to_path_buf(),
            sample_rate,
            refresh_interval,
        });
    }

    Ok(Config {
        audio_device,
        sample_rate,
        frequency,
        refresh_interval,
        channels: [left, right],
    })
}

/// Remove one pair of surrounding double quotes, if present.
fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_positive_int(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a positive integer, got {:?}", value)),
    }
}

fn parse_positive_float(value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(x) if x > 0.0 && x.is_finite() => Ok(x),
        _ => Err(format!("expected a positive number, got {:?}", value)),
    }
}

/// Parse `[g0, g1, ..., g10]` with exactly one gain per load decile.
fn parse_calibration(value: &str) -> Result<[f64; CALIBRATION_POINTS], String> {
    let inner = value
        .strip_prefix('[')
        .ok_or_else(|| "list must start with '['".to_string())?;
    let inner = inner
        .strip_suffix(']')
        .ok_or_else(|| "list must end with ']'".to_string())?;

    let mut points = [0.0; CALIBRATION_POINTS];
    let mut count = 0;
    for item in inner.split(',') {
        if count == CALIBRATION_POINTS {
            return Err("list is too long".to_string());
        }
        let item = item.trim();
        points[count] = item
            .parse()
            .map_err(|_| format!("invalid number {:?}", item))?;
        count += 1;
    }
    if count < CALIBRATION_POINTS {
        return Err("list is too short".to_string());
    }
    Ok(points)
}
