// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Sample frames and the PCM buffer that is pushed to the playback sink.

/// Convenience type for making things stereo, e.g. individual samples
/// or per-channel gains.
///
/// ```
/// use loadtone::wave::*;
///
/// let frame = Stereo::new(1i16, -1i16);
/// assert_eq!(frame.left, 1);
/// assert_eq!(Stereo::mono(0.5f64).right, 0.5);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stereo<T> {
    pub left: T,
    pub right: T,
}

impl<T> Stereo<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn mono(mono: T) -> Self
    where
        T: Copy,
    {
        Self::new(mono, mono)
    }
}

/// A buffer holding one refresh cycle of interleaved signed 16-bit PCM.
///
/// The buffer is allocated once and overwritten every cycle; nothing else
/// aliases it.
#[allow(clippy::len_without_is_empty)]
pub struct PcmBuffer {
    samples: Vec<Stereo<i16>>,
}

impl PcmBuffer {
    pub fn new(sample_count: usize) -> Self {
        Self {
            samples: vec![Stereo::new(0, 0); sample_count],
        }
    }

    /// Size of the buffer in samples per channel.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Size of the buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * 2 * std::mem::size_of::<i16>()
    }

    pub fn samples(&self) -> &[Stereo<i16>] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [Stereo<i16>] {
        &mut self.samples
    }

    /// Copy the stereo `i16` samples to bytes, interleaving the left and
    /// right samples into little-endian 4-byte frames.
    ///
    /// Could probably be implemented with some sort of unsafe transmute,
    /// but copying is safe and likely not the bottleneck.
    ///
    /// Returns the number of samples that were actually copied.
    /// Might be less than the number of input samples if the output buffer
    /// was not large enough.
    pub fn copy_bytes_to(&self, bytes: &mut [u8]) -> usize {
        let mut processed = 0;
        for (sample, target) in self.samples.iter().zip(bytes.chunks_exact_mut(4)) {
            target[0..2].copy_from_slice(&sample.left.to_le_bytes());
            target[2..4].copy_from_slice(&sample.right.to_le_bytes());
            processed += 1;
        }
        processed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes_are_interleaved_little_endian() {
        let mut buffer = PcmBuffer::new(2);
        buffer.samples_mut()[0] = Stereo::new(0x0102, 0x0304);
        buffer.samples_mut()[1] = Stereo::new(-1, 0);

        let mut bytes = vec![0u8; buffer.byte_len()];
        let processed = buffer.copy_bytes_to(&mut bytes);
        assert_eq!(processed, 2);
        assert_eq!(bytes, [0x02, 0x01, 0x04, 0x03, 0xff, 0xff, 0x00, 0x00]);
    }

    #[test]
    fn short_output_copies_what_fits() {
        let buffer = PcmBuffer::new(4);
        let mut bytes = vec![0u8; 4];
        assert_eq!(buffer.copy_bytes_to(&mut bytes), 1);
    }
}
