//! Running checksum accumulated as a data node is written to (spec §4.3).
//!
//! CRC32C is preferred; the `checksum-crc32c` feature (on by default) picks
//! it, mirroring the original's `try: import crc32c / except: import
//! binascii.crc32` fallback. Disabling the feature falls back to CRC32
//! (IEEE), still accumulated incrementally.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumType {
    Crc32C,
    Crc32,
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChecksumType::Crc32C => "CRC_32C",
            ChecksumType::Crc32 => "CRC_32",
        };
        f.write_str(s)
    }
}

enum Inner {
    #[cfg(feature = "checksum-crc32c")]
    Crc32C(u32),
    #[cfg(not(feature = "checksum-crc32c"))]
    Crc32(crc32fast::Hasher),
}

/// Incrementally accumulated checksum over all bytes written so far.
pub struct RunningChecksum {
    inner: Inner,
}

impl RunningChecksum {
    /// Starts a new running checksum using whichever algorithm this build
    /// was compiled with.
    pub fn new() -> Self {
        #[cfg(feature = "checksum-crc32c")]
        {
            Self { inner: Inner::Crc32C(0) }
        }
        #[cfg(not(feature = "checksum-crc32c"))]
        {
            Self { inner: Inner::Crc32(crc32fast::Hasher::new()) }
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        match &mut self.inner {
            #[cfg(feature = "checksum-crc32c")]
            Inner::Crc32C(crc) => *crc = crc32c::crc32c_append(*crc, bytes),
            #[cfg(not(feature = "checksum-crc32c"))]
            Inner::Crc32(hasher) => hasher.update(bytes),
        }
    }

    pub fn value(&self) -> u32 {
        match &self.inner {
            #[cfg(feature = "checksum-crc32c")]
            Inner::Crc32C(crc) => *crc,
            #[cfg(not(feature = "checksum-crc32c"))]
            Inner::Crc32(hasher) => hasher.clone().finalize(),
        }
    }

    pub fn checksum_type(&self) -> ChecksumType {
        match &self.inner {
            #[cfg(feature = "checksum-crc32c")]
            Inner::Crc32C(_) => ChecksumType::Crc32C,
            #[cfg(not(feature = "checksum-crc32c"))]
            Inner::Crc32(_) => ChecksumType::Crc32,
        }
    }
}

impl Default for RunningChecksum {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_short_writes() {
        let mut running = RunningChecksum::new();
        running.update(b"hello");
        running.update(b"world");

        let mut whole = RunningChecksum::new();
        whole.update(b"helloworld");

        assert_eq!(running.value(), whole.value());
    }
}
