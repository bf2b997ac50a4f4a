//! In-memory I/O (spec §6 `mem://HOST/PID/BUFFER_ID`).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::io::IoReader;
use crate::status::LOOPBACK_NODE;

/// Shared byte buffer; each reader gets its own cursor over a snapshot taken
/// at `open_reader` time, so a writer appending after a reader has started
/// does not change what that reader sees.
pub struct MemoryBackend {
    buffer: Arc<Mutex<Vec<u8>>>,
    uid: String,
}

impl MemoryBackend {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            uid: uid.into(),
        }
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.buffer.lock().extend_from_slice(data);
        Ok(data.len())
    }

    pub fn open_reader(&self) -> Result<Box<dyn IoReader>> {
        Ok(Box::new(MemoryReader {
            data: self.buffer.lock().clone(),
            cursor: 0,
        }))
    }

    pub fn exists(&self) -> bool {
        !self.buffer.lock().is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.lock().clear();
    }

    pub fn data_url(&self) -> String {
        format!("mem://{LOOPBACK_NODE}/{}/{}", std::process::id(), self.uid)
    }
}

struct MemoryReader {
    data: Vec<u8>,
    cursor: usize,
}

impl IoReader for MemoryReader {
    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let end = (self.cursor + n).min(self.data.len());
        let chunk = self.data[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(chunk)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_snapshot_at_open_time() {
        let mut backend = MemoryBackend::new("uid1");
        backend.write(b"abc").unwrap();
        let mut reader = backend.open_reader().unwrap();
        backend.write(b"def").unwrap();

        let mut all = Vec::new();
        loop {
            let chunk = reader.read(2).unwrap();
            if chunk.is_empty() {
                break;
            }
            all.extend_from_slice(&chunk);
        }
        assert_eq!(all, b"abc");
    }
}
