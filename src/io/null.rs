//! Discard-everything I/O (spec §6 `null://`), used for drops whose output
//! is never read back.

use crate::error::Result;
use crate::io::IoReader;

#[derive(Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn open_reader(&self) -> Result<Box<dyn IoReader>> {
        Ok(Box::new(NullReader))
    }
}

struct NullReader;

impl IoReader for NullReader {
    fn read(&mut self, _n: usize) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
