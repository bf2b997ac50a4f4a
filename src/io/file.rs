//! Filesystem-backed I/O (spec §6 `file://HOST/ABSOLUTE_PATH`).

use std::fs::{self, File};
use std::io::{Read as _, Write as _};
use std::path::PathBuf;

use crate::error::Result;
use crate::io::IoReader;
use crate::status::LOOPBACK_NODE;

/// Path is `dirname/oid___uid`, matching the original's path-join convention.
pub struct FileBackend {
    path: PathBuf,
    writer: Option<File>,
}

impl FileBackend {
    pub fn new(dirname: impl Into<PathBuf>, oid: &str, uid: &str) -> Self {
        let mut path = dirname.into();
        path.push(format!("{oid}___{uid}"));
        Self { path, writer: None }
    }

    pub fn open_writer(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.writer = Some(File::create(&self.path)?);
        Ok(())
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let file = self.writer.get_or_insert_with(|| {
            File::create(&self.path).expect("path already validated by open_writer")
        });
        file.write_all(data)?;
        Ok(data.len())
    }

    pub fn close_writer(&mut self) -> Result<()> {
        if let Some(mut file) = self.writer.take() {
            file.flush()?;
        }
        Ok(())
    }

    pub fn open_reader(&self) -> Result<Box<dyn IoReader>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(FileReader { file }))
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.path.exists())
    }

    pub fn delete(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn data_url(&self) -> String {
        format!("file://{LOOPBACK_NODE}{}", self.path.display())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

struct FileReader {
    file: File,
}

impl IoReader for FileReader {
    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let read = self.file.read(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_filesystem() {
        let dir = std::env::temp_dir().join(format!("flowdrop-test-{}", uuid::Uuid::new_v4()));
        let mut backend = FileBackend::new(&dir, "oid1", "uid1");
        backend.open_writer().unwrap();
        backend.write(b"hello").unwrap();
        backend.close_writer().unwrap();
        assert!(backend.exists().unwrap());

        let mut reader = backend.open_reader().unwrap();
        let mut all = Vec::new();
        loop {
            let chunk = reader.read(4).unwrap();
            if chunk.is_empty() {
                break;
            }
            all.extend_from_slice(&chunk);
        }
        assert_eq!(all, b"hello");

        backend.delete().unwrap();
        assert!(!backend.exists().unwrap());
        let _ = fs::remove_dir_all(&dir);
    }
}
