//! I/O capability interface (spec §4.2, §6).
//!
//! A closed set of backend variants rather than a trait-object hierarchy,
//! per the Design Notes' "dynamic dispatch over storage back-ends" guidance:
//! [`IoHandle`] is an enum, and data-node subclasses differ only in which
//! variant they construct. Readers opened via [`IoHandle::open_reader`] are
//! independent per call, so concurrent reads through different descriptors
//! never share mutable state.

mod file;
mod memory;
mod null;
mod remote;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use null::NullBackend;
pub use remote::{RemoteObjectBackend, RemoteObjectClient};

use crate::error::{ErrorKind, FlowError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// A single, independently-cursored read session. Each call to
/// `IoHandle::open_reader` returns a fresh one.
pub trait IoReader: Send {
    /// Returns up to `n` bytes; an empty return means EOF.
    fn read(&mut self, n: usize) -> Result<Vec<u8>>;
    fn close(&mut self) -> Result<()>;
}

/// The I/O capability of a data node: file, memory, remote object, null, or
/// the error backend containers use to reject direct I/O.
pub enum IoHandle {
    File(FileBackend),
    Memory(MemoryBackend),
    RemoteObject(RemoteObjectBackend),
    Null(NullBackend),
    Error,
}

impl IoHandle {
    /// Lazily acquires the writer side of the backing store.
    pub fn open_writer(&mut self) -> Result<()> {
        match self {
            IoHandle::File(b) => b.open_writer(),
            IoHandle::Memory(_) => Ok(()),
            IoHandle::RemoteObject(b) => b.open_writer(),
            IoHandle::Null(_) => Ok(()),
            IoHandle::Error => Err(FlowError::io("container nodes expose no direct I/O")),
        }
    }

    /// Appends `data`, returning the number of bytes actually persisted.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        match self {
            IoHandle::File(b) => b.write(data),
            IoHandle::Memory(b) => b.write(data),
            IoHandle::RemoteObject(b) => b.write(data),
            IoHandle::Null(_) => Ok(data.len()),
            IoHandle::Error => Err(FlowError::io("container nodes expose no direct I/O")),
        }
    }

    pub fn close_writer(&mut self) -> Result<()> {
        match self {
            IoHandle::File(b) => b.close_writer(),
            IoHandle::Memory(_) => Ok(()),
            IoHandle::RemoteObject(b) => b.close_writer(),
            IoHandle::Null(_) => Ok(()),
            IoHandle::Error => Ok(()),
        }
    }

    /// Opens an independent reader over the current contents of the store.
    pub fn open_reader(&self) -> Result<Box<dyn IoReader>> {
        match self {
            IoHandle::File(b) => b.open_reader(),
            IoHandle::Memory(b) => b.open_reader(),
            IoHandle::RemoteObject(b) => b.open_reader(),
            IoHandle::Null(b) => b.open_reader(),
            IoHandle::Error => Err(FlowError::new(ErrorKind::InvalidState, "container nodes expose no direct I/O")),
        }
    }

    pub fn exists(&self) -> Result<bool> {
        match self {
            IoHandle::File(b) => b.exists(),
            IoHandle::Memory(b) => Ok(b.exists()),
            IoHandle::RemoteObject(b) => b.exists(),
            IoHandle::Null(_) => Ok(false),
            IoHandle::Error => Ok(false),
        }
    }

    pub fn delete(&mut self) -> Result<()> {
        match self {
            IoHandle::File(b) => b.delete(),
            IoHandle::Memory(b) => {
                b.clear();
                Ok(())
            }
            IoHandle::RemoteObject(b) => b.delete(),
            IoHandle::Null(_) => Ok(()),
            IoHandle::Error => Ok(()),
        }
    }

    pub fn data_url(&self) -> String {
        match self {
            IoHandle::File(b) => b.data_url(),
            IoHandle::Memory(b) => b.data_url(),
            IoHandle::RemoteObject(b) => b.data_url(),
            IoHandle::Null(_) => "null://".to_string(),
            IoHandle::Error => String::new(),
        }
    }
}
