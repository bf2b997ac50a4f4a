//! Remote-object I/O (spec §6 `remote://HOST:PORT/UID`).
//!
//! No concrete transport ships here: the spec scopes concrete storage
//! back-ends out (§1), so [`RemoteObjectClient`] is the seam a caller plugs a
//! real client into, the same way the spec frames the container runtime in §6.

use std::sync::Arc;

use crate::error::Result;
use crate::io::IoReader;

/// What a remote object store must support for a data node to use it as a
/// backend. Implemented by callers; this crate only defines the contract.
pub trait RemoteObjectClient: Send + Sync {
    fn write(&self, uid: &str, data: &[u8]) -> Result<usize>;
    fn read(&self, uid: &str, offset: usize, len: usize) -> Result<Vec<u8>>;
    fn exists(&self, uid: &str) -> Result<bool>;
    fn delete(&self, uid: &str) -> Result<()>;
    fn len(&self, uid: &str) -> Result<usize>;
}

pub struct RemoteObjectBackend {
    client: Arc<dyn RemoteObjectClient>,
    host: String,
    port: u16,
    uid: String,
}

impl RemoteObjectBackend {
    pub fn new(client: Arc<dyn RemoteObjectClient>, host: impl Into<String>, port: u16, uid: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
            port,
            uid: uid.into(),
        }
    }

    pub fn open_writer(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.client.write(&self.uid, data)
    }

    pub fn close_writer(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn open_reader(&self) -> Result<Box<dyn IoReader>> {
        Ok(Box::new(RemoteReader {
            client: self.client.clone(),
            uid: self.uid.clone(),
            cursor: 0,
        }))
    }

    pub fn exists(&self) -> Result<bool> {
        self.client.exists(&self.uid)
    }

    pub fn delete(&mut self) -> Result<()> {
        self.client.delete(&self.uid)
    }

    pub fn data_url(&self) -> String {
        format!("remote://{}:{}/{}", self.host, self.port, self.uid)
    }
}

struct RemoteReader {
    client: Arc<dyn RemoteObjectClient>,
    uid: String,
    cursor: usize,
}

impl IoReader for RemoteReader {
    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let chunk = self.client.read(&self.uid, self.cursor, n)?;
        self.cursor += chunk.len();
        Ok(chunk)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
