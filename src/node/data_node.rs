//! Data node (spec §3, §4.3): the unit of data with a lifecycle and an I/O
//! capability.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::checksum::{ChecksumType, RunningChecksum};
use crate::error::{FlowError, Result};
use crate::event::{AttributeValue, EventBroadcaster, EventKind};
use crate::ids::{Oid, Uid};
use crate::io::{IoHandle, IoReader};
use crate::node::core::{NodeCore, NodeOptions};
use crate::node::node_handle::NodeHandle;
use crate::status::DataStatus;

/// Size/checksum captured for data written out-of-band, settable exactly
/// once after the node reaches `COMPLETED` (spec §3).
#[derive(Default)]
struct ExternalMeta {
    size: Option<i64>,
    checksum: Option<(u32, ChecksumType)>,
}

pub struct DataNode {
    pub(crate) core: NodeCore,
    io: Mutex<IoHandle>,
    size: Mutex<i64>,
    checksum: Mutex<RunningChecksum>,
    external: Mutex<ExternalMeta>,
    descriptors: Mutex<HashMap<i64, Box<dyn IoReader>>>,
    ref_count: Mutex<i64>,
    expected_size: i64,
}

impl DataNode {
    pub fn new(oid: impl Into<Oid>, uid: impl Into<Uid>, io: IoHandle, options: NodeOptions) -> Arc<Self> {
        Self::with_expected_size(oid, uid, io, options, 0)
    }

    pub fn with_expected_size(
        oid: impl Into<Oid>,
        uid: impl Into<Uid>,
        io: IoHandle,
        options: NodeOptions,
        expected_size: i64,
    ) -> Arc<Self> {
        Arc::new(Self {
            core: NodeCore::new(oid.into(), uid.into(), options),
            io: Mutex::new(io),
            size: Mutex::new(0),
            checksum: Mutex::new(RunningChecksum::new()),
            external: Mutex::new(ExternalMeta::default()),
            descriptors: Mutex::new(HashMap::new()),
            ref_count: Mutex::new(0),
            expected_size,
        })
    }

    fn self_handle(self: &Arc<Self>) -> NodeHandle {
        NodeHandle::Data(self.clone())
    }

    pub fn oid(&self) -> &Oid {
        self.core.oid()
    }

    pub fn uid(&self) -> &Uid {
        self.core.uid()
    }

    pub fn status(&self) -> DataStatus {
        self.core.status()
    }

    pub fn events(&self) -> &EventBroadcaster {
        self.core.events()
    }

    pub fn size(&self) -> i64 {
        self.external.lock().size.unwrap_or_else(|| *self.size.lock())
    }

    pub fn checksum(&self) -> u32 {
        match self.external.lock().checksum {
            Some((crc, _)) => crc,
            None => self.checksum.lock().value(),
        }
    }

    pub fn checksum_type(&self) -> ChecksumType {
        match self.external.lock().checksum {
            Some((_, kind)) => kind,
            None => self.checksum.lock().checksum_type(),
        }
    }

    pub fn ref_count(&self) -> i64 {
        *self.ref_count.lock()
    }

    /// `write` (spec §4.3 write-path algorithm).
    pub fn write(self: &Arc<Self>, data: &[u8]) -> Result<usize> {
        let status = self.core.status();
        if !matches!(status, DataStatus::Initialized | DataStatus::Writing) {
            return Err(FlowError::invalid_state(format!(
                "cannot write while status is {status}"
            )));
        }

        let written = {
            let mut io = self.io.lock();
            if status == DataStatus::Initialized {
                io.open_writer()?;
            }
            io.write(data)?
        };
        if written < data.len() {
            tracing::warn!(
                oid = %self.core.oid(),
                uid = %self.core.uid(),
                requested = data.len(),
                written,
                "short write"
            );
        }
        let written_slice = &data[..written];

        self.checksum.lock().update(written_slice);
        let new_size = {
            let mut size = self.size.lock();
            *size += written as i64;
            *size
        };

        for consumer in self.core.streaming_consumers() {
            consumer.data_written(self.core.uid(), written_slice);
        }

        if self.expected_size > 0 && new_size >= self.expected_size {
            if new_size > self.expected_size {
                tracing::warn!(
                    oid = %self.core.oid(),
                    uid = %self.core.uid(),
                    expected = self.expected_size,
                    actual = new_size,
                    "write exceeded expectedSize"
                );
            }
            self.set_completed()?;
        } else if status == DataStatus::Initialized {
            self.core.set_status(DataStatus::Writing);
        }
        Ok(written)
    }

    /// `setCompleted` (spec §4.3).
    pub fn set_completed(self: &Arc<Self>) -> Result<()> {
        let status = self.core.status();
        if !matches!(status, DataStatus::Initialized | DataStatus::Writing) {
            return Err(FlowError::invalid_state(format!(
                "cannot complete while status is {status}"
            )));
        }
        self.io.lock().close_writer()?;
        self.core.set_status(DataStatus::Completed);
        for consumer in self.core.streaming_consumers() {
            consumer.drop_completed(self.core.uid());
        }
        Ok(())
    }

    /// `open` (spec §4.3): opens a reader, returns an opaque descriptor.
    pub fn open(&self) -> Result<i64> {
        if self.core.status() != DataStatus::Completed {
            return Err(FlowError::invalid_state("node is not COMPLETED"));
        }
        let reader = self.io.lock().open_reader()?;
        let mut descriptors = self.descriptors.lock();
        let mut descriptor = rand::random::<i64>();
        while descriptors.contains_key(&descriptor) {
            descriptor = rand::random::<i64>();
        }
        descriptors.insert(descriptor, reader);
        drop(descriptors);
        *self.ref_count.lock() += 1;
        self.core.events().fire(
            self.core.oid(),
            self.core.uid(),
            EventKind::Open,
            crate::event::EventPayload::Open { descriptor },
        );
        Ok(descriptor)
    }

    /// `read` (spec §4.3).
    pub fn read(&self, descriptor: i64, n: usize) -> Result<Vec<u8>> {
        if self.core.status() != DataStatus::Completed {
            return Err(FlowError::invalid_state("node is not COMPLETED"));
        }
        let mut descriptors = self.descriptors.lock();
        let reader = descriptors
            .get_mut(&descriptor)
            .ok_or_else(|| FlowError::new(crate::error::ErrorKind::BadDescriptor, "unknown descriptor"))?;
        reader.read(n)
    }

    /// `close` (spec §4.3).
    pub fn close(&self, descriptor: i64) -> Result<()> {
        let mut reader = self
            .descriptors
            .lock()
            .remove(&descriptor)
            .ok_or_else(|| FlowError::new(crate::error::ErrorKind::BadDescriptor, "unknown descriptor"))?;
        reader.close()?;
        *self.ref_count.lock() -= 1;
        Ok(())
    }

    pub fn delete(&self) -> Result<()> {
        self.io.lock().delete()?;
        self.core.set_status(DataStatus::Deleted);
        Ok(())
    }

    pub fn exists(&self) -> Result<bool> {
        self.io.lock().exists()
    }

    pub fn expiration_date(&self) -> i64 {
        self.core.options().expiration_date
    }

    pub fn data_url(&self) -> String {
        self.io.lock().data_url()
    }

    /// Filesystem path backing this node, if it uses the file I/O backend.
    /// Used by directory containers to validate child placement (spec §4.4).
    pub fn file_path(&self) -> Option<std::path::PathBuf> {
        match &*self.io.lock() {
            IoHandle::File(backend) => Some(backend.path().clone()),
            _ => None,
        }
    }

    /// Set-once external checksum for data written out-of-band.
    pub fn set_external_checksum(&self, value: u32, kind: ChecksumType) -> Result<()> {
        if self.core.status().rank().map(|r| r < 2).unwrap_or(true) {
            return Err(FlowError::invalid_state(
                "checksum can only be set once status has reached COMPLETED",
            ));
        }
        let mut external = self.external.lock();
        if external.checksum.is_some() {
            return Err(FlowError::invalid_state("checksum was already set"));
        }
        external.checksum = Some((value, kind));
        Ok(())
    }

    pub fn set_external_size(&self, value: i64) -> Result<()> {
        if self.core.status().rank().map(|r| r < 2).unwrap_or(true) {
            return Err(FlowError::invalid_state(
                "size can only be set once status has reached COMPLETED",
            ));
        }
        let mut external = self.external.lock();
        if external.size.is_some() {
            return Err(FlowError::invalid_state("size was already set"));
        }
        external.size = Some(value);
        Ok(())
    }

    pub fn add_consumer(self: &Arc<Self>, c: NodeHandle) -> Result<()> {
        let handle = self.self_handle();
        self.core.add_consumer(&handle, c)
    }

    pub fn add_streaming_consumer(self: &Arc<Self>, c: NodeHandle) -> Result<()> {
        let handle = self.self_handle();
        self.core.add_streaming_consumer(&handle, c)
    }

    pub fn add_producer(self: &Arc<Self>, p: NodeHandle) -> Result<()> {
        let handle = self.self_handle();
        self.core.add_producer(&handle, p)
    }

    /// `producerFinished` (spec §4.3): completes the node once every
    /// producer has reported.
    pub fn producer_finished(self: &Arc<Self>, uid: &Uid) -> Result<()> {
        if self.core.producer_finished(uid)? {
            self.set_completed()?;
        }
        Ok(())
    }

    pub fn handle_interest(&self, _other: &NodeHandle) {}

    pub fn drop_completed(&self, _producer_uid: &Uid) {}

    pub fn data_written(&self, _producer_uid: &Uid, _data: &[u8]) {}

    pub fn fire_attribute(&self, name: &'static str, value: AttributeValue) {
        self.core.fire_attribute(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;

    fn memory_node(expected_size: i64) -> Arc<DataNode> {
        DataNode::with_expected_size(
            "oid-a",
            "uid-a1",
            IoHandle::Memory(MemoryBackend::new("uid-a1")),
            NodeOptions::default(),
            expected_size,
        )
    }

    #[test]
    fn write_then_set_completed_tracks_size_and_checksum() {
        let node = memory_node(0);
        node.write(b"hello").unwrap();
        node.write(b"world").unwrap();
        node.set_completed().unwrap();
        assert_eq!(node.status(), DataStatus::Completed);
        assert_eq!(node.size(), 10);

        let mut expected = RunningChecksum::new();
        expected.update(b"helloworld");
        assert_eq!(node.checksum(), expected.value());
    }

    #[test]
    fn expected_size_auto_completes() {
        let node = memory_node(4);
        node.write(b"ab").unwrap();
        assert_eq!(node.status(), DataStatus::Writing);
        node.write(b"cd").unwrap();
        assert_eq!(node.status(), DataStatus::Completed);
    }

    #[test]
    fn producer_finished_rejects_unknown_uid() {
        let node = memory_node(0);
        let err = node.core.producer_finished(&Uid::new("ghost")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::WiringError);
    }
}
