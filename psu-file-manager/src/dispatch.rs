//! Cross-thread dispatch gate.
//!
//! Only the filesystem owner thread may call into the [`StorageDriver`](crate::StorageDriver).
//! Public operations check the calling thread; from any other thread they post a typed
//! [`FsRequest`] on a bounded queue and return immediately. The owner thread drains the queue
//! in FIFO order.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread::ThreadId;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::{trace, warn};

/// Work item executed on the filesystem owner thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FsRequest {
    /// Rebuild the catalog of the current directory.
    LoadDirectory,
    /// Rename `path` to `stem` + its original extension.
    Rename {
        /// Full path of the file selected when the rename was confirmed.
        path: String,
        /// New name without extension.
        stem: String,
    },
    /// Delete `path`.
    Delete {
        /// Full path of the file selected when the delete was requested.
        path: String,
    },
    /// Upload `path` over the remote link.
    Upload {
        /// Full path of the file selected when the upload was requested.
        path: String,
    },
    /// Decode the image at `path`.
    OpenImage {
        /// Full path of the image selected when it was opened.
        path: String,
    },
    /// Re-query used/free space.
    RefreshStorageInfo,
    /// Stop [`FileManager::serve`](crate::FileManager::serve).
    Shutdown,
}

impl FsRequest {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoadDirectory => "load_directory",
            Self::Rename { .. } => "rename",
            Self::Delete { .. } => "delete",
            Self::Upload { .. } => "upload",
            Self::OpenImage { .. } => "open_image",
            Self::RefreshStorageInfo => "refresh_storage_info",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Sending half: knows the owner thread and posts requests to it.
#[derive(Clone, Debug)]
pub struct DispatchGate {
    owner: ThreadId,
    sender: SyncSender<FsRequest>,
}

impl DispatchGate {
    /// Identity of the filesystem owner thread.
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Whether the calling thread is the owner thread.
    pub fn is_owner_thread(&self) -> bool {
        std::thread::current().id() == self.owner
    }

    /// Enqueue `request`, waiting for space if the queue is full.
    ///
    /// Returns `false` if the owner side is gone; the request is dropped.
    pub fn post(&self, request: FsRequest) -> bool {
        let kind = request.kind();
        match self.sender.send(request) {
            Ok(()) => {
                trace_request_posted(kind);
                true
            }
            Err(_) => {
                trace_request_dropped(kind);
                false
            }
        }
    }
}

/// Receiving half, drained by the owner thread.
#[derive(Debug)]
pub struct RequestQueue {
    receiver: Receiver<FsRequest>,
}

impl RequestQueue {
    /// Next queued request without waiting.
    pub fn try_next(&self) -> Option<FsRequest> {
        match self.receiver.try_recv() {
            Ok(request) => Some(request),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next request; `None` once every gate is dropped.
    pub fn next(&self) -> Option<FsRequest> {
        self.receiver.recv().ok()
    }

    /// Wait up to `timeout` for the next request.
    pub fn next_timeout(&self, timeout: Duration) -> Option<FsRequest> {
        match self.receiver.recv_timeout(timeout) {
            Ok(request) => Some(request),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Create a gate for `owner` and its queue, holding at most `capacity` pending requests.
pub fn channel(owner: ThreadId, capacity: usize) -> (DispatchGate, RequestQueue) {
    let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
    (DispatchGate { owner, sender }, RequestQueue { receiver })
}

#[cfg(feature = "tracing")]
fn trace_request_posted(kind: &'static str) {
    trace!(event = "dispatch.posted", kind, "request posted to owner thread");
}

#[cfg(not(feature = "tracing"))]
fn trace_request_posted(_kind: &'static str) {}

#[cfg(feature = "tracing")]
fn trace_request_dropped(kind: &'static str) {
    warn!(
        event = "dispatch.dropped",
        kind, "owner thread gone, request dropped"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_request_dropped(_kind: &'static str) {}
