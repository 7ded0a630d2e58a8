use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{JoinHandle, ThreadId};

use parking_lot::{Mutex, MutexGuard};

use crate::config::FileManagerConfig;
use crate::dispatch::{self, DispatchGate, FsRequest, RequestQueue};
use crate::host::{FileActions, HeadlessUi, MemoryPreferences, NoFileActions, Preferences, UiHost};
use crate::image_decode::{ImageDecoder, default_decoder};
use crate::session::{Deferred, FileManagerSession, SessionParts};
use crate::storage::StorageDriver;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Name of the thread started by [`FileManagerBuilder::spawn`].
pub const OWNER_THREAD_NAME: &str = "fs-owner";

/// Builder for a [`FileManager`].
pub struct FileManagerBuilder {
    parts: SessionParts,
}

impl FileManagerBuilder {
    /// Start from a storage driver; every other collaborator has a headless default.
    pub fn new(storage: impl StorageDriver + 'static) -> Self {
        Self {
            parts: SessionParts {
                config: FileManagerConfig::default(),
                storage: Box::new(storage),
                preferences: Box::new(MemoryPreferences::default()),
                ui: Box::new(HeadlessUi::default()),
                actions: Box::new(NoFileActions),
                image_decoder: default_decoder(),
            },
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: FileManagerConfig) -> Self {
        self.parts.config = config;
        self
    }

    /// Set the persisted preferences.
    pub fn preferences(mut self, preferences: impl Preferences + 'static) -> Self {
        self.parts.preferences = Box::new(preferences);
        self
    }

    /// Set the GUI host.
    pub fn ui(mut self, ui: impl UiHost + 'static) -> Self {
        self.parts.ui = Box::new(ui);
        self
    }

    /// Set the per-type file actions.
    pub fn actions(mut self, actions: impl FileActions + 'static) -> Self {
        self.parts.actions = Box::new(actions);
        self
    }

    /// Set the image decoder.
    pub fn image_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.parts.image_decoder = Box::new(decoder);
        self
    }

    /// Queue depth configured for [`channel`](Self::channel).
    pub fn queue_capacity(&self) -> usize {
        self.parts.config.queue_capacity
    }

    /// Create the gate and queue for an owner thread driven by the caller.
    pub fn channel(&self, owner: ThreadId) -> (DispatchGate, RequestQueue) {
        dispatch::channel(owner, self.queue_capacity())
    }

    /// Build a manager whose storage work runs on the gate's owner thread.
    ///
    /// The caller must drain the matching [`RequestQueue`] on that thread.
    pub fn build(self, gate: DispatchGate) -> FileManager {
        FileManager {
            session: Arc::new(Mutex::new(FileManagerSession::new(self.parts, gate))),
        }
    }

    /// Start a dedicated owner thread that serves requests until shut down.
    pub fn spawn(self) -> io::Result<(FileManager, OwnerThread)> {
        let capacity = self.queue_capacity();
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name(OWNER_THREAD_NAME.to_string())
            .spawn(move || {
                let (gate, queue) = dispatch::channel(std::thread::current().id(), capacity);
                let manager = self.build(gate);
                if tx.send(manager.clone()).is_err() {
                    return;
                }
                manager.serve(&queue);
            })?;
        let manager = rx.recv().map_err(|_| {
            io::Error::other("file manager owner thread exited during start-up")
        })?;
        let gate = manager.lock().gate().clone();
        Ok((manager, OwnerThread { gate, handle }))
    }
}

/// Cloneable handle to one [`FileManagerSession`].
#[derive(Clone)]
pub struct FileManager {
    session: Arc<Mutex<FileManagerSession>>,
}

impl FileManager {
    /// Lock the session.
    ///
    /// Requests posted and callbacks queued while the guard is held go out when it drops,
    /// after the lock is released.
    pub fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            guard: self.session.lock(),
        }
    }

    /// Run one request. Call on the owner thread.
    pub fn handle_request(&self, request: FsRequest) {
        trace_request_handled(request.kind());
        self.lock().handle_request(request);
    }

    /// Run every queued request without waiting. `Shutdown` is skipped.
    ///
    /// Returns the number of requests handled.
    pub fn drain(&self, queue: &RequestQueue) -> usize {
        let mut handled = 0;
        while let Some(request) = queue.try_next() {
            if request == FsRequest::Shutdown {
                continue;
            }
            self.handle_request(request);
            handled += 1;
        }
        handled
    }

    /// Run requests as they arrive until `Shutdown` or until every gate is dropped.
    pub fn serve(&self, queue: &RequestQueue) {
        while let Some(request) = queue.next() {
            if request == FsRequest::Shutdown {
                break;
            }
            self.handle_request(request);
        }
    }
}

/// Exclusive access to the session; see [`FileManager::lock`].
pub struct SessionGuard<'a> {
    guard: MutexGuard<'a, FileManagerSession>,
}

impl Deref for SessionGuard<'_> {
    type Target = FileManagerSession;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let outbox = self.guard.take_outbox();
        if outbox.is_empty() {
            return;
        }
        let gate = self.guard.gate().clone();
        MutexGuard::unlocked(&mut self.guard, || {
            for deferred in outbox {
                match deferred {
                    Deferred::Post(request) => {
                        gate.post(request);
                    }
                    Deferred::FileSelected(callback, path) => callback(path.as_str()),
                }
            }
        });
    }
}

/// The thread started by [`FileManagerBuilder::spawn`].
pub struct OwnerThread {
    gate: DispatchGate,
    handle: JoinHandle<()>,
}

impl OwnerThread {
    /// Identity of the owner thread.
    pub fn id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    /// Ask the thread to stop after the requests already queued, and wait for it.
    pub fn shutdown(self) -> std::thread::Result<()> {
        self.gate.post(FsRequest::Shutdown);
        self.handle.join()
    }
}

#[cfg(feature = "tracing")]
fn trace_request_handled(kind: &'static str) {
    debug!(event = "dispatch.handled", kind, "request handled on owner thread");
}

#[cfg(not(feature = "tracing"))]
fn trace_request_handled(_kind: &'static str) {}
