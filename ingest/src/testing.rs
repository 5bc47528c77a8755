//! In-memory store doubles for worker and coordinator tests.

use common::storage::{Connector, LoadSession};
use common::{Error, Listing, PropertyType, Result};
use std::collections::HashSet;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

pub fn listing(id: i64) -> Listing {
    Listing {
        id,
        latitude: 55.0 + id as f64 * 1e-4,
        longitude: 83.0,
        price: 1_000_000.0,
        name: format!("listing {id}"),
        rooms: Some(1),
        area: Some(30.0),
        property_type: PropertyType::Apartment,
    }
}

/// One-shot gate. `wait` blocks until `open` has been called.
#[derive(Default)]
pub struct Latch {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Latch {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
    }
}

/// Serves `data` until `fail_at` bytes have been handed out, then errors.
pub struct FailingInput {
    data: Vec<u8>,
    pos: usize,
    fail_at: usize,
}

impl FailingInput {
    pub fn new(data: Vec<u8>, fail_at: usize) -> Self {
        Self {
            data,
            pos: 0,
            fail_at,
        }
    }
}

impl Read for FailingInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.fail_at {
            return Err(io::Error::new(io::ErrorKind::Other, "disk gone"));
        }
        let end = self.fail_at.min(self.data.len()).min(self.pos + buf.len());
        let n = end.saturating_sub(self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Counts the bytes pulled from `inner`.
pub struct CountingInput<R> {
    inner: R,
    consumed: Arc<AtomicUsize>,
}

impl<R> CountingInput<R> {
    pub fn new(inner: R, consumed: Arc<AtomicUsize>) -> Self {
        Self { inner, consumed }
    }
}

impl<R: Read> Read for CountingInput<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

#[derive(Clone, Default)]
pub struct MockConnector {
    failing_ids: HashSet<i64>,
    fail_begin: bool,
    fail_commit: bool,
    commit_gate: Option<Arc<Latch>>,
    refuse: usize,
    attempts: Arc<AtomicUsize>,
    committed: Arc<Mutex<Vec<i64>>>,
    rollbacks: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn failing_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.failing_ids.extend(ids);
        self
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Every commit waits for `latch` to open.
    pub fn gated_commit(mut self, latch: Arc<Latch>) -> Self {
        self.commit_gate = Some(latch);
        self
    }

    /// The first `n` connection attempts fail.
    pub fn refusing_connections(mut self, n: usize) -> Self {
        self.refuse = n;
        self
    }

    pub fn committed(&self) -> Vec<i64> {
        self.committed.lock().unwrap().clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Session = MockSession;

    fn connect(&self) -> Result<MockSession> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.refuse {
            return Err(Error::Storage("connection refused".to_string()));
        }
        Ok(MockSession {
            failing_ids: self.failing_ids.clone(),
            fail_begin: self.fail_begin,
            fail_commit: self.fail_commit,
            commit_gate: self.commit_gate.clone(),
            pending: Vec::new(),
            committed: Arc::clone(&self.committed),
            rollbacks: Arc::clone(&self.rollbacks),
        })
    }
}

pub struct MockSession {
    failing_ids: HashSet<i64>,
    fail_begin: bool,
    fail_commit: bool,
    commit_gate: Option<Arc<Latch>>,
    pending: Vec<i64>,
    committed: Arc<Mutex<Vec<i64>>>,
    rollbacks: Arc<AtomicUsize>,
}

impl LoadSession for MockSession {
    fn clear_all(&mut self) -> Result<()> {
        self.committed.lock().unwrap().clear();
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.fail_begin {
            return Err(Error::Transaction("begin failed".to_string()));
        }
        self.pending.clear();
        Ok(())
    }

    fn insert(&mut self, listing: &Listing) -> Result<()> {
        if self.failing_ids.contains(&listing.id) {
            return Err(Error::Storage(format!(
                "UNIQUE constraint failed: properties.id ({})",
                listing.id
            )));
        }
        self.pending.push(listing.id);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if let Some(gate) = &self.commit_gate {
            gate.wait();
        }
        if self.fail_commit {
            return Err(Error::Transaction("commit failed".to_string()));
        }
        self.committed.lock().unwrap().extend(self.pending.drain(..));
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.pending.clear();
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
