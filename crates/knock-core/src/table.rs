use crate::record::TestRecord;
use crate::types::Nonce;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// The tests we are currently helping with, as Bob or Charlie.
///
/// Entries are shared out behind their own lock so that a record's mutations
/// are serialised on that record alone; the outer lock covers only lookup,
/// insertion and removal.  Entries are reaped by a one-shot timer scheduled
/// at insertion time.
#[derive(Debug)]
pub(crate) struct ActiveTests {
    capacity: usize,
    tests: Mutex<HashMap<Nonce, Arc<Mutex<TestRecord>>>>,
}

impl ActiveTests {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tests: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, nonce: Nonce) -> Option<Arc<Mutex<TestRecord>>> {
        self.tests.lock().get(&nonce).cloned()
    }

    /// Insert a record, refusing beyond capacity.
    pub(crate) fn insert(&self, nonce: Nonce, record: Arc<Mutex<TestRecord>>) -> bool {
        let mut tests = self.tests.lock();
        if tests.len() >= self.capacity {
            return false;
        }
        tests.insert(nonce, record);
        true
    }

    pub(crate) fn remove(&self, nonce: Nonce) -> Option<Arc<Mutex<TestRecord>>> {
        self.tests.lock().remove(&nonce)
    }

    pub(crate) fn len(&self) -> usize {
        self.tests.lock().len()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }
}
