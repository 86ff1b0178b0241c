//! Shared test doubles for integration testing.
//!
//! `FakeBackend` implements the backend seam in memory with injectable
//! latency, failures and pool snapshots, and counts every checkout,
//! release and cancel command it sees.

// Not every test crate uses every knob.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use dogsearch::db::{BackendConn, BackendPid, DbError, PoolLane, PoolSnapshot, QueryBackend};
use dogsearch::records::Dog;

/// First pid handed out by the fake; later connections count up from here.
pub const FIRST_PID: i32 = 4242;

fn healthy_snapshot() -> PoolSnapshot {
    PoolSnapshot {
        active: 1,
        idle: 1,
        max: 10,
    }
}

#[derive(Default)]
struct FakeState {
    rows: Vec<Dog>,
    snapshots: HashMap<PoolLane, PoolSnapshot>,
    fail_acquire: Vec<PoolLane>,
    acquired: Vec<PoolLane>,
    released: HashMap<PoolLane, usize>,
    cancel_calls: Vec<BackendPid>,
}

struct FakeInner {
    state: Mutex<FakeState>,
    search_delay: Mutex<Duration>,
    cancel_delay: Mutex<Duration>,
    fail_search: AtomicBool,
    next_pid: AtomicI32,
}

/// In-memory backend double. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct FakeBackend {
    inner: Arc<FakeInner>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeInner {
                state: Mutex::new(FakeState::default()),
                search_delay: Mutex::new(Duration::ZERO),
                cancel_delay: Mutex::new(Duration::ZERO),
                fail_search: AtomicBool::new(false),
                next_pid: AtomicI32::new(FIRST_PID),
            }),
        }
    }

    pub fn push_dogs(&self, names: &[&str]) {
        let mut state = self.inner.state.lock().unwrap();
        for name in names {
            state.rows.push(make_dog(name));
        }
    }

    /// Delay applied to searches that start after this call.
    pub fn set_search_delay(&self, delay: Duration) {
        *self.inner.search_delay.lock().unwrap() = delay;
    }

    /// Delay applied to cancel commands that start after this call.
    pub fn set_cancel_delay(&self, delay: Duration) {
        *self.inner.cancel_delay.lock().unwrap() = delay;
    }

    pub fn set_fail_search(&self, fail: bool) {
        self.inner.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_acquire(&self, lane: PoolLane) {
        self.inner.state.lock().unwrap().fail_acquire.push(lane);
    }

    pub fn set_snapshot(&self, lane: PoolLane, snapshot: PoolSnapshot) {
        self.inner
            .state
            .lock()
            .unwrap()
            .snapshots
            .insert(lane, snapshot);
    }

    pub fn acquire_count(&self, lane: PoolLane) -> usize {
        self.inner
            .state
            .lock()
            .unwrap()
            .acquired
            .iter()
            .filter(|&&l| l == lane)
            .count()
    }

    pub fn release_count(&self, lane: PoolLane) -> usize {
        *self
            .inner
            .state
            .lock()
            .unwrap()
            .released
            .get(&lane)
            .unwrap_or(&0)
    }

    pub fn cancel_count(&self) -> usize {
        self.inner.state.lock().unwrap().cancel_calls.len()
    }

    pub fn cancelled_pids(&self) -> Vec<BackendPid> {
        self.inner.state.lock().unwrap().cancel_calls.clone()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub fn make_dog(name: &str) -> Dog {
    let now = Utc::now();
    Dog {
        id: Uuid::new_v4(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl QueryBackend for FakeBackend {
    type Conn = FakeConn;

    async fn acquire(&self, lane: PoolLane) -> Result<FakeConn, DbError> {
        let mut state = self.inner.state.lock().unwrap();
        if state.fail_acquire.contains(&lane) {
            return Err(DbError::Checkout(format!(
                "injected exhaustion of {lane} pool"
            )));
        }
        state.acquired.push(lane);
        drop(state);

        let pid = BackendPid(self.inner.next_pid.fetch_add(1, Ordering::SeqCst));
        Ok(FakeConn {
            inner: self.inner.clone(),
            lane,
            pid,
        })
    }

    fn snapshot(&self, lane: PoolLane) -> PoolSnapshot {
        self.inner
            .state
            .lock()
            .unwrap()
            .snapshots
            .get(&lane)
            .copied()
            .unwrap_or_else(healthy_snapshot)
    }
}

pub struct FakeConn {
    inner: Arc<FakeInner>,
    lane: PoolLane,
    pid: BackendPid,
}

#[async_trait]
impl BackendConn for FakeConn {
    async fn backend_pid(&mut self) -> Result<BackendPid, DbError> {
        Ok(self.pid)
    }

    async fn search_dogs(&mut self, pattern: &str, limit: i64) -> Result<Vec<Dog>, DbError> {
        let delay = *self.inner.search_delay.lock().unwrap();
        tokio::time::sleep(delay).await;

        if self.inner.fail_search.load(Ordering::SeqCst) {
            return Err(DbError::Query("injected query failure".to_string()));
        }

        let needle = pattern.trim_matches('%').to_lowercase();
        let mut rows: Vec<Dog> = self
            .inner
            .state
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|dog| dog.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn cancel_backend(&mut self, pid: BackendPid) -> Result<bool, DbError> {
        let delay = *self.inner.cancel_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.inner.state.lock().unwrap().cancel_calls.push(pid);
        Ok(true)
    }

    async fn insert_dogs(&mut self, names: &[String]) -> Result<u64, DbError> {
        let mut state = self.inner.state.lock().unwrap();
        for name in names {
            state.rows.push(make_dog(name));
        }
        Ok(names.len() as u64)
    }

    async fn count_dogs(&mut self) -> Result<i64, DbError> {
        Ok(self.inner.state.lock().unwrap().rows.len() as i64)
    }
}

impl Drop for FakeConn {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        *state.released.entry(self.lane).or_insert(0) += 1;
    }
}
