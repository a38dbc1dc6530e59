// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Collapses concurrent identical calls into a single execution.
//!
//! This crate provides [`Flight`], a register of in-flight calls keyed by the work they
//! perform. When several threads ask for the same key at once, only the first one (the
//! "leader") runs its closure. The others (the "followers") block until the leader is done
//! and receive a clone of its result.
//!
//! The register only deduplicates work that is *currently running*. Once a call completes its
//! record is dropped, and the next call for the same key executes again. Pair it with a cache
//! to avoid repeated work over time.
//!
//! # Example
//!
//! ```
//! use peercache_flight::Flight;
//!
//! let flight: Flight<String, Result<String, String>> = Flight::new();
//!
//! let value = flight.work("user:123".to_string(), || {
//!     // Runs once, however many threads ask for "user:123" concurrently.
//!     Ok("expensive_result".to_string())
//! });
//! assert_eq!(value, Ok("expensive_result".to_string()));
//! ```
//!
//! Failures are ordinary values of `T`, so with `T = Result<V, E>` every follower observes the
//! leader's error. `E` must be [`Clone`] for that.
//!
//! # Panics in the Leader
//!
//! If the leader's closure panics, its record is withdrawn and the followers are woken. One of
//! them is promoted to leader and runs its own closure; the rest wait on it. The panic itself
//! keeps unwinding on the leader's thread.
//!
//! # Blocking
//!
//! Followers wait without a deadline. A closure that never returns blocks every follower of
//! its key. Closures that perform I/O should bound it themselves, for example with a request
//! timeout. The register's own lock is held only for bookkeeping, never while a closure runs,
//! so a slow call does not hold up unrelated keys.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// A register of in-flight calls that suppresses duplicate executions per key.
pub struct Flight<K, T> {
    calls: Mutex<HashMap<K, Arc<Call<T>>>>,
}

impl<K, T> Default for Flight<K, T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> Debug for Flight<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flight")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

impl<K, T> Flight<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    /// Creates an empty register.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `func` for `key` unless a call for the same key is already running, in which case
    /// this blocks until that call finishes and returns a clone of its result.
    ///
    /// `func` runs on the calling thread. It is invoked at most once per call to `work`, and
    /// not at all if this caller joins another caller's execution.
    pub fn work<F>(&self, key: K, func: F) -> T
    where
        F: FnOnce() -> T,
    {
        loop {
            let mut calls = self.calls.lock();
            let existing = calls.get(&key).map(Arc::clone);

            let call = match existing {
                Some(call) => call,
                None => {
                    let call = Arc::new(Call::new());
                    calls.insert(key.clone(), Arc::clone(&call));
                    drop(calls);
                    return self.lead(&key, &call, func);
                }
            };
            drop(calls);

            if let Some(value) = call.wait() {
                return value;
            }
            // The leader panicked and withdrew its record; compete for leadership again.
        }
    }

    /// Returns the number of keys with a call currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    fn lead<F>(&self, key: &K, call: &Arc<Call<T>>, func: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = LeaderGuard { flight: self, key, call };

        let value = func();
        call.finish(value.clone());
        value
    }

    fn withdraw(&self, key: &K, call: &Arc<Call<T>>) {
        let mut calls = self.calls.lock();
        if calls.get(key).is_some_and(|current| Arc::ptr_eq(current, call)) {
            calls.remove(key);
        }
    }
}

/// A single in-flight call and the latch its followers wait on.
struct Call<T> {
    state: Mutex<State<T>>,
    done: Condvar,
}

enum State<T> {
    Running,
    Finished(T),
    Abandoned,
}

impl<T: Clone> Call<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Running),
            done: Condvar::new(),
        }
    }

    /// Blocks until the call settles. Returns `None` if the leader abandoned it.
    fn wait(&self) -> Option<T> {
        let mut state = self.state.lock();
        while matches!(*state, State::Running) {
            self.done.wait(&mut state);
        }

        match &*state {
            State::Finished(value) => Some(value.clone()),
            State::Running | State::Abandoned => None,
        }
    }

    fn finish(&self, value: T) {
        *self.state.lock() = State::Finished(value);
        self.done.notify_all();
    }

    fn abandon(&self) {
        let mut state = self.state.lock();
        if matches!(*state, State::Running) {
            *state = State::Abandoned;
            drop(state);
            self.done.notify_all();
        }
    }
}

/// Removes the leader's record when it is done, successfully or by unwinding.
struct LeaderGuard<'a, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    flight: &'a Flight<K, T>,
    key: &'a K,
    call: &'a Arc<Call<T>>,
}

impl<K, T> Drop for LeaderGuard<'_, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    fn drop(&mut self) {
        // Withdraw before waking followers so a promoted follower cannot find this record again.
        self.flight.withdraw(self.key, self.call);
        self.call.abandon();
    }
}
