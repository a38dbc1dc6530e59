// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::BoxError;

/// Produces the authoritative value for a key when no cache or peer has it.
///
/// A loader is the "source of truth" behind a [`Group`](crate::Group): a database query, a
/// computation, a file read. It is only consulted by the process that owns the key (or by any
/// process whose peer fetch failed) and only by one caller at a time per key.
///
/// Closures with the right signature are loaders already:
///
/// ```
/// use peercache::{BoxError, Loader};
///
/// let loader = |key: &str| -> Result<Vec<u8>, BoxError> { Ok(key.len().to_string().into_bytes()) };
/// assert_eq!(loader.load("four").unwrap(), b"4");
/// ```
pub trait Loader: Send + Sync {
    /// Loads the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be produced. The error is reported to every caller
    /// waiting on this load and nothing is cached.
    fn load(&self, key: &str) -> Result<Vec<u8>, BoxError>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn load(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        self(key)
    }
}

/// Pins a closure to the [`Loader`] signature so its argument and error types are inferred.
///
/// ```
/// use peercache::loader_fn;
///
/// let loader = loader_fn(|key| Ok(key.as_bytes().to_vec()));
/// # let _ = loader;
/// ```
pub fn loader_fn<F>(f: F) -> F
where
    F: Fn(&str) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    f
}

/// Fetches a value from the remote peer that owns it.
///
/// Implementations carry the transport; an HTTP client that requests
/// `/{base_path}/{group}/{key}` from the owning process is the typical one.
pub trait PeerFetcher: Send + Sync {
    /// Fetches the value of `key` in `group` from the remote peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer cannot be reached or cannot produce the value. The caller
    /// then loads the value locally.
    fn fetch(&self, group: &str, key: &str) -> Result<Vec<u8>, BoxError>;
}

impl<F> PeerFetcher for F
where
    F: Fn(&str, &str) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn fetch(&self, group: &str, key: &str) -> Result<Vec<u8>, BoxError> {
        self(group, key)
    }
}

/// Decides which remote peer, if any, owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the fetcher for the peer owning `key`, or `None` if the key is owned by the
    /// current process or there are no peers.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>>;
}
