// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for group lookups.

use std::sync::Arc;

/// A type-erased error returned by a [`Loader`](crate::Loader) or
/// [`PeerFetcher`](crate::PeerFetcher).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error returned by [`Group::get`](crate::Group::get).
///
/// Only validation failures and loader failures reach callers. Failures to fetch from a remote
/// peer are logged and answered by loading locally instead.
///
/// The type is cheap to clone: when several callers wait on the same load, each of them
/// receives a clone of the one error the loader produced.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested key was empty.
    #[error("key is required")]
    EmptyKey,

    /// The group's loader failed to produce a value for the key.
    #[error("failed to load key {key:?}")]
    Load {
        /// The key that could not be loaded.
        key: String,
        /// The error reported by the loader.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub(crate) fn load(key: &str, source: BoxError) -> Self {
        Self::Load {
            key: key.to_string(),
            source: Arc::from(source),
        }
    }
}

/// A specialized [`Result`] type for group lookups.
pub type Result<T> = std::result::Result<T, Error>;
