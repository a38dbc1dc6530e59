// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events emitted by groups.
//!
//! Events are plain `tracing` events; nothing is recorded unless the host process installs a
//! subscriber.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupActivity {
    Hit,
    PeerLoad,
    PeerError,
    LocalLoad,
    LocalLoadError,
}

impl GroupActivity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::PeerLoad => "cache.peer_load",
            Self::PeerError => "cache.peer_error",
            Self::LocalLoad => "cache.local_load",
            Self::LocalLoadError => "cache.local_load_error",
        }
    }

    fn level(self) -> tracing::Level {
        match self {
            Self::Hit | Self::PeerLoad | Self::LocalLoad => tracing::Level::DEBUG,
            Self::LocalLoadError => tracing::Level::INFO,
            Self::PeerError => tracing::Level::WARN,
        }
    }
}

pub(crate) fn emit(group: &str, key: &str, activity: GroupActivity, detail: Option<&dyn Display>) {
    let activity_name = activity.as_str();
    let detail = detail.map(tracing::field::display);

    // Tracing level must be constant, so we use a macro to select the appropriate level.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(
                cache.group = group,
                cache.key = key,
                cache.activity = activity_name,
                cache.detail = detail,
                "cache.event"
            )
        };
    }

    match activity.level() {
        tracing::Level::WARN => emit_event!(warn),
        tracing::Level::INFO => emit_event!(info),
        _ => emit_event!(debug),
    }
}
