use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::repositories::Store;
use crate::services::keyed_lock::KeyedLocks;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn Store>,
    redis: RedisHandle,
    quiz_locks: KeyedLocks,
    attempt_locks: KeyedLocks,
}

impl AppState {
    pub(crate) fn new(settings: Settings, store: Arc<dyn Store>, redis: RedisHandle) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                store,
                redis,
                quiz_locks: KeyedLocks::default(),
                attempt_locks: KeyedLocks::default(),
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    /// Serializes quiz edits and attempt starts for one quiz.
    pub(crate) fn quiz_locks(&self) -> &KeyedLocks {
        &self.inner.quiz_locks
    }

    /// Serializes draft saves and submissions for one attempt.
    pub(crate) fn attempt_locks(&self) -> &KeyedLocks {
        &self.inner.attempt_locks
    }
}
