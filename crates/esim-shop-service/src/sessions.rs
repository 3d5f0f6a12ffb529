//! In-process checkout sessions.
//!
//! Wizards are held in memory only; a restart abandons every checkout in
//! progress. Each wizard sits behind its own synchronous mutex, held only for
//! the duration of a state change and never across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use esim_shop_core::{CheckoutId, CheckoutWizard, UserId};

/// How long an untouched checkout is kept.
pub const CHECKOUT_SESSION_TTL_HOURS: i64 = 24;

struct Entry {
    owner: UserId,
    created_at: DateTime<Utc>,
    wizard: Arc<Mutex<CheckoutWizard>>,
}

/// Lock a wizard for a state change.
pub fn lock_wizard(wizard: &Mutex<CheckoutWizard>) -> MutexGuard<'_, CheckoutWizard> {
    wizard.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Live checkout wizards, by id.
#[derive(Default)]
pub struct CheckoutSessions {
    inner: RwLock<HashMap<CheckoutId, Entry>>,
}

impl CheckoutSessions {
    /// Create an empty session map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new wizard, dropping sessions past their lifetime.
    pub async fn insert(&self, wizard: CheckoutWizard) -> Arc<Mutex<CheckoutWizard>> {
        let id = wizard.id();
        let entry = Entry {
            owner: wizard.user_id(),
            created_at: wizard.created_at(),
            wizard: Arc::new(Mutex::new(wizard)),
        };
        let handle = entry.wizard.clone();

        let mut sessions = self.inner.write().await;
        let cutoff = Utc::now() - Duration::hours(CHECKOUT_SESSION_TTL_HOURS);
        let before = sessions.len();
        sessions.retain(|_, e| e.created_at > cutoff);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped stale checkout sessions");
        }
        sessions.insert(id, entry);
        handle
    }

    /// The wizard `id`, if it exists and belongs to `user_id`.
    pub async fn get(&self, user_id: UserId, id: CheckoutId) -> Option<Arc<Mutex<CheckoutWizard>>> {
        self.inner
            .read()
            .await
            .get(&id)
            .filter(|e| e.owner == user_id)
            .map(|e| e.wizard.clone())
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
