//! Reactive views over the session state.

use smartclinic_domain::{ElementVisibility, PermissionDiff, VisibilityBinding, compare_permissions};
use tokio::sync::watch;
use tracing::debug;

use crate::session_service::{SessionContext, SessionState};

/// Visibility of one bound control, recomputed whenever the session changes.
pub struct BoundVisibility {
    binding: VisibilityBinding,
    receiver: watch::Receiver<SessionState>,
    current: ElementVisibility,
}

impl BoundVisibility {
    /// Binds a control to the session.
    #[must_use]
    pub fn new(session: &SessionContext, binding: VisibilityBinding) -> Self {
        let mut receiver = session.subscribe();
        let current = binding.evaluate(&receiver.borrow_and_update().grants);
        Self {
            binding,
            receiver,
            current,
        }
    }

    /// Returns the binding.
    #[must_use]
    pub fn binding(&self) -> &VisibilityBinding {
        &self.binding
    }

    /// Returns the latest computed visibility.
    #[must_use]
    pub fn current(&self) -> ElementVisibility {
        self.current
    }

    /// Waits until the computed visibility differs from [`Self::current`].
    ///
    /// Returns `None` once the session context is gone.
    pub async fn changed(&mut self) -> Option<ElementVisibility> {
        loop {
            self.receiver.changed().await.ok()?;
            let next = self.binding.evaluate(&self.receiver.borrow_and_update().grants);
            if next != self.current {
                self.current = next;
                return Some(next);
            }
        }
    }
}

/// Reports permission list changes after the first load.
pub struct PermissionChangeWatcher {
    receiver: watch::Receiver<SessionState>,
    previous: Vec<String>,
}

impl PermissionChangeWatcher {
    /// Starts watching; permissions already loaded count as the baseline.
    #[must_use]
    pub fn new(session: &SessionContext) -> Self {
        let mut receiver = session.subscribe();
        let previous = receiver.borrow_and_update().grants.permissions().to_vec();
        Self { receiver, previous }
    }

    /// Waits for the next change of the permission list.
    ///
    /// A load onto an empty baseline is recorded without being reported.
    /// Returns `None` once the session context is gone.
    pub async fn next_change(&mut self) -> Option<PermissionDiff> {
        loop {
            self.receiver.changed().await.ok()?;
            let current = self
                .receiver
                .borrow_and_update()
                .grants
                .permissions()
                .to_vec();

            if self.previous.is_empty() {
                self.previous = current;
                continue;
            }

            let diff = compare_permissions(&self.previous, &current);
            self.previous = current;
            if diff.has_changes() {
                debug!(
                    added = diff.added.len(),
                    removed = diff.removed.len(),
                    "permissions changed"
                );
                return Some(diff);
            }
        }
    }
}
