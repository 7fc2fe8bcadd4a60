//! Post-commit change notifications.
//!
//! Hooks run synchronously after a transaction commits, never after a rollback.
//! Delivery to subscribers (sockets, queues) is the hook's business.

use serde::Serialize;
use wf_core::EventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One event touched by a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeNotice {
    pub kind: ChangeKind,
    pub event_id: EventId,
    pub event_type: String,
}

/// Receives the changes of each committed operation.
pub trait CommitHook: Send {
    fn on_commit(&self, changes: &[ChangeNotice]);
}

impl<F> CommitHook for F
where
    F: Fn(&[ChangeNotice]) + Send,
{
    fn on_commit(&self, changes: &[ChangeNotice]) {
        self(changes);
    }
}
