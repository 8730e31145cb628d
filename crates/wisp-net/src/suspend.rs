//! Suspension/resumption of script contexts
//!
//! An extension that cannot finish synchronously marks its context blocked
//! and returns `NativeCallResult::Suspend`. Whoever later produces the result
//! (the link event classifier on the stack's callback thread, the socket
//! poller on its own thread) calls `Suspender::resume`, which posts a
//! `Resumption` on a channel. The scheduler drains that channel between
//! context runs through its `ResumeQueue`; resumers never touch scheduler
//! state directly.
//!
//! The blocked set decides who wins: removing a context from it is atomic,
//! and only the caller that removed the entry sends the value. A second
//! resume, a resume after `cancel`, or a resume for an unknown context
//! returns false and drops the value.

use crate::wait::WaitKind;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use std::time::Duration;
use wisp_sdk::{ContextId, ScriptValue};

/// Result delivered to a parked context
#[derive(Debug, PartialEq)]
pub struct Resumption {
    /// Context to reschedule
    pub context: ContextId,
    /// Return value of the call that suspended it
    pub value: ScriptValue,
}

/// Cross-thread entry point for parking and waking contexts.
pub struct Suspender {
    /// Contexts parked by an extension, with what they wait for
    blocked: DashMap<ContextId, WaitKind>,
    /// Channel: resumers → scheduler
    resume_tx: Sender<Resumption>,
}

/// Scheduler side of the resumption channel.
pub struct ResumeQueue {
    resume_rx: Receiver<Resumption>,
}

impl Suspender {
    /// Create a suspender and the queue the scheduler drains.
    pub fn channel() -> (Suspender, ResumeQueue) {
        let (resume_tx, resume_rx) = channel::unbounded();
        (
            Suspender {
                blocked: DashMap::new(),
                resume_tx,
            },
            ResumeQueue { resume_rx },
        )
    }

    /// Mark `context` blocked on `kind`.
    ///
    /// Returns false if the context is already blocked; a parked context
    /// cannot be issuing calls, so callers treat that as fatal.
    pub fn suspend(&self, context: ContextId, kind: WaitKind) -> bool {
        match self.blocked.entry(context) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(kind);
                log::debug!("{:?} suspended on {:?}", context, kind);
                true
            }
        }
    }

    /// Deliver `value` as the result of the call that suspended `context`.
    ///
    /// Returns false if the context is not blocked. The value is dropped in
    /// that case.
    pub fn resume(&self, context: ContextId, value: ScriptValue) -> bool {
        let Some((_, kind)) = self.blocked.remove(&context) else {
            log::debug!("resume of {:?} ignored: not blocked", context);
            return false;
        };
        log::debug!("resuming {:?} ({:?}) with {:?}", context, kind, value);
        if self.resume_tx.send(Resumption { context, value }).is_err() {
            log::warn!("scheduler gone, dropping resumption for {:?}", context);
            return false;
        }
        true
    }

    /// Forget a blocked context that the runtime tore down.
    ///
    /// Any later `resume` for it is a no-op.
    pub fn cancel(&self, context: ContextId) -> bool {
        let removed = self.blocked.remove(&context).is_some();
        if removed {
            log::debug!("{:?} cancelled while blocked", context);
        }
        removed
    }

    /// Undo a `suspend` whose operation failed before anyone could resume it.
    pub fn withdraw(&self, context: ContextId) -> bool {
        self.blocked.remove(&context).is_some()
    }

    /// Check if `context` is currently parked
    pub fn is_blocked(&self, context: ContextId) -> bool {
        self.blocked.contains_key(&context)
    }

    /// What `context` is parked on, if anything
    pub fn blocked_on(&self, context: ContextId) -> Option<WaitKind> {
        self.blocked.get(&context).map(|entry| *entry)
    }
}

impl ResumeQueue {
    /// Take the next pending resumption without waiting.
    pub fn try_next(&self) -> Option<Resumption> {
        self.resume_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next resumption.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Resumption> {
        match self.resume_rx.recv_timeout(timeout) {
            Ok(r) => Some(r),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take every pending resumption.
    pub fn drain(&self) -> Vec<Resumption> {
        self.resume_rx.try_iter().collect()
    }

    /// Number of resumptions waiting to be drained
    pub fn len(&self) -> usize {
        self.resume_rx.len()
    }

    /// Check if nothing is waiting to be drained
    pub fn is_empty(&self) -> bool {
        self.resume_rx.is_empty()
    }
}
