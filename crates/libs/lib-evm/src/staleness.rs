//! Discard query results that resolve after their context moved on.
//!
//! Provider calls cannot be cancelled. Instead a view issues a [`QueryTicket`] before
//! starting a query and hands the result back through [`StaleGuard::accept`], which drops
//! it if a newer query was issued, the view cancelled, or the session invalidated its
//! reads in the meantime.
//!
//! ```rust,ignore
//! let ticket = guard.issue();
//! let details = client.fetch_details(address).await;
//! if let Some(details) = guard.accept(ticket, details) {
//!     view.set(details);
//! }
//! ```

use crate::session::WalletSession;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket {
    seq: u64,
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct StaleGuard {
    latest: Arc<AtomicU64>,
    session: WalletSession,
}

impl StaleGuard {
    pub fn new(session: WalletSession) -> Self {
        Self {
            latest: Arc::new(AtomicU64::new(0)),
            session,
        }
    }

    /// Start a query; every earlier ticket becomes stale.
    pub fn issue(&self) -> QueryTicket {
        QueryTicket {
            seq: self.latest.fetch_add(1, Ordering::AcqRel) + 1,
            epoch: self.session.epoch(),
        }
    }

    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        ticket.seq == self.latest.load(Ordering::Acquire) && ticket.epoch == self.session.epoch()
    }

    pub fn accept<T>(&self, ticket: QueryTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!(seq = ticket.seq, "Discarding stale query result");
            None
        }
    }

    /// The consuming view went away; nothing outstanding may be applied.
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }
}
