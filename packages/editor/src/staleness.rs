//! # Render-Data Staleness
//!
//! Tracks whether previously fetched render data still matches the page.
//!
//! ```text
//!   clean ──edit──▶ stale ──begin_refetch──▶ refetching ──complete──▶ clean
//!                     ▲                           │
//!                     └────── fail / cancel ──────┘
//! ```
//!
//! Two config slots are kept. `committed` is the config the current render
//! data was fetched for. `pending` buffers edits made since; it is promoted
//! when a refetch completes. Each refetch carries a ticket, and only the
//! most recently issued ticket may complete.

use std::sync::Arc;

use pagewright_common::PageConfig;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Opaque data bag keyed by data-source key
pub type RenderData = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Clean,
    Stale,
    Refetching,
}

/// Handle for one render-data fetch
#[derive(Debug, Clone)]
pub struct RefetchTicket {
    generation: u64,
    config: Arc<PageConfig>,
}

impl RefetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The config to fetch render data for
    pub fn config(&self) -> &Arc<PageConfig> {
        &self.config
    }
}

#[derive(Debug)]
pub struct StalenessCoordinator {
    committed: Arc<PageConfig>,
    pending: Option<Arc<PageConfig>>,
    status: RenderStatus,
    generation: u64,
    in_flight: Option<u64>,
    invalidated_in_flight: bool,
    render_data: Option<Arc<RenderData>>,
    last_error: Option<String>,
}

impl StalenessCoordinator {
    /// Starts stale: nothing has been fetched yet
    pub fn new(config: PageConfig) -> Self {
        Self {
            committed: Arc::new(config),
            pending: None,
            status: RenderStatus::Stale,
            generation: 0,
            in_flight: None,
            invalidated_in_flight: false,
            render_data: None,
            last_error: None,
        }
    }

    pub fn committed(&self) -> &Arc<PageConfig> {
        &self.committed
    }

    pub fn pending(&self) -> Option<&Arc<PageConfig>> {
        self.pending.as_ref()
    }

    /// Latest config, pending if any
    pub fn current(&self) -> &Arc<PageConfig> {
        self.pending.as_ref().unwrap_or(&self.committed)
    }

    pub fn status(&self) -> RenderStatus {
        self.status
    }

    pub fn is_refetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn render_data(&self) -> Option<&Arc<RenderData>> {
        self.render_data.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record a new config
    pub fn commit(&mut self, next: Arc<PageConfig>, invalidates: bool) {
        if invalidates || self.pending.is_some() || self.in_flight.is_some() {
            self.pending = Some(next);
        } else {
            self.committed = next;
        }

        if invalidates {
            self.mark_stale();
        }
    }

    pub fn mark_stale(&mut self) {
        if self.in_flight.is_some() {
            self.invalidated_in_flight = true;
        } else {
            self.status = RenderStatus::Stale;
        }
    }

    /// Start a fetch for the current config, superseding any in flight
    pub fn begin_refetch(&mut self) -> RefetchTicket {
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.invalidated_in_flight = false;
        self.status = RenderStatus::Refetching;

        RefetchTicket {
            generation: self.generation,
            config: Arc::clone(self.current()),
        }
    }

    /// Returns false if the ticket was superseded and the data dropped
    pub fn complete_refetch(&mut self, ticket: &RefetchTicket, data: RenderData) -> bool {
        if !self.accepts(ticket) {
            return false;
        }

        self.in_flight = None;
        self.render_data = Some(Arc::new(data));
        self.last_error = None;

        if self.invalidated_in_flight {
            self.committed = Arc::clone(&ticket.config);
            if self
                .pending
                .as_ref()
                .is_some_and(|p| Arc::ptr_eq(p, &ticket.config))
            {
                self.pending = None;
            }
            self.status = RenderStatus::Stale;
        } else {
            if let Some(pending) = self.pending.take() {
                self.committed = pending;
            }
            self.status = RenderStatus::Clean;
        }
        self.invalidated_in_flight = false;

        true
    }

    /// Returns false if the ticket was superseded
    pub fn fail_refetch(&mut self, ticket: &RefetchTicket, error: impl Into<String>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }

        self.in_flight = None;
        self.invalidated_in_flight = false;
        self.last_error = Some(error.into());
        self.status = RenderStatus::Stale;
        true
    }

    /// Invalidate every outstanding ticket
    pub fn cancel_refetch(&mut self) {
        if self.in_flight.take().is_some() {
            self.invalidated_in_flight = false;
            self.status = RenderStatus::Stale;
        }
    }

    /// Swap the whole config, dropping render data and any fetch in flight
    pub fn replace(&mut self, config: PageConfig) {
        self.committed = Arc::new(config);
        self.pending = None;
        self.in_flight = None;
        self.invalidated_in_flight = false;
        self.render_data = None;
        self.status = RenderStatus::Stale;
    }

    fn accepts(&self, ticket: &RefetchTicket) -> bool {
        if self.in_flight == Some(ticket.generation) {
            return true;
        }
        debug!(
            generation = ticket.generation,
            current = ?self.in_flight,
            "dropping superseded refetch"
        );
        false
    }
}
