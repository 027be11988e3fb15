//! Parts catalog lookups.
//!
//! Two modes against one [`CatalogLookupService`]:
//! - **code**: explicit, exact, at most one match; a match is applied to the row.
//! - **description**: fired while typing after a debounce; returns a bounded,
//!   ordered list the user picks from.
//!
//! Lookups never touch the store directly. Dispatch hands out a
//! [`LookupTicket`] carrying the term in effect at that moment; the host runs
//! it (inline via [`perform`], or off-thread via [`perform_async`]) and feeds
//! the reply back to `Reconciler::resolve_lookup`. A reply whose captured term
//! no longer matches the row's current term is dropped. There is no
//! cancellation primitive.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use fieldrev_core::CatalogPart;

use crate::config::LookupConfig;
use crate::error::LookupError;
use crate::store::RowId;

/// External parts catalog.
pub trait CatalogLookupService {
    /// Exact code match. Codes are unique in the catalog.
    fn search_by_code(&self, code: &str) -> Result<Option<CatalogPart>, LookupError>;

    /// Ordered fuzzy matches on description, at most `limit` entries.
    fn search_by_description(&self, term: &str, limit: usize)
        -> Result<Vec<CatalogPart>, LookupError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupMode {
    Code,
    Description,
}

impl std::fmt::Display for LookupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Description => write!(f, "description"),
        }
    }
}

/// A dispatched lookup. Captures the term it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    row: RowId,
    mode: LookupMode,
    term: String,
    limit: usize,
    seq: u64,
}

impl LookupTicket {
    pub fn row(&self) -> RowId {
        self.row
    }

    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupReply {
    Match(Option<CatalogPart>),
    Suggestions(Vec<CatalogPart>),
}

/// Non-blocking notice shown inline on the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupAdvisory {
    NotFound { code: String },
    Failed { message: String },
}

impl std::fmt::Display for LookupAdvisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { code } => write!(f, "no catalog part with code '{code}'"),
            Self::Failed { message } => write!(f, "{message}"),
        }
    }
}

/// Result of feeding a reply back into the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// Unique code match written to the row.
    Applied(CatalogPart),
    NotFound,
    /// Fuzzy results stored on the row for selection.
    Suggestions(usize),
    Failed(String),
    /// Row changed (or went away) since dispatch; reply dropped.
    Stale,
}

// ---------------------------------------------------------------------------
// Per-row bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSearch {
    term: String,
    due_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct PartLookupState {
    searching: Option<LookupMode>,
    suggestions: Vec<CatalogPart>,
    advisory: Option<LookupAdvisory>,
    pending: Option<PendingSearch>,
    last_seq: u64,
}

impl PartLookupState {
    /// Mode of the most recently dispatched, still unresolved lookup.
    pub fn searching(&self) -> Option<LookupMode> {
        self.searching
    }

    pub fn suggestions(&self) -> &[CatalogPart] {
        &self.suggestions
    }

    pub fn advisory(&self) -> Option<&LookupAdvisory> {
        self.advisory.as_ref()
    }

    /// Description term waiting out the debounce, if any.
    pub fn pending_term(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.term.as_str())
    }
}

#[derive(Debug, Default)]
pub(crate) struct LookupBook {
    states: HashMap<RowId, PartLookupState>,
    next_seq: u64,
}

impl LookupBook {
    pub(crate) fn get(&self, row: RowId) -> Option<&PartLookupState> {
        self.states.get(&row)
    }

    fn entry(&mut self, row: RowId) -> &mut PartLookupState {
        self.states.entry(row).or_default()
    }

    pub(crate) fn dispatch(
        &mut self,
        row: RowId,
        mode: LookupMode,
        term: String,
        limit: usize,
    ) -> LookupTicket {
        self.next_seq += 1;
        let seq = self.next_seq;
        let state = self.entry(row);
        state.searching = Some(mode);
        state.last_seq = seq;
        state.advisory = None;
        if mode == LookupMode::Description {
            state.pending = None;
        }
        log::debug!("dispatch {mode} lookup #{seq} for {row}: '{term}'");
        LookupTicket { row, mode, term, limit, seq }
    }

    /// Restart the debounce window for a description term.
    pub(crate) fn schedule_description(&mut self, row: RowId, term: String, due_at: Instant) {
        self.entry(row).pending = Some(PendingSearch { term, due_at });
    }

    /// Term fell below the threshold: drop pending search and stale results.
    pub(crate) fn clear_description(&mut self, row: RowId) {
        if let Some(state) = self.states.get_mut(&row) {
            state.pending = None;
            state.suggestions.clear();
        }
    }

    pub(crate) fn clear_advisory(&mut self, row: RowId) {
        if let Some(state) = self.states.get_mut(&row) {
            state.advisory = None;
        }
    }

    /// Take every pending description search whose debounce has elapsed.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<(RowId, String)> {
        let mut due: Vec<(RowId, String)> = self
            .states
            .iter_mut()
            .filter(|(_, s)| s.pending.as_ref().is_some_and(|p| p.due_at <= now))
            .filter_map(|(row, s)| s.pending.take().map(|p| (*row, p.term)))
            .collect();
        due.sort_by_key(|(row, _)| *row);
        due
    }

    /// Whether `ticket` is the row's most recent dispatch. Tickets issued
    /// before a newer dispatch, or before the row's state was forgotten,
    /// are never latest.
    pub(crate) fn is_latest(&self, ticket: &LookupTicket) -> bool {
        self.states.get(&ticket.row).is_some_and(|s| s.last_seq == ticket.seq)
    }

    /// Mark the latest ticket resolved.
    pub(crate) fn finish(&mut self, ticket: &LookupTicket) {
        if let Some(state) = self.states.get_mut(&ticket.row) {
            state.searching = None;
        }
    }

    pub(crate) fn set_advisory(&mut self, row: RowId, advisory: LookupAdvisory) {
        self.entry(row).advisory = Some(advisory);
    }

    pub(crate) fn set_suggestions(&mut self, row: RowId, suggestions: Vec<CatalogPart>) {
        self.entry(row).suggestions = suggestions;
    }

    pub(crate) fn suggestion(&self, row: RowId, index: usize) -> Option<&CatalogPart> {
        self.states.get(&row).and_then(|s| s.suggestions.get(index))
    }

    /// Catalog fields were written to the row; results and notices are spent.
    pub(crate) fn applied(&mut self, row: RowId) {
        if let Some(state) = self.states.get_mut(&row) {
            state.suggestions.clear();
            state.advisory = None;
            state.pending = None;
        }
    }

    /// Row left editing or was removed. Later replies find no state and are
    /// rejected as stale by the reconciler.
    pub(crate) fn forget(&mut self, row: RowId) {
        self.states.remove(&row);
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run a ticket against the service on the current thread.
pub fn perform<S>(service: &S, ticket: &LookupTicket) -> Result<LookupReply, LookupError>
where
    S: CatalogLookupService + ?Sized,
{
    match ticket.mode {
        LookupMode::Code => service.search_by_code(&ticket.term).map(LookupReply::Match),
        LookupMode::Description => service
            .search_by_description(&ticket.term, ticket.limit)
            .map(LookupReply::Suggestions),
    }
}

/// Run a ticket on smol's blocking pool. The ticket comes back with the
/// reply so the caller can hand both to `Reconciler::resolve_lookup`.
pub async fn perform_async<S>(
    service: Arc<S>,
    ticket: LookupTicket,
) -> (LookupTicket, Result<LookupReply, LookupError>)
where
    S: CatalogLookupService + Send + Sync + ?Sized + 'static,
{
    smol::unblock(move || {
        let reply = perform(&*service, &ticket);
        (ticket, reply)
    })
    .await
}

/// Sleep for the configured description debounce.
pub async fn debounce(config: &LookupConfig) {
    smol::Timer::after(config.debounce()).await;
}
