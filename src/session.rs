use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::filter::{self, FilterState, UpsertMarks};
use crate::i18n::Language;
use crate::record::ProductRecord;
use crate::table::ProductTable;
use crate::upsert::UpsertPlan;

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Per-session UI state handed to every handler
///
/// Holds what the interactive page remembers between actions: the chosen
/// language, the current filter, the marks from the last upsert preview and
/// the plan waiting for confirmation.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub language: Language,
    pub filter: FilterState,
    pub marks: UpsertMarks,
    pub pending: Option<UpsertPlan>,
    expires_at: SystemTime,
}

impl SessionContext {
    pub fn new(language: Language) -> Self {
        SessionContext {
            language,
            filter: FilterState::default(),
            marks: UpsertMarks::default(),
            pending: None,
            expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= SystemTime::now()
    }

    /// Rows of `table` visible under this session's filter and view mode
    pub fn visible<'a>(&self, table: &'a ProductTable) -> Vec<&'a ProductRecord> {
        filter::apply(table, &self.filter, &self.marks)
    }

    /// Remember a previewed upload and flag its new and updated models
    pub fn stage(&mut self, plan: UpsertPlan) {
        self.marks = plan.marks();
        self.pending = Some(plan);
    }

    /// Take the staged plan for applying; marks stay for the view filter
    pub fn take_pending(&mut self) -> Option<UpsertPlan> {
        self.pending.take()
    }
}

/// Session contexts keyed by session id
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionContext>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the context for `id`, creating a fresh one when the id
    /// is unknown or expired
    pub fn with<R>(&self, id: &str, language: Language, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.retain(|_, ctx| !ctx.is_expired());
        let ctx = sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionContext::new(language));
        f(ctx)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
