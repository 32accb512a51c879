use common::{Record, RecordId, RecordInput};
use tracing::{debug, warn};

use crate::ledger::{Landed, RequestLedger, Ticket};

/// Shown in place of the collection when the initial load fails.
pub const LOAD_ERROR_MESSAGE: &str = "Failed to fetch items";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditForm {
    pub title: String,
    pub description: String,
}

impl EditForm {
    pub fn to_input(&self) -> RecordInput {
        RecordInput::new(self.title.clone(), self.description.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty()
    }

    fn mirror(&mut self, record: &Record) {
        self.title = record.title.clone();
        self.description = record.description.clone();
    }

    fn clear(&mut self) {
        self.title.clear();
        self.description.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    LoadStarted,
    Loaded(Vec<Record>),
    LoadFailed,
    Created(Record),
    Updated { ticket: Ticket, record: Record },
    Deleted { ticket: Ticket },
    /// A write was refused or never reached the store. Creates carry no ticket.
    WriteFailed { ticket: Option<Ticket> },
    EditBegun(Record),
    EditCancelled,
    FormEdited(FormField, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
    /// A write response was overtaken by a newer request for the same id.
    Stale,
}

/// What a submit will do once it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSubmit {
    Create(RecordInput),
    Update { ticket: Ticket, input: RecordInput },
}

/// View state of one collection. `apply` is the only way it changes.
#[derive(Debug, Clone, Default)]
pub struct CollectionState {
    records: Vec<Record>,
    loading: bool,
    error: Option<String>,
    edit_slot: Option<RecordId>,
    form: EditForm,
    ledger: RequestLedger,
}

impl CollectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn editing(&self) -> Option<RecordId> {
        self.edit_slot
    }

    pub fn form(&self) -> &EditForm {
        &self.form
    }

    pub fn find(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Decides between create and update for `input`. Incomplete input yields
    /// `None` and leaves the state untouched.
    pub fn prepare_submit(&mut self, input: RecordInput) -> Option<PendingSubmit> {
        if !input.is_complete() {
            return None;
        }

        Some(match self.edit_slot {
            Some(id) => PendingSubmit::Update {
                ticket: self.ledger.issue(id),
                input,
            },
            None => PendingSubmit::Create(input),
        })
    }

    pub fn prepare_delete(&mut self, id: RecordId) -> Ticket {
        self.ledger.issue(id)
    }

    pub fn apply(&mut self, event: SyncEvent) -> Applied {
        match event {
            SyncEvent::LoadStarted => {
                self.loading = true;
                Applied::Changed
            }
            SyncEvent::Loaded(records) => {
                self.records = dedup_by_id(records);
                self.error = None;
                self.loading = false;
                self.ledger.clear();
                Applied::Changed
            }
            SyncEvent::LoadFailed => {
                self.records.clear();
                self.error = Some(LOAD_ERROR_MESSAGE.to_string());
                self.loading = false;
                self.ledger.clear();
                Applied::Changed
            }
            SyncEvent::Created(record) => {
                if let Some(existing) = self.records.iter_mut().find(|r| r.id == record.id) {
                    warn!(id = record.id, "store returned an id that is already present");
                    *existing = record;
                } else {
                    self.records.push(record);
                }
                if self.edit_slot.is_none() {
                    self.form.clear();
                }
                Applied::Changed
            }
            SyncEvent::Updated { ticket, record } => {
                let record = Record {
                    id: ticket.id,
                    ..record
                };
                let Some(landed) = self.ledger.settle(ticket, Landed::Updated(record)) else {
                    debug!(id = ticket.id, seq = ticket.seq, "holding back stale update response");
                    return Applied::Stale;
                };
                self.land(ticket.id, landed);
                if self.edit_slot == Some(ticket.id) {
                    self.edit_slot = None;
                    self.form.clear();
                }
                Applied::Changed
            }
            SyncEvent::Deleted { ticket } => {
                let Some(landed) = self.ledger.settle(ticket, Landed::Deleted) else {
                    debug!(id = ticket.id, seq = ticket.seq, "holding back stale delete response");
                    return Applied::Stale;
                };
                self.land(ticket.id, landed);
                Applied::Changed
            }
            SyncEvent::WriteFailed { ticket: None } => Applied::Unchanged,
            SyncEvent::WriteFailed {
                ticket: Some(ticket),
            } => match self.ledger.release(ticket) {
                Some(landed) => {
                    debug!(id = ticket.id, "applying overtaken response after failed write");
                    self.land(ticket.id, landed);
                    Applied::Changed
                }
                None => Applied::Unchanged,
            },
            SyncEvent::EditBegun(record) => {
                self.edit_slot = Some(record.id);
                self.form.mirror(&record);
                Applied::Changed
            }
            SyncEvent::EditCancelled => {
                self.edit_slot = None;
                self.form.clear();
                Applied::Changed
            }
            SyncEvent::FormEdited(field, value) => {
                match field {
                    FormField::Title => self.form.title = value,
                    FormField::Description => self.form.description = value,
                }
                Applied::Changed
            }
        }
    }

    fn land(&mut self, id: RecordId, landed: Landed) {
        match landed {
            Landed::Updated(record) => {
                if let Some(existing) = self.records.iter_mut().find(|r| r.id == id) {
                    *existing = record;
                }
            }
            Landed::Deleted => self.records.retain(|record| record.id != id),
        }
    }
}

fn dedup_by_id(records: Vec<Record>) -> Vec<Record> {
    let mut seen = std::collections::HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.id) {
            unique.push(record);
        } else {
            warn!(id = record.id, "dropping duplicate id from loaded collection");
        }
    }
    unique
}
