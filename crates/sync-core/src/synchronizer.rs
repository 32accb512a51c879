use client_sdk::{RecordStore, TransportResult};
use common::{Record, RecordId, RecordInput};
use tracing::{error, info};

use crate::state::{Applied, CollectionState, FormField, PendingSubmit, SyncEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Record),
    Updated(Record),
    /// Title or description was empty; nothing was sent.
    Rejected,
    /// The store confirmed the write but a newer request for the id had been issued.
    Stale,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Stale,
    Failed,
}

/// Clears the loading flag even if the load future is dropped mid-request.
struct LoadingGuard<'a> {
    state: &'a mut CollectionState,
    finished: bool,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a mut CollectionState) -> Self {
        state.apply(SyncEvent::LoadStarted);
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self, result: TransportResult<Vec<Record>>) -> LoadOutcome {
        self.finished = true;
        match result {
            Ok(records) => {
                self.state.apply(SyncEvent::Loaded(records));
                LoadOutcome::Loaded(self.state.records().len())
            }
            Err(err) => {
                error!(error = %err, "failed to load items");
                self.state.apply(SyncEvent::LoadFailed);
                LoadOutcome::Failed
            }
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.apply(SyncEvent::LoadFailed);
        }
    }
}

/// Keeps one [`CollectionState`] in step with a remote store. State only
/// changes after the store has answered.
pub struct Synchronizer<S> {
    store: S,
    state: CollectionState,
}

impl<S: RecordStore> Synchronizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: CollectionState::new(),
        }
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn load(&mut self) -> LoadOutcome {
        let guard = LoadingGuard::start(&mut self.state);
        let result = self.store.list().await;
        let outcome = guard.finish(result);
        if let LoadOutcome::Loaded(count) = outcome {
            info!(count, "loaded items");
        }
        outcome
    }

    /// Submits the current form contents.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let input = self.state.form().to_input();
        self.submit_input(input).await
    }

    pub async fn submit_input(&mut self, input: RecordInput) -> SubmitOutcome {
        let Some(pending) = self.state.prepare_submit(input) else {
            return SubmitOutcome::Rejected;
        };

        match pending {
            PendingSubmit::Create(input) => self.send_create(input).await,
            PendingSubmit::Update { ticket, input } => {
                match self.store.update(ticket.id, &input).await {
                    Ok(record) => {
                        let applied = self.state.apply(SyncEvent::Updated {
                            ticket,
                            record: record.clone(),
                        });
                        if applied == Applied::Stale {
                            return SubmitOutcome::Stale;
                        }
                        info!(id = ticket.id, "updated item");
                        SubmitOutcome::Updated(record)
                    }
                    Err(err) => {
                        error!(error = %err, id = ticket.id, "failed to save item");
                        self.state.apply(SyncEvent::WriteFailed {
                            ticket: Some(ticket),
                        });
                        SubmitOutcome::Failed
                    }
                }
            }
        }
    }

    /// Creates a record whether or not an edit is in progress. An open edit
    /// keeps its slot and form.
    pub async fn create(&mut self, input: RecordInput) -> SubmitOutcome {
        if !input.is_complete() {
            return SubmitOutcome::Rejected;
        }
        self.send_create(input).await
    }

    async fn send_create(&mut self, input: RecordInput) -> SubmitOutcome {
        match self.store.create(&input).await {
            Ok(record) => {
                info!(id = record.id, "created item");
                self.state.apply(SyncEvent::Created(record.clone()));
                SubmitOutcome::Created(record)
            }
            Err(err) => {
                error!(error = %err, "failed to save item");
                self.state.apply(SyncEvent::WriteFailed { ticket: None });
                SubmitOutcome::Failed
            }
        }
    }

    pub fn begin_edit(&mut self, record: Record) {
        self.state.apply(SyncEvent::EditBegun(record));
    }

    /// Starts editing the loaded record with `id`. Returns false if there is none.
    pub fn begin_edit_id(&mut self, id: RecordId) -> bool {
        match self.state.find(id).cloned() {
            Some(record) => {
                self.begin_edit(record);
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&mut self) {
        self.state.apply(SyncEvent::EditCancelled);
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        self.state.apply(SyncEvent::FormEdited(field, value.into()));
    }

    pub async fn delete(&mut self, id: RecordId) -> DeleteOutcome {
        let ticket = self.state.prepare_delete(id);

        match self.store.delete(id).await {
            Ok(()) => match self.state.apply(SyncEvent::Deleted { ticket }) {
                Applied::Stale => DeleteOutcome::Stale,
                _ => {
                    info!(id, "deleted item");
                    DeleteOutcome::Deleted
                }
            },
            Err(err) => {
                error!(error = %err, id, "failed to delete item");
                self.state.apply(SyncEvent::WriteFailed {
                    ticket: Some(ticket),
                });
                DeleteOutcome::Failed
            }
        }
    }
}
