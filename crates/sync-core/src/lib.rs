//! Confirmed-write synchronization of a record collection with a remote store.
//!
//! [`CollectionState`] holds the view state and changes only through
//! [`CollectionState::apply`]. [`Synchronizer`] issues one store request per
//! operation and applies the matching event once the store has answered.

mod ledger;
mod state;
mod synchronizer;

pub use ledger::{Landed, RequestLedger, Ticket};
pub use state::{
    Applied, CollectionState, EditForm, FormField, LOAD_ERROR_MESSAGE, PendingSubmit, SyncEvent,
};
pub use synchronizer::{DeleteOutcome, LoadOutcome, SubmitOutcome, Synchronizer};
