use std::collections::HashMap;

use common::{Record, RecordId};

/// Sequence number taken by a write against one record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub id: RecordId,
    pub seq: u64,
}

/// A write the store has confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Landed {
    Updated(Record),
    Deleted,
}

#[derive(Debug, Clone, Default)]
struct Outstanding {
    /// Issued and unanswered, ascending.
    seqs: Vec<u64>,
    /// Newest confirmed response that was overtaken by a still pending request.
    overtaken: Option<(u64, Landed)>,
}

impl Outstanding {
    fn newest(&self) -> Option<u64> {
        self.seqs.last().copied()
    }

    fn remove(&mut self, seq: u64) -> bool {
        match self.seqs.iter().position(|s| *s == seq) {
            Some(index) => {
                self.seqs.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Tracks unanswered writes per record id, so a response that was overtaken
/// by a later request for the same id can be recognised and held back.
#[derive(Debug, Clone, Default)]
pub struct RequestLedger {
    next_seq: u64,
    outstanding: HashMap<RecordId, Outstanding>,
}

impl RequestLedger {
    pub fn issue(&mut self, id: RecordId) -> Ticket {
        self.next_seq += 1;
        self.outstanding
            .entry(id)
            .or_default()
            .seqs
            .push(self.next_seq);
        Ticket {
            id,
            seq: self.next_seq,
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.outstanding
            .get(&ticket.id)
            .and_then(Outstanding::newest)
            == Some(ticket.seq)
    }

    /// Records a confirmed response. Returns what to apply, or `None` when a
    /// newer request for the id is still unanswered or has already landed.
    /// Applying the newest response retires every older ticket for the id.
    pub fn settle(&mut self, ticket: Ticket, landed: Landed) -> Option<Landed> {
        if self.is_current(ticket) {
            self.outstanding.remove(&ticket.id);
            return Some(landed);
        }

        let entry = self.outstanding.get_mut(&ticket.id)?;
        if entry.remove(ticket.seq) {
            let newer = entry
                .overtaken
                .as_ref()
                .is_none_or(|(seq, _)| ticket.seq > *seq);
            if newer {
                entry.overtaken = Some((ticket.seq, landed));
            }
        }
        None
    }

    /// Releases a ticket whose request failed. If no newer request is left
    /// unanswered, the newest overtaken confirmation becomes the one to apply.
    pub fn release(&mut self, ticket: Ticket) -> Option<Landed> {
        let entry = self.outstanding.get_mut(&ticket.id)?;
        entry.remove(ticket.seq);

        let overtaken_wins = match (&entry.overtaken, entry.newest()) {
            (Some((seq, _)), Some(newest)) => *seq > newest,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if overtaken_wins || entry.seqs.is_empty() {
            let entry = self.outstanding.remove(&ticket.id)?;
            return entry.overtaken.map(|(_, landed)| landed);
        }
        None
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.outstanding.values().map(|entry| entry.seqs.len()).sum()
    }

    pub fn clear(&mut self) {
        self.outstanding.clear();
    }
}
