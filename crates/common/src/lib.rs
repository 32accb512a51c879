use serde::{Deserialize, Serialize};

pub type RecordId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub description: String,
}

impl Record {
    pub fn new(id: RecordId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
        }
    }

    /// The client-editable part of this record.
    pub fn input(&self) -> RecordInput {
        RecordInput {
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

/// Fields a client may submit. The id is always assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RecordInput {
    pub title: String,
    pub description: String,
}

impl RecordInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Both fields are required; whitespace alone does not count.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    pub month: String,
    pub sales: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
}
