use bytes::Bytes;

use super::LeaseId;
use super::Revision;

/// A stored key with its revision metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Bytes,
    pub value: Bytes,
    /// Revision of the write that created the key
    pub create_revision: Revision,
    /// Revision of the latest write (or of the deletion, in delete events)
    pub mod_revision: Revision,
    /// Attached lease, `0` when none
    pub lease: LeaseId,
}

impl KeyValue {
    /// Key as UTF-8, replacing invalid sequences
    pub fn key_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    /// Value as UTF-8, replacing invalid sequences
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Key was inserted or updated
    Put,
    /// Key was deleted, explicitly or by lease expiry
    Delete,
}

/// A single change observed by a watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    /// For deletions only `key` and `mod_revision` are meaningful
    pub kv: KeyValue,
}

impl Event {
    pub fn is_put(&self) -> bool {
        self.event_type == EventType::Put
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    /// Store revision when the response was produced
    pub revision: Revision,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetResponse {
    pub header: ResponseHeader,
    pub kvs: Vec<KeyValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Store order (ascending by key)
    #[default]
    None,
    Ascend,
    Descend,
}

/// Read parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Match every key starting with the requested key
    pub prefix: bool,
    /// Read at this revision; `0` reads the latest state
    pub revision: Revision,
    /// Key ordering of the results
    pub sort: SortOrder,
}

impl GetOptions {
    pub fn prefix() -> Self {
        Self {
            prefix: true,
            ..Default::default()
        }
    }

    pub fn with_revision(
        mut self,
        revision: Revision,
    ) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_sort(
        mut self,
        sort: SortOrder,
    ) -> Self {
        self.sort = sort;
        self
    }
}

/// One operation inside a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOp {
    Get {
        key: Bytes,
        options: GetOptions,
    },
    Put {
        key: Bytes,
        value: Bytes,
        lease: Option<LeaseId>,
    },
    Delete {
        key: Bytes,
        prefix: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOpResponse {
    Get(GetResponse),
    Put,
    Delete { deleted: i64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxnResponse {
    pub header: ResponseHeader,
    /// One entry per requested operation, in request order
    pub responses: Vec<TxnOpResponse>,
}

/// Watch parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Watch every key starting with the requested key
    pub prefix: bool,
    /// First revision to deliver; `0` starts from the next change
    pub start_revision: Revision,
    /// Ask for an initial response acknowledging stream creation
    pub created_notify: bool,
}

/// One notification of a watch stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchResponse {
    pub header: ResponseHeader,
    pub events: Vec<Event>,
    /// Set when the requested start revision has been compacted;
    /// the oldest revision still available
    pub compact_revision: Revision,
    /// Acknowledges stream establishment
    pub created: bool,
    /// The server terminated this watch
    pub canceled: bool,
    /// Reason attached to a canceled or failed watch
    pub error: Option<String>,
}

impl WatchResponse {
    /// A notification carrying neither events nor lifecycle flags
    pub fn is_progress_notify(&self) -> bool {
        self.events.is_empty() && !self.created && !self.canceled && self.compact_revision == 0
    }
}
