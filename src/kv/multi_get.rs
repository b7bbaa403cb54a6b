use std::collections::HashMap;

use bytes::Bytes;
use tracing::debug;
use tracing::trace;

use crate::constants::KEY_SEPARATOR;
use crate::CoordinationStore;
use crate::GetOptions;
use crate::KeyValue;
use crate::Result;
use crate::Revision;
use crate::SortOrder;
use crate::TxnOp;
use crate::TxnOpResponse;

/// Reads `keys` (each as a prefix) at one consistent revision
///
/// Requests are split into transactions of at most `max_ops` reads. The
/// first transaction reads the latest state and every later one is pinned
/// to the revision it observed, so the whole result reflects a single
/// point in time even though it spans several round trips.
///
/// Each returned key is kept only if it belongs to the requested key it was
/// read for: an exact match, or a descendant on a `/` boundary. Values are
/// decoded as lossy UTF-8. No store call is made for an empty `keys`.
///
/// # Errors
/// Propagates the first store failure; a compacted pinned revision surfaces
/// as [`crate::StoreError::Compacted`].
pub async fn get_values(
    store: &dyn CoordinationStore,
    keys: &[String],
    max_ops: usize,
) -> Result<HashMap<String, String>> {
    let mut values = HashMap::new();
    if keys.is_empty() {
        return Ok(values);
    }

    let batch_size = max_ops.max(1);
    let mut pinned: Option<Revision> = None;

    for (batch_index, batch) in keys.chunks(batch_size).enumerate() {
        let options = GetOptions::prefix()
            .with_sort(SortOrder::Descend)
            .with_revision(pinned.unwrap_or(0));
        let ops = batch
            .iter()
            .map(|key| TxnOp::Get {
                key: Bytes::copy_from_slice(key.as_bytes()),
                options,
            })
            .collect();

        let response = store.txn(ops).await?;
        let revision = *pinned.get_or_insert(response.header.revision);
        trace!(batch = batch_index, keys = batch.len(), revision, "Multi-get batch read");

        for (requested, op_response) in batch.iter().zip(response.responses) {
            let TxnOpResponse::Get(get) = op_response else {
                continue;
            };
            for kv in get.kvs.into_iter().filter(|kv| matches_requested(requested, kv)) {
                values.insert(kv.key_str().into_owned(), kv.value_str().into_owned());
            }
        }
    }

    debug!(
        requested = keys.len(),
        found = values.len(),
        revision = pinned.unwrap_or_default(),
        "Multi-get completed"
    );
    Ok(values)
}

/// Whether `kv` was read for `requested` rather than a sibling sharing its prefix
pub fn matches_requested(
    requested: &str,
    kv: &KeyValue,
) -> bool {
    let key = kv.key_str();
    if key == requested {
        return true;
    }
    let Some(rest) = key.strip_prefix(requested) else {
        return false;
    };
    requested.ends_with(KEY_SEPARATOR) || rest.starts_with(KEY_SEPARATOR)
}
