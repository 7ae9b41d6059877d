//! Recursive merge over JSON value trees.
//!
//! The persisted form of a state tree is a `serde_json::Value`: null,
//! primitive, sequence, or ordered map (the crate is built with
//! `preserve_order`, so object key order survives a merge round-trip).

use serde_json::Value;

/// Merge `overlay` onto `base` with overlay priority.
///
/// When both sides are objects the merge recurses key by key: keys present
/// only in `base` are kept, keys present in both are merged recursively, keys
/// present only in `overlay` are appended. Any other pairing replaces `base`
/// with `overlay` wholesale, so a sequence or primitive on either side is
/// never spliced.
pub fn merge_or_replace(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, incoming) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => {
                        // take() swaps Null in so the previous value can move
                        // through the recursion without cloning
                        let previous = slot.take();
                        *slot = merge_or_replace(previous, incoming);
                    }
                    None => {
                        base.insert(key, incoming);
                    }
                }
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}
