use chrono::Utc;

use crate::db_types::OrderId;

/// Generates a fresh merchant order id of the form `{prefix}{yyyyMMddHHmmssSSS}{8 hex digits}`.
///
/// The millisecond timestamp keeps ids roughly sortable and the 32 random bits make collisions across restarts and
/// across instances vanishingly unlikely. Nothing here depends on in-process state.
pub fn new_order_id(prefix: &str) -> OrderId {
    let ts = Utc::now().format("%Y%m%d%H%M%S%3f");
    let nonce = rand::random::<u32>();
    OrderId(format!("{prefix}{ts}{nonce:08X}"))
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_are_prefixed_and_fixed_length() {
        let id = new_order_id("UP");
        assert!(id.as_str().starts_with("UP"));
        assert_eq!(id.as_str().len(), 2 + 17 + 8);
        assert!(id.as_str()[2..].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_are_unique() {
        let ids = (0..1_000).map(|_| new_order_id("MB")).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 1_000);
    }
}
