//! Entity identifier generation

use uuid::Uuid;

/// Generate a new entity id.
///
/// Ids are UUIDv7 strings: time-ordered, so their lexicographic order matches
/// creation order. Cursor pagination anchors on this property.
pub fn new_entity_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn ids_are_unique() {
        let a = new_entity_id();
        let b = new_entity_id();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let first = new_entity_id();
        // UUIDv7 has millisecond timestamp precision
        sleep(Duration::from_millis(2));
        let second = new_entity_id();
        assert!(first < second);
    }
}
