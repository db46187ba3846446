//! Offset resolver: a pure function mapping a stored offset (if any), a
//! reset strategy, and an optional explicit override to a broker-facing
//! [`Offset`], independent of any particular wire request.

use rand::Rng;

/// Signed 64-bit partition offset.
pub type Offset = i64;

pub const BEGINNING: Offset = 0;
pub const END: Offset = -1;
pub const COMMITTED: Offset = -2;
pub const EARLIEST_TIMESTAMP: Offset = -3;

/// Offset reset strategy. `stored` is read as "last delivered", not
/// "next to read": `StoredOrX` modes compute `stored + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetStrategy {
    Earliest,
    Latest,
    StoredOrEarliest,
    StoredOrLatest,
}

/// Resolves `(stored?, strategy, explicit?)` to a broker-facing offset.
/// `explicit`, when supplied, overrides all other inputs.
pub fn resolve(stored: Option<Offset>, strategy: OffsetStrategy, explicit: Option<Offset>) -> Offset {
    if let Some(explicit) = explicit {
        return explicit;
    }

    match (strategy, stored) {
        (OffsetStrategy::Earliest, _) => BEGINNING,
        (OffsetStrategy::Latest, _) => END,
        (OffsetStrategy::StoredOrEarliest, Some(stored)) => stored + 1,
        (OffsetStrategy::StoredOrEarliest, None) => BEGINNING,
        (OffsetStrategy::StoredOrLatest, Some(stored)) => stored + 1,
        (OffsetStrategy::StoredOrLatest, None) => END,
    }
}

/// Synthesizes a consumer identity from an optional group/instance pair.
/// Returns `None` if `group` is `None` or empty; otherwise
/// `"{group}-{instance}"` when an instance id is given, else
/// `"{group}-{rand8hex}"` using 8 lowercase hex characters drawn from
/// `rand`'s OS-seeded default RNG.
pub fn get_consumer_id(group: Option<&str>, instance: Option<&str>) -> Option<String> {
    let group = group.filter(|g| !g.is_empty())?;

    match instance {
        Some(instance) => Some(format!("{group}-{instance}")),
        None => {
            let suffix: String = (0..8)
                .map(|_| {
                    let nibble = rand::thread_rng().gen_range(0..16u8);
                    std::char::from_digit(nibble as u32, 16).unwrap()
                })
                .collect();
            Some(format!("{group}-{suffix}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_table() {
        for (stored, strategy, explicit, want) in [
            (None, OffsetStrategy::Earliest, None, BEGINNING),
            (Some(0), OffsetStrategy::Earliest, None, BEGINNING),
            (Some(99), OffsetStrategy::Earliest, None, BEGINNING),
            (None, OffsetStrategy::Latest, None, END),
            (Some(99), OffsetStrategy::Latest, None, END),
            (None, OffsetStrategy::StoredOrEarliest, None, BEGINNING),
            (Some(99), OffsetStrategy::StoredOrEarliest, None, 100),
            (None, OffsetStrategy::StoredOrLatest, None, END),
            (Some(99), OffsetStrategy::StoredOrLatest, None, 100),
            // explicit overrides everything
            (Some(99), OffsetStrategy::Earliest, Some(50), 50),
            (None, OffsetStrategy::Latest, Some(50), 50),
        ] {
            assert_eq!(resolve(stored, strategy, explicit), want);
        }
    }

    #[test]
    fn test_offset_reset_scenario_6() {
        assert_eq!(resolve(None, OffsetStrategy::Earliest, None), 0);
        assert_eq!(resolve(None, OffsetStrategy::Latest, None), -1);
        assert_eq!(resolve(Some(99), OffsetStrategy::StoredOrEarliest, None), 100);
    }

    #[test]
    fn test_consumer_id_none_on_empty_or_missing_group() {
        assert_eq!(get_consumer_id(None, None), None);
        assert_eq!(get_consumer_id(Some(""), None), None);
    }

    #[test]
    fn test_consumer_id_with_instance() {
        assert_eq!(
            get_consumer_id(Some("checkout"), Some("worker-1")),
            Some("checkout-worker-1".to_string())
        );
    }

    #[test]
    fn test_consumer_id_random_suffix_shape() {
        let id = get_consumer_id(Some("checkout"), None).unwrap();
        let (group, suffix) = id.rsplit_once('-').unwrap();
        assert_eq!(group, "checkout");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
