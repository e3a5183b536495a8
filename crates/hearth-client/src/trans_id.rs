//! Transaction-id generator (spec.md §4.2).
//!
//! On-wire shape is preserved bit-exactly — `"web!" + lower-hex(u32) + "!" +
//! unix-ms` — while the random source is `rand`'s OS-seeded default rather
//! than a weak per-call seed (spec.md §9's open question on this point).

use rand::Rng;

/// Produce a fresh `"web!<hex>!<unix-ms>"` transaction id.
#[must_use]
pub fn gen_trans_id() -> String {
    let random: u32 = rand::thread_rng().gen();
    let millis = chrono::Utc::now().timestamp_millis();
    format!("web!{random:x}!{millis}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn matches_expected_shape() {
        let id = gen_trans_id();
        let parts: Vec<&str> = id.split('!').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "web");
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].parse::<i64>().is_ok());
    }

    #[test]
    fn ids_are_pairwise_distinct() {
        let ids: HashSet<String> = (0..1000).map(|_| gen_trans_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
