//! Deterministic ordering of read-back tables.

use std::cmp::Ordering;

use serde_json::Value;

use super::SortOrder;

/// Stably sort table entries by the value each holds under `key`.
///
/// Entries without the key keep their relative order after all keyed entries.
pub fn sort_table(entries: &mut [Value], key: &str, order: SortOrder) {
    if order == SortOrder::Disabled {
        return;
    }
    entries.sort_by(|a, b| match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => compare_values(x, y, order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn compare_values(a: &Value, b: &Value, order: SortOrder) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (integer(x), integer(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or_default();
                let y = y.as_f64().unwrap_or_default();
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => match order {
            SortOrder::Natural => natural_cmp(x, y),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Integral JSON numbers widened so signed and unsigned keys compare exactly.
fn integer(n: &serde_json::Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Compare strings treating runs of digits as numbers: `port2 < port10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut xs = a.chars().peekable();
    let mut ys = b.chars().peekable();

    loop {
        match (xs.peek().copied(), ys.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_digits(&mut xs);
                let right = take_digits(&mut ys);
                let left_trimmed = left.trim_start_matches('0');
                let right_trimmed = right.trim_start_matches('0');
                let ord = left_trimmed
                    .len()
                    .cmp(&right_trimmed.len())
                    .then_with(|| left_trimmed.cmp(right_trimmed))
                    .then_with(|| left.len().cmp(&right.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                xs.next();
                ys.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(entries: &[Value]) -> Vec<&str> {
        entries.iter().filter_map(|e| e["name"].as_str()).collect()
    }

    #[test]
    fn test_alphabetical() {
        let mut entries = vec![
            json!({"name": "port2"}),
            json!({"name": "port10"}),
            json!({"name": "port1"}),
        ];
        sort_table(&mut entries, "name", SortOrder::Alphabetical);
        assert_eq!(names(&entries), vec!["port1", "port10", "port2"]);
    }

    #[test]
    fn test_natural() {
        let mut entries = vec![
            json!({"name": "port2"}),
            json!({"name": "port10"}),
            json!({"name": "port1"}),
        ];
        sort_table(&mut entries, "name", SortOrder::Natural);
        assert_eq!(names(&entries), vec!["port1", "port2", "port10"]);
    }

    #[test]
    fn test_numeric_keys() {
        let mut entries = vec![json!({"id": 10}), json!({"id": 2}), json!({"id": 1})];
        sort_table(&mut entries, "id", SortOrder::Alphabetical);
        let ids: Vec<i64> = entries.iter().filter_map(|e| e["id"].as_i64()).collect();
        assert_eq!(ids, vec![1, 2, 10]);
    }

    #[test]
    fn test_large_integer_keys_compare_exactly() {
        let mut entries = vec![
            json!({"id": 9_007_199_254_740_993u64}),
            json!({"id": 9_007_199_254_740_992u64}),
            json!({"id": u64::MAX}),
            json!({"id": -1}),
        ];
        sort_table(&mut entries, "id", SortOrder::Alphabetical);
        assert_eq!(entries[0]["id"], json!(-1));
        assert_eq!(entries[1]["id"], json!(9_007_199_254_740_992u64));
        assert_eq!(entries[2]["id"], json!(9_007_199_254_740_993u64));
        assert_eq!(entries[3]["id"], json!(u64::MAX));
    }

    #[test]
    fn test_missing_keys_last_and_stable() {
        let mut entries = vec![
            json!({"other": "a"}),
            json!({"name": "b"}),
            json!({"other": "c"}),
            json!({"name": "a"}),
        ];
        sort_table(&mut entries, "name", SortOrder::Alphabetical);
        assert_eq!(entries[0]["name"], "a");
        assert_eq!(entries[1]["name"], "b");
        assert_eq!(entries[2]["other"], "a");
        assert_eq!(entries[3]["other"], "c");
    }

    #[test]
    fn test_disabled_keeps_order() {
        let mut entries = vec![json!({"name": "b"}), json!({"name": "a"})];
        sort_table(&mut entries, "name", SortOrder::Disabled);
        assert_eq!(names(&entries), vec!["b", "a"]);
    }

    #[test]
    fn test_natural_cmp_leading_zeros() {
        assert_eq!(natural_cmp("vlan007", "vlan7"), Ordering::Greater);
        assert_eq!(natural_cmp("vlan7", "vlan8"), Ordering::Less);
        assert_eq!(natural_cmp("a", "a"), Ordering::Equal);
    }
}
