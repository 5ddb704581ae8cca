//! `/W` array construction for composite fonts.
//!
//! Codes with equal consecutive widths collapse into `start end width`
//! triples, varying runs into `start [w0 w1 ...]` lists. The second pass
//! folds short runs back into the previous list unless that list was itself
//! an equal-width interval.

use std::collections::{BTreeMap, BTreeSet};

/// Builds the `/W` array text for a code (or CID) to width map.
pub(crate) fn compress_widths(widths: &BTreeMap<u32, i64>) -> String {
    let mut ranges: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    let mut interval_starts: BTreeSet<i64> = BTreeSet::new();
    let mut range_id: i64 = 0;
    let mut prev_cid: i64 = -2;
    let mut prev_width: i64 = -1;
    let mut interval = false;

    for (&cid, &width) in widths {
        let cid = cid as i64;
        if cid == prev_cid + 1 {
            if width == prev_width {
                let current = ranges.entry(range_id).or_default();
                if current.first() == Some(&width) {
                    current.push(width);
                } else {
                    current.pop();
                    range_id = prev_cid;
                    ranges.insert(range_id, vec![prev_width, width]);
                }
                interval = true;
                interval_starts.insert(range_id);
            } else {
                if interval {
                    range_id = cid;
                    ranges.insert(range_id, vec![width]);
                } else {
                    ranges.entry(range_id).or_default().push(width);
                }
                interval = false;
            }
        } else {
            range_id = cid;
            ranges.insert(range_id, vec![width]);
            interval = false;
        }
        prev_cid = cid;
        prev_width = width;
    }

    let snapshot: Vec<(i64, usize)> = ranges.iter().map(|(k, ws)| (*k, ws.len())).collect();
    let mut prev_k: i64 = -1;
    let mut next_k: i64 = -1;
    let mut prev_int = false;
    for (k, count) in snapshot {
        if k == next_k && !prev_int && (!interval_starts.contains(&k) || count < 3) {
            interval_starts.remove(&k);
            if let Some(tail) = ranges.remove(&k) {
                ranges.entry(prev_k).or_default().extend(tail);
            }
        } else {
            prev_k = k;
        }
        next_k = k + count as i64;
        if interval_starts.remove(&k) {
            prev_int = count > 3;
            next_k -= 1;
        } else {
            prev_int = false;
        }
    }

    let mut out = String::from("[");
    for (k, ws) in &ranges {
        let Some(first) = ws.first() else {
            continue;
        };
        if ws.iter().all(|w| w == first) {
            out.push_str(&format!(" {} {} {}", k, k + ws.len() as i64 - 1, first));
        } else {
            let list: Vec<String> = ws.iter().map(|w| w.to_string()).collect();
            out.push_str(&format!(" {} [ {} ]\n", k, list.join(" ")));
        }
    }
    out.push(']');
    out
}

/// Inverse of [`compress_widths`]; used to check produced arrays.
#[cfg(test)]
pub(crate) fn expand_widths(array: &str) -> BTreeMap<u32, i64> {
    let inner = array.trim().trim_start_matches('[').trim_end_matches(']');
    let spaced = inner.replace('[', " [ ").replace(']', " ] ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    let mut out = BTreeMap::new();
    let mut idx = 0;
    while idx < tokens.len() {
        let start: u32 = tokens[idx].parse().unwrap_or(0);
        if tokens.get(idx + 1) == Some(&"[") {
            idx += 2;
            let mut code = start;
            while idx < tokens.len() && tokens[idx] != "]" {
                out.insert(code, tokens[idx].parse().unwrap_or(0));
                code += 1;
                idx += 1;
            }
            idx += 1;
        } else {
            let end: u32 = tokens[idx + 1].parse().unwrap_or(start);
            let width: i64 = tokens[idx + 2].parse().unwrap_or(0);
            for code in start..=end {
                out.insert(code, width);
            }
            idx += 3;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(u32, i64)]) -> BTreeMap<u32, i64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn single_glyph() {
        assert_eq!(compress_widths(&map(&[(1, 500)])), "[ 1 1 500]");
    }

    #[test]
    fn equal_run_becomes_triple() {
        let widths = map(&[(1, 600), (2, 600), (3, 600), (4, 600)]);
        assert_eq!(compress_widths(&widths), "[ 1 4 600]");
    }

    #[test]
    fn varying_run_becomes_list() {
        let widths = map(&[(1, 278), (2, 556), (3, 722)]);
        assert_eq!(compress_widths(&widths), "[ 1 [ 278 556 722 ]\n]");
    }

    #[test]
    fn gaps_start_new_ranges() {
        let widths = map(&[(1, 500), (2, 610), (10, 300)]);
        assert_eq!(compress_widths(&widths), "[ 1 [ 500 610 ]\n 10 10 300]");
    }

    #[test]
    fn equal_tail_splits_out_of_list() {
        // 1:100 2:200 then a run of 300s; the run breaks out as its own triple.
        let widths = map(&[(1, 100), (2, 200), (3, 300), (4, 300), (5, 300), (6, 300)]);
        assert_eq!(compress_widths(&widths), "[ 1 [ 100 200 ]\n 3 6 300]");
    }

    #[test]
    fn short_interval_folds_back_into_list() {
        let widths = map(&[(1, 100), (2, 200), (3, 200), (4, 400)]);
        let out = compress_widths(&widths);
        assert_eq!(out, "[ 1 [ 100 200 200 400 ]\n]");
        assert_eq!(expand_widths(&out), widths);
    }

    #[test]
    fn expansion_round_trips_and_is_idempotent() {
        let mut widths = BTreeMap::new();
        let mut seed: u32 = 12345;
        for code in 1..400u32 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            if (seed >> 16) % 7 == 0 {
                continue;
            }
            let width = match (seed >> 8) % 5 {
                0 | 1 => 500,
                2 => 250,
                _ => ((seed >> 4) % 900) as i64,
            };
            widths.insert(code, width);
        }
        let first = compress_widths(&widths);
        let expanded = expand_widths(&first);
        assert_eq!(expanded, widths);
        assert_eq!(compress_widths(&expanded), first);
    }

    #[test]
    fn ranges_do_not_overlap() {
        let widths = map(&[(1, 5), (2, 5), (3, 7), (4, 7), (5, 7), (6, 7), (7, 1), (9, 2)]);
        let out = compress_widths(&widths);
        assert_eq!(out, "[ 1 2 5 3 6 7 7 7 1 9 9 2]");
        let expanded = expand_widths(&out);
        assert_eq!(expanded.len(), widths.len());
        assert_eq!(expanded, widths);
    }
}
