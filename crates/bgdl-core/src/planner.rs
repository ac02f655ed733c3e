//! Batch admission planning.

/// Split `requests` into the part admitted now (at most `limit` items, in
/// order) and the deferred remainder.
pub fn split<T>(mut requests: Vec<T>, limit: usize) -> (Vec<T>, Vec<T>) {
    let head_len = limit.min(requests.len());
    let tail = requests.split_off(head_len);
    (requests, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_larger_than_limit() {
        let (head, tail) = split((0..25).collect(), 20);
        assert_eq!(head, (0..20).collect::<Vec<_>>());
        assert_eq!(tail, (20..25).collect::<Vec<_>>());
    }

    #[test]
    fn batch_within_limit_has_empty_tail() {
        let (head, tail) = split(vec!['a', 'b'], 20);
        assert_eq!(head, vec!['a', 'b']);
        assert!(tail.is_empty());
    }

    #[test]
    fn zero_limit_defers_everything() {
        let (head, tail) = split(vec![1, 2, 3], 0);
        assert!(head.is_empty());
        assert_eq!(tail, vec![1, 2, 3]);
    }

    #[test]
    fn empty_batch() {
        let (head, tail) = split(Vec::<u8>::new(), 1);
        assert!(head.is_empty() && tail.is_empty());
    }

    #[test]
    fn head_never_exceeds_limit() {
        for len in 0..50usize {
            for limit in 0..25usize {
                let (head, tail) = split(vec![(); len], limit);
                assert!(head.len() <= limit);
                assert_eq!(head.len() + tail.len(), len);
            }
        }
    }
}
