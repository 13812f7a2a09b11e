//! Hamming-distance ranking of bucket candidates

use serde::Serialize;

use super::{Fingerprint, VectorRecord};

/// One candidate within the distance threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub id: i64,
    pub text: String,
    pub distance: u32,
}

/// Keep candidates within `threshold` and order them by ascending distance.
///
/// The sort is stable, so equal distances keep scan order. Each match carries
/// its own id through the sort.
pub fn rank_candidates<I>(query: &Fingerprint, candidates: I, threshold: u32) -> Vec<SearchMatch>
where
    I: IntoIterator<Item = VectorRecord>,
{
    let mut matches: Vec<SearchMatch> = candidates
        .into_iter()
        .filter_map(|record| {
            let distance = query.distance(&record.fingerprint);
            (distance <= threshold).then(|| SearchMatch {
                id: record.id,
                text: record.text,
                distance,
            })
        })
        .collect();

    matches.sort_by_key(|m| m.distance);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, text: &str, bits: &[u8]) -> VectorRecord {
        VectorRecord {
            id,
            text: text.to_string(),
            fingerprint: Fingerprint::from_bytes(bits.to_vec()),
        }
    }

    #[test]
    fn test_ids_follow_their_rows_through_the_sort() {
        let query = Fingerprint::from_bytes(vec![0; 8]);
        let candidates = vec![
            record(10, "five", &[1, 1, 1, 1, 1, 0, 0, 0]),
            record(20, "one", &[1, 0, 0, 0, 0, 0, 0, 0]),
            record(30, "three", &[1, 1, 1, 0, 0, 0, 0, 0]),
        ];

        let matches = rank_candidates(&query, candidates, 8);

        let ranked: Vec<(&str, i64, u32)> = matches
            .iter()
            .map(|m| (m.text.as_str(), m.id, m.distance))
            .collect();
        assert_eq!(
            ranked,
            vec![("one", 20, 1), ("three", 30, 3), ("five", 10, 5)]
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let query = Fingerprint::from_bytes(vec![0, 0, 0, 0]);
        let candidates = vec![
            record(1, "two", &[1, 1, 0, 0]),
            record(2, "three", &[1, 1, 1, 0]),
        ];

        let matches = rank_candidates(&query, candidates, 2);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 1);
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let query = Fingerprint::from_bytes(vec![0, 0, 0]);
        let candidates = vec![
            record(7, "first", &[0, 1, 0]),
            record(3, "second", &[1, 0, 0]),
            record(5, "exact", &[0, 0, 0]),
            record(1, "third", &[0, 0, 1]),
        ];

        let ids: Vec<i64> = rank_candidates(&query, candidates, 1)
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(ids, vec![5, 7, 3, 1]);
    }

    #[test]
    fn test_no_candidates_is_empty() {
        let query = Fingerprint::from_bytes(vec![1, 1]);

        assert!(rank_candidates(&query, Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_zero_threshold_only_exact() {
        let query = Fingerprint::from_bytes(vec![1, 0, 1]);
        let candidates = vec![
            record(1, "near", &[1, 1, 1]),
            record(2, "same", &[1, 0, 1]),
        ];

        let matches = rank_candidates(&query, candidates, 0);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "same");
    }
}
