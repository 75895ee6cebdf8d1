use chrono::TimeDelta;

use super::types::Snapshot;

/// The pair (one from each side) whose begin positions are closest in time.
///
/// Ties keep the first pair found, scanning `left` then `right` in order.
pub fn closest_in_time<'a>(
    left: &'a [Snapshot],
    right: &'a [Snapshot],
) -> Option<(&'a Snapshot, &'a Snapshot, TimeDelta)> {
    let mut best: Option<(&Snapshot, &Snapshot, TimeDelta)> = None;
    for a in left {
        for b in right {
            let gap = (a.begin_position - b.begin_position).abs();
            if best.as_ref().is_none_or(|(_, _, current)| gap < *current) {
                best = Some((a, b, gap));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_closest_pair() {
        let radar = vec![
            fixtures::snapshot("r1", "S1A_1", "2021-03-01T10:00:00Z"),
            fixtures::snapshot("r2", "S1A_2", "2021-03-05T10:00:00Z"),
        ];
        let optical = vec![
            fixtures::snapshot("o1", "S2A_1", "2021-03-04T09:00:00Z"),
            fixtures::snapshot("o2", "S2A_2", "2021-03-10T10:00:00Z"),
        ];

        let (a, b, gap) = closest_in_time(&radar, &optical).unwrap();
        assert_eq!(a.id, "r2");
        assert_eq!(b.id, "o1");
        assert_eq!(gap, TimeDelta::hours(25));
    }

    #[test]
    fn test_empty_side() {
        let radar = vec![fixtures::snapshot("r1", "S1A_1", "2021-03-01T10:00:00Z")];
        assert!(closest_in_time(&radar, &[]).is_none());
    }
}
