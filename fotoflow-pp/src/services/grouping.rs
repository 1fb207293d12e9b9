//! Sequential grouping engine
//!
//! Photos arrive in shoot order: a person's QR marker frame, then their
//! photos, then the next person's marker. The cursor folds over that order
//! and emits one `Decision` per photo; all persistence happens in the
//! caller, which keeps this state machine pure and exhaustively testable.

use std::collections::HashSet;

/// What the QR scan of one photo concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A marker frame; `registration_id` is `None` when no tier matched
    Marker { registration_id: Option<i64> },
    /// An ordinary photo
    NoMarker,
}

/// What to do with one photo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Matched marker: open a group and assign the marker frame to its person
    StartGroup { registration_id: i64 },
    /// Marker whose payload matched nobody; the photo is flagged and left
    /// unattributed, but the open group (if any) stays open
    MarkerUnmatched,
    /// Ordinary photo inside an open group
    AssignTo { registration_id: i64 },
    /// Ordinary photo with no open group (before the first marker, or after
    /// an unmatched one)
    LeaveUnattributed,
}

/// Aggregate counts after a full pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingSummary {
    pub people_found: i64,
    pub unmatched_photos: i64,
}

/// Fold state for one pass over a batch
#[derive(Debug, Default)]
pub struct GroupingCursor {
    current: Option<i64>,
    seen_people: HashSet<i64>,
    unmatched_photos: i64,
}

impl GroupingCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one scan outcome and decide the photo's fate
    pub fn advance(&mut self, scan: ScanOutcome) -> Decision {
        match scan {
            ScanOutcome::Marker {
                registration_id: Some(id),
            } => {
                self.current = Some(id);
                self.seen_people.insert(id);
                Decision::StartGroup {
                    registration_id: id,
                }
            }
            ScanOutcome::Marker {
                registration_id: None,
            } => {
                self.unmatched_photos += 1;
                Decision::MarkerUnmatched
            }
            ScanOutcome::NoMarker => match self.current {
                Some(id) => Decision::AssignTo {
                    registration_id: id,
                },
                None => Decision::LeaveUnattributed,
            },
        }
    }

    /// Distinct people whose groups were opened
    pub fn people_found(&self) -> i64 {
        self.seen_people.len() as i64
    }

    /// Marker frames that matched no registration
    pub fn unmatched_photos(&self) -> i64 {
        self.unmatched_photos
    }

    /// Final counts for the batch record
    pub fn summary(&self) -> GroupingSummary {
        GroupingSummary {
            people_found: self.people_found(),
            unmatched_photos: self.unmatched_photos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: i64) -> ScanOutcome {
        ScanOutcome::Marker {
            registration_id: Some(id),
        }
    }

    const UNMATCHED: ScanOutcome = ScanOutcome::Marker {
        registration_id: None,
    };

    #[test]
    fn two_people_in_shoot_order() {
        let mut cursor = GroupingCursor::new();
        let decisions: Vec<_> = [
            ScanOutcome::NoMarker,
            marker(1),
            ScanOutcome::NoMarker,
            marker(2),
            ScanOutcome::NoMarker,
        ]
        .into_iter()
        .map(|s| cursor.advance(s))
        .collect();

        assert_eq!(
            decisions,
            vec![
                Decision::LeaveUnattributed,
                Decision::StartGroup { registration_id: 1 },
                Decision::AssignTo { registration_id: 1 },
                Decision::StartGroup { registration_id: 2 },
                Decision::AssignTo { registration_id: 2 },
            ]
        );
        assert_eq!(cursor.people_found(), 2);
        assert_eq!(cursor.unmatched_photos(), 0);
    }

    #[test]
    fn unmatched_marker_keeps_current_group_open() {
        let mut cursor = GroupingCursor::new();
        cursor.advance(marker(1));
        assert_eq!(cursor.advance(UNMATCHED), Decision::MarkerUnmatched);
        // The photo after the stray marker still belongs to person 1
        assert_eq!(
            cursor.advance(ScanOutcome::NoMarker),
            Decision::AssignTo { registration_id: 1 }
        );
        assert_eq!(cursor.people_found(), 1);
        assert_eq!(cursor.unmatched_photos(), 1);
    }

    #[test]
    fn unmatched_marker_before_any_group_leaves_nothing_open() {
        let mut cursor = GroupingCursor::new();
        assert_eq!(cursor.advance(UNMATCHED), Decision::MarkerUnmatched);
        assert_eq!(
            cursor.advance(ScanOutcome::NoMarker),
            Decision::LeaveUnattributed
        );
        assert_eq!(cursor.unmatched_photos(), 1);
    }

    #[test]
    fn repeated_marker_counts_one_person() {
        let mut cursor = GroupingCursor::new();
        cursor.advance(marker(5));
        cursor.advance(ScanOutcome::NoMarker);
        cursor.advance(marker(5));
        cursor.advance(ScanOutcome::NoMarker);
        assert_eq!(cursor.people_found(), 1);
    }

    #[test]
    fn photos_before_first_marker_are_not_unmatched() {
        let mut cursor = GroupingCursor::new();
        cursor.advance(ScanOutcome::NoMarker);
        cursor.advance(ScanOutcome::NoMarker);
        assert_eq!(cursor.people_found(), 0);
        assert_eq!(cursor.unmatched_photos(), 0);
    }

    #[test]
    fn group_reopens_after_unmatched_marker() {
        let mut cursor = GroupingCursor::new();
        cursor.advance(UNMATCHED);
        cursor.advance(marker(3));
        assert_eq!(
            cursor.advance(ScanOutcome::NoMarker),
            Decision::AssignTo { registration_id: 3 }
        );
    }
}
