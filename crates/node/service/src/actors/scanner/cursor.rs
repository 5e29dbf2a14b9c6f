/// Tracks the scanner's progress towards the chain tip.
///
/// The cursor starts unset and jumps to the first observed head; history before it is never
/// fetched. Afterwards every height between the next unfetched block and the latest head is
/// handed out exactly once, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCursor {
    target: Option<u64>,
    next: Option<u64>,
}

impl ScanCursor {
    /// Returns the latest observed head.
    pub const fn target(&self) -> Option<u64> {
        self.target
    }

    /// Returns the next height to fetch.
    pub const fn next(&self) -> Option<u64> {
        self.next
    }

    /// Records a new head.
    ///
    /// A head below the current target lowers it; heights already handed out are not
    /// handed out again.
    pub const fn on_head(&mut self, head: u64) {
        self.target = Some(head);
        if self.next.is_none() {
            self.next = Some(head);
        }
    }

    /// Returns the next height to fetch, if the cursor is behind the target.
    pub const fn pending(&self) -> Option<u64> {
        match (self.next, self.target) {
            (Some(next), Some(target)) if next <= target => Some(next),
            _ => None,
        }
    }

    /// Marks the pending height as fetched.
    pub const fn advance(&mut self) {
        if let Some(next) = self.next {
            self.next = Some(next.saturating_add(1));
        }
    }

    /// Returns the number of heights between the cursor and the target, inclusive.
    pub const fn lag(&self) -> u64 {
        match (self.next, self.target) {
            (Some(next), Some(target)) if next <= target => target - next + 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn drain(cursor: &mut ScanCursor) -> Vec<u64> {
        let mut fetched = Vec::new();
        while let Some(number) = cursor.pending() {
            fetched.push(number);
            cursor.advance();
        }
        fetched
    }

    #[test]
    fn test_unset_cursor_has_nothing_pending() {
        let cursor = ScanCursor::default();
        assert_eq!(cursor.pending(), None);
        assert_eq!(cursor.lag(), 0);
    }

    #[rstest]
    #[case(&[100, 103], vec![100, 101, 102, 103])]
    #[case(&[5], vec![5])]
    #[case(&[5, 5, 6, 6, 8], vec![5, 6, 7, 8])]
    fn test_heads_are_scanned_without_gaps(#[case] heads: &[u64], #[case] expected: Vec<u64>) {
        let mut cursor = ScanCursor::default();
        let mut fetched = Vec::new();
        for head in heads {
            cursor.on_head(*head);
            fetched.extend(drain(&mut cursor));
        }
        assert_eq!(fetched, expected);
    }

    #[test]
    fn test_lower_head_lowers_target() {
        let mut cursor = ScanCursor::default();
        cursor.on_head(10);
        assert_eq!(drain(&mut cursor), vec![10]);

        cursor.on_head(12);
        assert_eq!(cursor.lag(), 2);
        cursor.on_head(9);
        assert_eq!(cursor.target(), Some(9));
        assert_eq!(cursor.pending(), None);

        // Already fetched heights are not revisited once the chain moves on.
        cursor.on_head(12);
        assert_eq!(drain(&mut cursor), vec![11, 12]);
    }
}
