/// One stop of the scanning stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPosition {
    pub index: usize,
}

/// Positions visited during the CameraScan stage.
///
/// A stationary setup scans exactly once; each later position replaces the
/// sample cube of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan {
    positions: usize,
}

impl ScanPlan {
    pub fn single() -> Self {
        Self { positions: 1 }
    }

    pub fn with_positions(positions: usize) -> Self {
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions
    }

    pub fn is_empty(&self) -> bool {
        self.positions == 0
    }

    pub fn positions(&self) -> ScanPositions {
        ScanPositions {
            next: 0,
            end: self.positions,
        }
    }
}

impl Default for ScanPlan {
    fn default() -> Self {
        Self::single()
    }
}

impl IntoIterator for ScanPlan {
    type Item = ScanPosition;
    type IntoIter = ScanPositions;

    fn into_iter(self) -> Self::IntoIter {
        self.positions()
    }
}

#[derive(Debug, Clone)]
pub struct ScanPositions {
    next: usize,
    end: usize,
}

impl Iterator for ScanPositions {
    type Item = ScanPosition;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let position = ScanPosition { index: self.next };
        self.next += 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ScanPositions {}
