use crate::timestamp::Seconds;

/// Placeholder text for lines that are empty once their tokens are stripped,
/// so they keep their height when rendered.
pub const EMPTY_LINE_TEXT: &str = "\u{a0}";

#[derive(Debug, Clone, PartialEq)]
pub struct LyricsLine {
    pub index: usize,
    pub text: String,
    pub start: Seconds,
    /// `None` while the closing boundary is unknown.
    pub end: Option<Seconds>,
    pub active: bool,
}

impl LyricsLine {
    /// Whether playback time alone places this line on screen.
    /// Lines with an unresolved end never qualify.
    pub fn contains(&self, position: Seconds) -> bool {
        match self.end {
            Some(end) => self.start <= position && position <= end,
            None => false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.text == EMPTY_LINE_TEXT
    }
}

/// Ordered collection of parsed lines. `lines[i].index == i` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineIndex {
    lines: Vec<LyricsLine>,
}

impl LineIndex {
    pub fn new(mut lines: Vec<LyricsLine>) -> Self {
        for (i, line) in lines.iter_mut().enumerate() {
            line.index = i;
        }
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LyricsLine> {
        self.lines.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LyricsLine> {
        self.lines.iter()
    }

    pub fn lines(&self) -> &[LyricsLine] {
        &self.lines
    }

    /// Lines whose resolved window contains `position`, in index order.
    pub fn lines_at(&self, position: Seconds) -> impl Iterator<Item = &LyricsLine> + '_ {
        self.lines.iter().filter(move |line| line.contains(position))
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.lines
            .iter()
            .filter(|line| line.active)
            .map(|line| line.index)
            .collect()
    }

    pub(crate) fn lines_mut(&mut self) -> std::slice::IterMut<'_, LyricsLine> {
        self.lines.iter_mut()
    }
}

impl<'a> IntoIterator for &'a LineIndex {
    type Item = &'a LyricsLine;
    type IntoIter = std::slice::Iter<'a, LyricsLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(start: Seconds, end: Option<Seconds>) -> LyricsLine {
        LyricsLine {
            index: 99,
            text: "x".to_string(),
            start,
            end,
            active: false,
        }
    }

    #[test]
    fn test_contains_is_inclusive() {
        let l = line(1.0, Some(3.5));
        assert!(l.contains(1.0));
        assert!(l.contains(3.5));
        assert!(!l.contains(0.99));
        assert!(!l.contains(3.51));
    }

    #[test]
    fn test_unbounded_never_contains() {
        let l = line(3.5, None);
        assert_eq!(l.end, None);
        assert!(!l.contains(3.5));
        assert!(!l.contains(1000.0));
    }

    #[test]
    fn test_new_renumbers() {
        let index = LineIndex::new(vec![line(0.0, Some(1.0)), line(1.0, None)]);
        let indices: Vec<usize> = index.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_lines_at() {
        let index = LineIndex::new(vec![
            line(0.0, Some(2.0)),
            line(2.0, Some(4.0)),
            line(4.0, None),
        ]);
        let at: Vec<usize> = index.lines_at(2.0).map(|l| l.index).collect();
        assert_eq!(at, vec![0, 1]);
        assert_eq!(index.lines_at(5.0).count(), 0);
    }
}
