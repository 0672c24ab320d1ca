use log::debug;

use crate::error::{LyricsError, Result};
use crate::index::LineIndex;
use crate::timestamp::Seconds;

/// Result of one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    /// At least one line flipped its active flag.
    pub changed: bool,
    /// Indices of the lines active after the pass, ascending.
    pub active: Vec<usize>,
}

impl SyncOutcome {
    /// A scroll is only worth starting when something flipped and there is
    /// something left to show.
    pub fn wants_scroll(&self) -> bool {
        self.changed && !self.active.is_empty()
    }
}

/// Decides which lines are active for a playback position or an explicit
/// line selection.
///
/// While a selection is set it is the only active line. It is released as
/// soon as playback time alone would activate that same line.
#[derive(Debug, Default)]
pub struct SyncEngine {
    index: LineIndex,
    selected: Option<usize>,
    last_position: Option<Seconds>,
}

impl SyncEngine {
    pub fn new(index: LineIndex) -> Self {
        Self {
            index,
            selected: None,
            last_position: None,
        }
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    pub fn selected_line(&self) -> Option<usize> {
        self.selected
    }

    /// Replace the lines, dropping any selection.
    pub fn reset(&mut self, index: LineIndex) {
        self.index = index;
        self.selected = None;
        self.last_position = None;
    }

    pub fn on_time_update(&mut self, position: Seconds) -> SyncOutcome {
        self.last_position = Some(position);

        if let Some(selected) = self.selected {
            let caught_up = self
                .index
                .get(selected)
                .is_some_and(|line| line.contains(position));
            if caught_up {
                debug!("playback reached selected line {}, resuming time sync", selected);
                self.selected = None;
            }
        }

        self.apply(Some(position))
    }

    pub fn goto_line(&mut self, index: usize) -> Result<SyncOutcome> {
        let len = self.index.len();
        if index >= len {
            return Err(LyricsError::LineOutOfRange { index, len });
        }

        self.selected = Some(index);
        Ok(self.apply(self.last_position))
    }

    /// Drop the explicit selection and fall back to the last known position.
    /// With no position seen yet, nothing stays active.
    pub fn clear_selection(&mut self) -> SyncOutcome {
        self.selected = None;
        self.apply(self.last_position)
    }

    fn apply(&mut self, position: Option<Seconds>) -> SyncOutcome {
        let selected = self.selected;
        let timed: Vec<usize> = match (selected, position) {
            (None, Some(position)) => self.index.lines_at(position).map(|l| l.index).collect(),
            _ => Vec::new(),
        };
        let mut outcome = SyncOutcome::default();

        for line in self.index.lines_mut() {
            let active = match selected {
                Some(sel) => line.index == sel,
                None => timed.contains(&line.index),
            };
            if active != line.active {
                debug!(
                    "line {} {}",
                    line.index,
                    if active { "activated" } else { "deactivated" }
                );
                line.active = active;
                outcome.changed = true;
            }
            if active {
                outcome.active.push(line.index);
            }
        }

        outcome
    }
}
