use std::collections::VecDeque;

use immich_api::Asset;

/// Assets the slideshow moved away from, most recent first.
///
/// While `cursor` is `None` the slideshow is live. `step_back` moves the cursor
/// toward older entries, `step_forward` toward newer ones and finally back to
/// live.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Asset>,
    cursor: Option<usize>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            cursor: None,
            limit: limit.max(1),
        }
    }

    /// Record an asset that is no longer on screen. Re-recording an id moves
    /// it to the front instead of duplicating it.
    pub fn record(&mut self, asset: Asset) {
        self.entries.retain(|entry| entry.id != asset.id);
        self.entries.push_front(asset);
        self.entries.truncate(self.limit);
    }

    pub fn is_live(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected(&self) -> Option<&Asset> {
        self.cursor.and_then(|idx| self.entries.get(idx))
    }

    /// Returns `false` when there is nothing to go back to.
    pub fn step_back(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let next = match self.cursor {
            None => 0,
            Some(idx) => (idx + 1).min(self.entries.len() - 1),
        };
        self.cursor = Some(next);
        true
    }

    /// Returns `true` when this step left history mode.
    pub fn step_forward(&mut self) -> bool {
        match self.cursor {
            Some(0) | None => {
                let was_browsing = self.cursor.is_some();
                self.cursor = None;
                was_browsing
            }
            Some(idx) => {
                self.cursor = Some(idx - 1);
                false
            }
        }
    }

    pub fn return_to_live(&mut self) {
        self.cursor = None;
    }

    pub fn navigation_label(&self) -> String {
        match self.cursor {
            None => "Live".to_string(),
            Some(idx) => format!("History {}/{}", idx + 1, self.entries.len()),
        }
    }
}
