use tui::widgets::ListState;

/// Wrapping cursor over a list whose length can change under it
#[derive(Debug, Default, Clone)]
pub struct ChoiceCursor {
    state: ListState,
}

impl ChoiceCursor {
    pub fn new(len: usize) -> Self {
        let mut cursor = Self::default();
        cursor.clamp(len);
        cursor
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected()
    }

    pub fn state_mut(&mut self) -> &mut ListState {
        &mut self.state
    }

    pub fn next(&mut self, len: usize) {
        if len == 0 {
            self.state.select(None);
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self, len: usize) {
        if len == 0 {
            self.state.select(None);
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => (i - 1).min(len - 1),
        };
        self.state.select(Some(i));
    }

    /// Keep the selection valid after the list shrank or grew
    pub fn clamp(&mut self, len: usize) {
        let selected = match (len, self.state.selected()) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(i)) => Some(i.min(len - 1)),
        };
        self.state.select(selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_both_ways() {
        let mut cursor = ChoiceCursor::new(3);
        assert_eq!(cursor.selected(), Some(0));
        cursor.previous(3);
        assert_eq!(cursor.selected(), Some(2));
        cursor.next(3);
        assert_eq!(cursor.selected(), Some(0));
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut cursor = ChoiceCursor::new(5);
        for _ in 0..4 {
            cursor.next(5);
        }
        cursor.clamp(2);
        assert_eq!(cursor.selected(), Some(1));
        cursor.clamp(0);
        assert_eq!(cursor.selected(), None);
        assert_eq!(ChoiceCursor::new(0).selected(), None);
    }
}
