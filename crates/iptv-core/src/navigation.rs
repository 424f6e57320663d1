//! Channel navigation with wraparound

use crate::types::Channel;

/// Index after `current`, wrapping past the end. `None` selects the first channel.
pub fn next(len: usize, current: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(idx) => (idx + 1) % len,
        None => 0,
    })
}

/// Index before `current`, wrapping past the start. `None` selects the last channel.
pub fn previous(len: usize, current: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(idx) => (idx % len + len - 1) % len,
        None => len - 1,
    })
}

/// Ordered channel list plus the selected index
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    channels: Vec<Channel>,
    current: Option<usize>,
}

impl NavigationState {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            current: None,
        }
    }

    /// Replace the channel list; selection is cleared
    pub fn set_channels(&mut self, channels: Vec<Channel>) {
        self.channels = channels;
        self.current = None;
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_channel(&self) -> Option<&Channel> {
        self.current.and_then(|idx| self.channels.get(idx))
    }

    /// Jump to `index`; out-of-range indices leave the selection unchanged
    pub fn select(&mut self, index: usize) -> Option<&Channel> {
        if index >= self.channels.len() {
            return None;
        }
        self.current = Some(index);
        self.channels.get(index)
    }

    pub fn next_index(&self) -> Option<usize> {
        next(self.channels.len(), self.current)
    }

    pub fn previous_index(&self) -> Option<usize> {
        previous(self.channels.len(), self.current)
    }

    /// Channel that `next` would select, without moving
    pub fn peek_next(&self) -> Option<&Channel> {
        self.next_index().and_then(|idx| self.channels.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraparound() {
        assert_eq!(next(3, Some(2)), Some(0));
        assert_eq!(next(3, Some(0)), Some(1));
        assert_eq!(previous(3, Some(0)), Some(2));
        assert_eq!(previous(3, Some(2)), Some(1));
    }

    #[test]
    fn test_no_selection() {
        assert_eq!(next(3, None), Some(0));
        assert_eq!(previous(3, None), Some(2));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(next(0, Some(1)), None);
        assert_eq!(previous(0, None), None);
    }

    #[test]
    fn test_single_channel() {
        assert_eq!(next(1, Some(0)), Some(0));
        assert_eq!(previous(1, Some(0)), Some(0));
    }

    #[test]
    fn test_state_select_and_peek() {
        let mut nav = NavigationState::new(vec![
            Channel::new("a", "http://a"),
            Channel::new("b", "http://b"),
        ]);
        assert!(nav.current_channel().is_none());
        assert!(nav.select(5).is_none());
        assert_eq!(nav.select(1).map(|c| c.name.as_str()), Some("b"));
        assert_eq!(nav.peek_next().map(|c| c.name.as_str()), Some("a"));

        nav.set_channels(vec![Channel::new("c", "http://c")]);
        assert_eq!(nav.current(), None);
    }
}
