//! Per-iteration input handed to the frame driver
//!
//! The window layer translates its native events into [`InputEvent`] values and
//! batches them into a [`FrameInput`]. Nothing here is global: each driver
//! iteration sees exactly the events collected since the previous one.

/// Window events the frame driver reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The user asked to quit (Escape or the window close button)
    CloseRequested,
    /// The framebuffer changed size; zero means minimized
    Resized {
        /// New framebuffer width in pixels
        width: u32,
        /// New framebuffer height in pixels
        height: u32,
    },
}

/// Events collected for one driver iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInput {
    events: Vec<InputEvent>,
}

impl FrameInput {
    /// Input with no events
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Builder form of [`FrameInput::push`]
    #[must_use]
    pub fn with(mut self, event: InputEvent) -> Self {
        self.push(event);
        self
    }

    /// Events in arrival order
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Whether any event asks to close
    pub fn close_requested(&self) -> bool {
        self.events.contains(&InputEvent::CloseRequested)
    }

    /// The most recent framebuffer size, if a resize happened
    pub fn latest_resize(&self) -> Option<(u32, u32)> {
        self.events.iter().rev().find_map(|event| match *event {
            InputEvent::Resized { width, height } => Some((width, height)),
            InputEvent::CloseRequested => None,
        })
    }
}

impl FromIterator<InputEvent> for FrameInput {
    fn from_iter<I: IntoIterator<Item = InputEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_resize_wins() {
        let input: FrameInput = [
            InputEvent::Resized { width: 800, height: 600 },
            InputEvent::Resized { width: 1024, height: 768 },
        ]
        .into_iter()
        .collect();

        assert_eq!(input.latest_resize(), Some((1024, 768)));
        assert!(!input.close_requested());
    }

    #[test]
    fn test_close_detected_among_other_events() {
        let input = FrameInput::new()
            .with(InputEvent::Resized { width: 10, height: 10 })
            .with(InputEvent::CloseRequested);

        assert!(input.close_requested());
        assert_eq!(input.events().len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let input = FrameInput::new();
        assert_eq!(input.latest_resize(), None);
        assert!(!input.close_requested());
    }
}
