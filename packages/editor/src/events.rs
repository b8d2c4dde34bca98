//! Change notifications published by the stores.
//!
//! Stores are single-writer; any number of readers subscribe through a
//! broadcast channel. A send with no live receiver is not an error.

use tokio::sync::broadcast;

use crate::document::Selection;
use crate::staleness::RenderStatus;
use crate::translations::{Provenance, TranslationScope};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A mutation was committed
    PageChanged {
        version: u64,
        mutation: &'static str,
    },

    /// The whole page was swapped (template switch, undo/redo)
    PageReplaced { version: u64 },

    SelectionChanged(Selection),

    RenderStatusChanged(RenderStatus),

    TranslationsLoaded(TranslationScope),

    TranslationChanged {
        path: String,
        provenance: Provenance,
    },

    TranslationsSaved,

    /// Store-level load/save failure
    TranslationError(String),
}

/// Cloneable sending half shared by the stores of one session
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: EditorEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.emit(EditorEvent::TranslationsSaved);
    }

    #[test]
    fn test_every_subscriber_sees_events() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.clone().subscribe();

        bus.emit(EditorEvent::PageReplaced { version: 3 });

        assert_eq!(a.try_recv().unwrap(), EditorEvent::PageReplaced { version: 3 });
        assert_eq!(b.try_recv().unwrap(), EditorEvent::PageReplaced { version: 3 });
    }
}
