use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use parking_lot::Mutex;

use crate::event::{CanvasEvent, EventHandler};

/// Broadcasts canvas events to registered handlers and channel subscribers.
///
/// Handlers run synchronously inside `emit`; they must not emit on the same
/// bus. Channel subscribers receive the events later, in emission order.
pub struct EventBus {
    handlers: Mutex<Vec<Box<dyn EventHandler>>>,
    subscribers: Mutex<Vec<UnboundedSender<CanvasEvent>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.lock().len()))
            .field(
                "subscribers",
                &format!("<{} subscribers>", self.subscribers.lock().len()),
            )
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe a handler to receive events
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.handlers.lock().push(handler);
    }

    /// Subscribe through a channel; dropping the receiver unsubscribes
    pub fn subscribe_channel(&self) -> UnboundedReceiver<CanvasEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Emit an event to all registered handlers and subscribers
    pub fn emit(&self, event: CanvasEvent) {
        log::trace!("Emitting {:?}", event);
        for handler in self.handlers.lock().iter_mut() {
            handler.handle_event(&event);
        }
        self.subscribers
            .lock()
            .retain(|sender| sender.unbounded_send(event.clone()).is_ok());
    }
}
