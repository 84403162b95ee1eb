use serde_json::Value;
use tokio::sync::mpsc;

/// Consumer of channel publications.
///
/// Called once per message, synchronously, on the client's driver task, in
/// the order messages arrived. Implemented for closures
/// `FnMut(&str, Value)` and for `mpsc::UnboundedSender<(String, Value)>`.
pub trait MessageHandler: Send + 'static {
    fn on_message(&mut self, channel: &str, payload: Value);
}

impl<F> MessageHandler for F
where
    F: FnMut(&str, Value) + Send + 'static,
{
    fn on_message(&mut self, channel: &str, payload: Value) {
        self(channel, payload)
    }
}

impl MessageHandler for mpsc::UnboundedSender<(String, Value)> {
    fn on_message(&mut self, channel: &str, payload: Value) {
        // receiver gone: nobody is listening, drop like an absent handler
        let _ = self.send((channel.to_string(), payload));
    }
}

/// Routes decoded publications to the current handler, if any.
#[derive(Default)]
pub struct MessageDispatcher {
    handler: Option<Box<dyn MessageHandler>>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self { handler: None }
    }

    /// Replace the handler. Affects subsequent dispatches only.
    pub fn set_handler(&mut self, handler: Box<dyn MessageHandler>) {
        self.handler = Some(handler);
    }

    pub fn clear(&mut self) {
        self.handler = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Returns `false` when the message was dropped for lack of a handler.
    pub fn dispatch(&mut self, channel: &str, payload: Value) -> bool {
        match self.handler.as_mut() {
            Some(handler) => {
                handler.on_message(channel, payload);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}
