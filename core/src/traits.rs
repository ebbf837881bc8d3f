use crate::events::ProtocolEvent;

pub type NodeId = u32;

/// Consumer of the engine's protocol event stream.
///
/// The engine keeps its own bounded [`EventLog`](crate::EventLog) and
/// [`Capture`](crate::Capture); anything else that wants to observe the
/// session (a renderer, a logger, a test recorder) subscribes through this.
pub trait EventSink {
    fn record(&mut self, event: &ProtocolEvent);

    /// Called when the session is reset and past events become stale.
    fn clear(&mut self) {}
}
