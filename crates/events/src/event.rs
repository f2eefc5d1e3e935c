use stagecraft_common::NodeId;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Delivery lane of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Dispatched synchronously inside `post`.
    High,
    /// Queued and dispatched by a later `drain`.
    #[default]
    Normal,
}

/// Who posted an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    Node(NodeId),
    /// A resource registry, named by the kind of resource it holds.
    Registry(&'static str),
    /// Forwarded from the windowing/input layer.
    Input,
    Other(String),
}

/// A message on the bus.
///
/// The context payload is untyped; receivers recover it with
/// [`Event::context_as`]. Cloning an event shares the payload.
#[derive(Clone)]
pub struct Event {
    code: String,
    sender: EventSource,
    context: Option<Rc<dyn Any>>,
    priority: Priority,
}

impl Event {
    /// A `Normal` priority event without context.
    pub fn new(code: impl Into<String>, sender: EventSource) -> Self {
        Self {
            code: code.into(),
            sender,
            context: None,
            priority: Priority::Normal,
        }
    }

    /// A `High` priority event without context.
    pub fn high(code: impl Into<String>, sender: EventSource) -> Self {
        Self::new(code, sender).with_priority(Priority::High)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_context<T: Any>(mut self, context: T) -> Self {
        self.context = Some(Rc::new(context));
        self
    }

    /// Attach an already shared payload.
    pub fn with_shared_context(mut self, context: Rc<dyn Any>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn sender(&self) -> &EventSource {
        &self.sender
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn context(&self) -> Option<&Rc<dyn Any>> {
        self.context.as_ref()
    }

    /// Downcast the payload. `None` when absent or of another type.
    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref().and_then(|c| c.downcast_ref::<T>())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("code", &self.code)
            .field("sender", &self.sender)
            .field("has_context", &self.context.is_some())
            .field("priority", &self.priority)
            .finish()
    }
}

/// Receiver of bus events.
///
/// Handlers take `&self`; anything they mutate lives behind interior
/// mutability. Closures `Fn(&Event)` implement this directly.
pub trait EventHandler {
    fn handle(&self, event: &Event);
}

impl<F> EventHandler for F
where
    F: Fn(&Event),
{
    fn handle(&self, event: &Event) {
        self(event)
    }
}

/// Shared handler reference. Identity is the allocation, not the value.
pub type HandlerRef = Rc<dyn EventHandler>;

/// Whether two handler references point at the same handler.
pub fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_is_normal_without_context() {
        let e = Event::new("tick", EventSource::Input);
        assert_eq!(e.code(), "tick");
        assert_eq!(e.priority(), Priority::Normal);
        assert!(e.context().is_none());
    }

    #[test]
    fn context_downcasts_to_original_type() {
        let e = Event::high("resize", EventSource::Input).with_context((640u32, 480u32));
        assert_eq!(e.priority(), Priority::High);
        assert_eq!(e.context_as::<(u32, u32)>(), Some(&(640, 480)));
        assert!(e.context_as::<String>().is_none());
    }

    #[test]
    fn clone_shares_context() {
        let e = Event::new("a", EventSource::Node(NodeId(1))).with_context(5i32);
        let c = e.clone();
        assert!(Rc::ptr_eq(e.context().unwrap(), c.context().unwrap()));
    }

    #[test]
    fn handler_identity_is_by_allocation() {
        let a: HandlerRef = Rc::new(|_: &Event| {});
        let b: HandlerRef = Rc::new(|_: &Event| {});
        let a2 = Rc::clone(&a);
        assert!(same_handler(&a, &a2));
        assert!(!same_handler(&a, &b));
    }
}
