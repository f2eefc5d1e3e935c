use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::event::{Event, HandlerRef, Priority, same_handler};

/// Deferred pairs dispatched per `drain_default` call.
pub const DEFAULT_DRAIN_BUDGET: usize = 10;

/// In-process publish/subscribe bus.
///
/// Unsynchronized: the bus holds `Rc` handlers and is meant to be driven from
/// the one thread that runs update, drain and render.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<String, Vec<HandlerRef>>,
    deferred: VecDeque<(Event, HandlerRef)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `code`. Returns false if it was already subscribed.
    pub fn subscribe(&mut self, code: impl Into<String>, handler: HandlerRef) -> bool {
        let code = code.into();
        let list = self.subscribers.entry(code).or_default();
        if list.iter().any(|h| same_handler(h, &handler)) {
            tracing::warn!("handler already subscribed, ignoring duplicate");
            return false;
        }
        list.push(handler);
        true
    }

    /// Unsubscribe `handler` from `code`. Returns false if it was not subscribed.
    ///
    /// Pairs already sitting in the deferred queue are still delivered.
    pub fn unsubscribe(&mut self, code: &str, handler: &HandlerRef) -> bool {
        let Some(list) = self.subscribers.get_mut(code) else {
            tracing::warn!(code, "unsubscribe: no subscribers for code");
            return false;
        };
        let Some(pos) = list.iter().position(|h| same_handler(h, handler)) else {
            tracing::warn!(code, "unsubscribe: handler not subscribed");
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.subscribers.remove(code);
        }
        true
    }

    /// Post an event.
    ///
    /// `High` events are dispatched to every subscriber before this returns.
    /// `Normal` events queue one pair per current subscriber. Returns the
    /// number of handlers reached or queued; zero subscribers is not an error.
    pub fn post(&mut self, event: Event) -> usize {
        let Some(list) = self.subscribers.get(event.code()) else {
            tracing::trace!(code = event.code(), "post: no subscribers");
            return 0;
        };
        match event.priority() {
            Priority::High => {
                for handler in list {
                    handler.handle(&event);
                }
                list.len()
            }
            Priority::Normal => {
                for handler in list {
                    self.deferred.push_back((event.clone(), handler.clone()));
                }
                list.len()
            }
        }
    }

    /// Dispatch up to `budget` deferred pairs, oldest first.
    ///
    /// Pairs beyond the budget stay queued for the next call. Returns the
    /// number dispatched.
    pub fn drain(&mut self, budget: usize) -> usize {
        let mut dispatched = 0;
        while dispatched < budget {
            let Some((event, handler)) = self.deferred.pop_front() else {
                break;
            };
            handler.handle(&event);
            dispatched += 1;
        }
        if !self.deferred.is_empty() {
            tracing::trace!(
                dispatched,
                remaining = self.deferred.len(),
                "drain budget exhausted"
            );
        }
        dispatched
    }

    pub fn drain_default(&mut self) -> usize {
        self.drain(DEFAULT_DRAIN_BUDGET)
    }

    /// Number of deferred pairs awaiting dispatch.
    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    pub fn subscriber_count(&self, code: &str) -> usize {
        self.subscribers.get(code).map_or(0, Vec::len)
    }

    /// Whether `handler` is subscribed to `code`.
    pub fn is_subscribed(&self, code: &str, handler: &HandlerRef) -> bool {
        self.subscribers
            .get(code)
            .is_some_and(|list| list.iter().any(|h| same_handler(h, handler)))
    }

    /// Drop all subscriptions and queued events.
    pub fn clear(&mut self) {
        self.subscribers.clear();
        self.deferred.clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("codes", &self.subscribers.len())
            .field("pending", &self.deferred.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventHandler, EventSource};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records (tag, code, context) for every event it sees into a shared log.
    struct Recorder {
        tag: &'static str,
        log: Rc<RefCell<Vec<(&'static str, String, Option<i32>)>>>,
    }

    impl EventHandler for Recorder {
        fn handle(&self, event: &Event) {
            self.log.borrow_mut().push((
                self.tag,
                event.code().to_string(),
                event.context_as::<i32>().copied(),
            ));
        }
    }

    type Log = Rc<RefCell<Vec<(&'static str, String, Option<i32>)>>>;

    fn recorder(tag: &'static str, log: &Log) -> HandlerRef {
        Rc::new(Recorder {
            tag,
            log: Rc::clone(log),
        })
    }

    #[test]
    fn duplicate_subscribe_is_noop() {
        let log = Log::default();
        let mut bus = EventBus::new();
        let h = recorder("a", &log);
        assert!(bus.subscribe("x", h.clone()));
        assert!(!bus.subscribe("x", h.clone()));
        assert_eq!(bus.subscriber_count("x"), 1);

        bus.post(Event::high("x", EventSource::Input));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn same_handler_may_subscribe_to_several_codes() {
        let log = Log::default();
        let mut bus = EventBus::new();
        let h = recorder("a", &log);
        assert!(bus.subscribe("x", h.clone()));
        assert!(bus.subscribe("y", h.clone()));
        assert!(bus.is_subscribed("x", &h));
        assert!(bus.is_subscribed("y", &h));
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let log = Log::default();
        let mut bus = EventBus::new();
        let h = recorder("a", &log);
        assert!(!bus.unsubscribe("x", &h));

        bus.subscribe("x", recorder("b", &log));
        assert!(!bus.unsubscribe("x", &h));
        assert_eq!(bus.subscriber_count("x"), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let log = Log::default();
        let mut bus = EventBus::new();
        let h = recorder("a", &log);
        bus.subscribe("x", h.clone());
        assert!(bus.unsubscribe("x", &h));
        assert_eq!(bus.subscriber_count("x"), 0);

        bus.post(Event::high("x", EventSource::Input));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn high_dispatches_in_subscription_order_before_post_returns() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.subscribe("hit", recorder("first", &log));
        bus.subscribe("hit", recorder("second", &log));
        bus.subscribe("hit", recorder("third", &log));

        let reached = bus.post(Event::high("hit", EventSource::Input).with_context(9i32));
        assert_eq!(reached, 3);
        assert_eq!(bus.pending(), 0);

        let tags: Vec<_> = log.borrow().iter().map(|(t, _, _)| *t).collect();
        assert_eq!(tags, vec!["first", "second", "third"]);
        assert!(log.borrow().iter().all(|(_, _, ctx)| *ctx == Some(9)));
    }

    #[test]
    fn post_without_subscribers_is_silent() {
        let mut bus = EventBus::new();
        assert_eq!(bus.post(Event::new("nobody", EventSource::Input)), 0);
        assert_eq!(bus.post(Event::high("nobody", EventSource::Input)), 0);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn normal_waits_for_drain() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.subscribe("loaded:a", recorder("h", &log));

        bus.post(Event::new("loaded:a", EventSource::Registry("texture")).with_context(42i32));
        assert!(log.borrow().is_empty());
        assert_eq!(bus.pending(), 1);

        assert_eq!(bus.drain(1), 1);
        assert_eq!(
            log.borrow().as_slice(),
            &[("h", "loaded:a".to_string(), Some(42))]
        );
        assert_eq!(bus.drain(5), 0);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn drain_is_fifo_and_respects_budget() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.subscribe("n", recorder("h", &log));

        let k = 25;
        let b = 10;
        for i in 0..k {
            bus.post(Event::new("n", EventSource::Input).with_context(i));
        }

        let mut drains = 0;
        while bus.pending() > 0 {
            let before = bus.pending();
            let done = bus.drain(b);
            assert_eq!(done, before.min(b));
            drains += 1;
        }
        assert_eq!(drains, (k as usize).div_ceil(b));

        let order: Vec<i32> = log.borrow().iter().map(|(_, _, c)| c.unwrap()).collect();
        assert_eq!(order, (0..k).collect::<Vec<_>>());
    }

    #[test]
    fn normal_queues_one_pair_per_subscriber() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.subscribe("n", recorder("a", &log));
        bus.subscribe("n", recorder("b", &log));

        assert_eq!(bus.post(Event::new("n", EventSource::Input)), 2);
        assert_eq!(bus.pending(), 2);
        bus.drain_default();
        let tags: Vec<_> = log.borrow().iter().map(|(t, _, _)| *t).collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn closures_are_handlers() {
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        let mut bus = EventBus::new();
        bus.subscribe(
            "c",
            Rc::new(move |_: &Event| *counter.borrow_mut() += 1),
        );
        bus.post(Event::high("c", EventSource::Input));
        bus.post(Event::new("c", EventSource::Input));
        bus.drain_default();
        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn clear_drops_everything() {
        let log = Log::default();
        let mut bus = EventBus::new();
        bus.subscribe("n", recorder("a", &log));
        bus.post(Event::new("n", EventSource::Input));
        bus.clear();
        assert_eq!(bus.pending(), 0);
        assert_eq!(bus.subscriber_count("n"), 0);
    }
}
