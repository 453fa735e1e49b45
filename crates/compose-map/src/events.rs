//! Declared renderer event subscriptions.
//!
//! Each declared subscription is keyed by its event kind and its ordinal
//! among subscriptions of that kind. The renderer subscription behind a key
//! is created once; later cycles only swap the handler it dispatches to.

use std::cell::RefCell;
use std::rc::Rc;

use compose_map_core::collections::map::HashMap;
use compose_map_core::OnceLatch;
use compose_map_renderer::{EventHost, MapEvent, MapEventKind, SubscriptionHandle};
use indexmap::IndexMap;

use crate::error::{record, ApplyFailure};

pub type EventHandler = Rc<dyn Fn(&MapEvent)>;

#[derive(Clone)]
pub struct EventSubscription {
    pub kind: MapEventKind,
    pub handler: EventHandler,
}

impl EventSubscription {
    pub fn new(kind: MapEventKind, handler: impl Fn(&MapEvent) + 'static) -> Self {
        Self {
            kind,
            handler: Rc::new(handler),
        }
    }
}

pub type SubscriptionKey = (MapEventKind, usize);

type HandlerSlot = Rc<RefCell<Option<EventHandler>>>;

#[derive(Default)]
struct Attachment {
    attach_once: OnceLatch,
    slot: HandlerSlot,
    handle: Option<SubscriptionHandle>,
}

#[derive(Default)]
pub struct EventSubscriptionRegistry {
    attachments: IndexMap<SubscriptionKey, Attachment>,
}

impl EventSubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys with a live renderer subscription.
    pub fn attached(&self) -> impl Iterator<Item = &SubscriptionKey> {
        self.attachments
            .iter()
            .filter(|(_, attachment)| attachment.handle.is_some())
            .map(|(key, _)| key)
    }

    /// Whether the key currently dispatches to a declared handler.
    pub fn is_active(&self, key: &SubscriptionKey) -> bool {
        self.attachments
            .get(key)
            .is_some_and(|attachment| attachment.slot.borrow().is_some())
    }

    /// Rebinds handlers and attaches keys seen for the first time. Returns
    /// the number of renderer subscriptions created.
    pub fn update<R: EventHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        subscriptions: &[EventSubscription],
        failures: &mut Vec<ApplyFailure>,
    ) -> usize {
        let mut ordinals: HashMap<MapEventKind, usize> = HashMap::default();
        let mut declared: Vec<SubscriptionKey> = Vec::with_capacity(subscriptions.len());
        let mut attached = 0;

        for subscription in subscriptions {
            let ordinal = ordinals.entry(subscription.kind).or_insert(0);
            let key = (subscription.kind, *ordinal);
            *ordinal += 1;
            declared.push(key);

            let attachment = self.attachments.entry(key).or_default();
            *attachment.slot.borrow_mut() = Some(Rc::clone(&subscription.handler));

            let mut first_sighting = false;
            attachment.attach_once.run(|| first_sighting = true);
            if !first_sighting {
                continue;
            }
            let slot = Rc::clone(&attachment.slot);
            let callback = Box::new(move |event: &MapEvent| {
                let handler = slot.borrow().clone();
                if let Some(handler) = handler {
                    handler(event);
                }
            });
            match renderer.subscribe(subscription.kind, callback) {
                Ok(handle) => {
                    log::trace!("subscribed {}#{} as {handle:?}", key.0, key.1);
                    attachment.handle = Some(handle);
                    attached += 1;
                }
                Err(error) => {
                    attachment.attach_once.reset();
                    record(
                        failures,
                        ApplyFailure::new(format!("{}#{}", key.0, key.1), "subscribe", error),
                    );
                }
            }
        }

        for (key, attachment) in self.attachments.iter() {
            if !declared.contains(key) {
                attachment.slot.borrow_mut().take();
            }
        }
        attached
    }

    /// Unsubscribes everything and forgets every key.
    pub fn teardown<R: EventHost + ?Sized>(
        &mut self,
        renderer: &mut R,
        failures: &mut Vec<ApplyFailure>,
    ) {
        for ((kind, ordinal), attachment) in self.attachments.drain(..) {
            attachment.slot.borrow_mut().take();
            if let Some(handle) = attachment.handle {
                if let Err(error) = renderer.unsubscribe(handle) {
                    record(
                        failures,
                        ApplyFailure::new(format!("{kind}#{ordinal}"), "unsubscribe", error),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/events_tests.rs"]
mod tests;
