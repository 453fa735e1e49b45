use super::*;
use compose_map_renderer::{HeadlessMapRenderer, HostOperation, RendererError};

fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> EventSubscription {
    let sink = Rc::clone(log);
    let tag = tag.to_owned();
    EventSubscription::new(MapEventKind::MapIdle, move |_| sink.borrow_mut().push(tag.clone()))
}

#[test]
fn renderer_subscription_is_created_once_per_key() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut renderer = HeadlessMapRenderer::new();
    let mut registry = EventSubscriptionRegistry::new();
    let mut failures = Vec::new();

    assert_eq!(registry.update(&mut renderer, &[recorder(&log, "first")], &mut failures), 1);
    assert_eq!(registry.update(&mut renderer, &[recorder(&log, "second")], &mut failures), 0);
    assert_eq!(renderer.subscription_count(MapEventKind::MapIdle), 1);

    renderer.emit(MapEvent::MapIdle);
    assert_eq!(log.borrow().as_slice(), ["second".to_owned()]);
}

#[test]
fn subscriptions_of_one_kind_are_keyed_by_ordinal() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut renderer = HeadlessMapRenderer::new();
    let mut registry = EventSubscriptionRegistry::new();
    let mut failures = Vec::new();
    let both = [recorder(&log, "a"), recorder(&log, "b")];

    assert_eq!(registry.update(&mut renderer, &both, &mut failures), 2);
    let keys: Vec<SubscriptionKey> = registry.attached().copied().collect();
    assert_eq!(
        keys,
        vec![(MapEventKind::MapIdle, 0), (MapEventKind::MapIdle, 1)]
    );

    renderer.emit(MapEvent::MapIdle);
    assert_eq!(log.borrow().as_slice(), ["a".to_owned(), "b".to_owned()]);
}

#[test]
fn undeclared_keys_stop_dispatching_but_stay_attached() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut renderer = HeadlessMapRenderer::new();
    let mut registry = EventSubscriptionRegistry::new();
    let mut failures = Vec::new();
    registry.update(&mut renderer, &[recorder(&log, "a")], &mut failures);

    registry.update(&mut renderer, &[], &mut failures);
    renderer.emit(MapEvent::MapIdle);
    assert!(log.borrow().is_empty());
    assert!(!registry.is_active(&(MapEventKind::MapIdle, 0)));

    assert_eq!(registry.update(&mut renderer, &[recorder(&log, "back")], &mut failures), 0);
    renderer.emit(MapEvent::MapIdle);
    assert_eq!(log.borrow().as_slice(), ["back".to_owned()]);
}

#[test]
fn failed_subscribe_is_retried() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut renderer = HeadlessMapRenderer::new();
    renderer.fail_next(
        HostOperation::Subscribe,
        RendererError::Rejected {
            operation: "subscribe",
            reason: "observer limit".to_owned(),
        },
    );
    let mut registry = EventSubscriptionRegistry::new();
    let mut failures = Vec::new();

    assert_eq!(registry.update(&mut renderer, &[recorder(&log, "a")], &mut failures), 0);
    assert_eq!(failures.len(), 1);
    assert_eq!(registry.update(&mut renderer, &[recorder(&log, "a")], &mut failures), 1);
    assert_eq!(renderer.subscription_count(MapEventKind::MapIdle), 1);
}

#[test]
fn teardown_unsubscribes_everything() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut renderer = HeadlessMapRenderer::new();
    let mut registry = EventSubscriptionRegistry::new();
    let mut failures = Vec::new();
    let camera_log = Rc::clone(&log);
    let subscriptions = [
        recorder(&log, "idle"),
        EventSubscription::new(MapEventKind::CameraChanged, move |_| {
            camera_log.borrow_mut().push("camera".to_owned())
        }),
    ];
    registry.update(&mut renderer, &subscriptions, &mut failures);

    registry.teardown(&mut renderer, &mut failures);

    assert!(failures.is_empty());
    assert_eq!(renderer.subscription_count(MapEventKind::MapIdle), 0);
    assert_eq!(renderer.subscription_count(MapEventKind::CameraChanged), 0);
    assert_eq!(registry.attached().count(), 0);
}
