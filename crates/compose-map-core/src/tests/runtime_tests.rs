use super::*;
use std::cell::RefCell;
use std::rc::Rc;

fn runtime() -> (Runtime, Arc<TestScheduler>) {
    let scheduler = Arc::new(TestScheduler::default());
    (Runtime::new(scheduler.clone()), scheduler)
}

#[test]
fn spawned_tasks_wait_for_the_next_turn() {
    let (runtime, scheduler) = runtime();
    let handle = runtime.handle();
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_task = Rc::clone(&log);
    handle.spawn_task(Box::new(move || log_task.borrow_mut().push("task")));
    log.borrow_mut().push("after spawn");

    assert!(runtime.needs_turn());
    assert_eq!(scheduler.requests(), 1);
    assert_eq!(*log.borrow(), vec!["after spawn"]);

    assert_eq!(runtime.drain_tasks(), 1);
    assert_eq!(*log.borrow(), vec!["after spawn", "task"]);
    assert!(!runtime.needs_turn());
}

#[test]
fn tasks_spawned_while_draining_run_on_the_following_turn() {
    let (runtime, _scheduler) = runtime();
    let handle = runtime.handle();
    let runs = Rc::new(RefCell::new(Vec::new()));

    let nested_handle = handle.clone();
    let runs_outer = Rc::clone(&runs);
    handle.spawn_task(Box::new(move || {
        runs_outer.borrow_mut().push(1);
        let runs_inner = Rc::clone(&runs_outer);
        nested_handle.spawn_task(Box::new(move || runs_inner.borrow_mut().push(2)));
    }));

    runtime.drain_tasks();
    assert_eq!(*runs.borrow(), vec![1]);
    assert!(runtime.has_pending_tasks());
    assert!(runtime.needs_turn());

    runtime.drain_tasks();
    assert_eq!(*runs.borrow(), vec![1, 2]);
    assert_eq!(runtime.turn(), 2);
}

#[test]
fn detached_handle_drops_tasks_unrun() {
    let handle = {
        let (runtime, _scheduler) = runtime();
        runtime.handle()
    };
    assert!(!handle.is_alive());
    let ran = Rc::new(RefCell::new(false));
    let ran_task = Rc::clone(&ran);
    handle.spawn_task(Box::new(move || *ran_task.borrow_mut() = true));
    assert!(!*ran.borrow());
    assert_eq!(Rc::strong_count(&ran), 1);
    assert!(!handle.has_pending_tasks());
    assert_eq!(handle.drain_tasks(), 0);
}

#[test]
fn binding_writes_request_a_turn() {
    let (runtime, scheduler) = runtime();
    let binding = crate::Binding::with_runtime(1, runtime.handle());
    binding.set(2);
    assert_eq!(binding.get(), 2);
    assert_eq!(binding.write_count(), 1);
    assert_eq!(scheduler.requests(), 1);
}
