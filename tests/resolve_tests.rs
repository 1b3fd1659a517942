use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use taskid::{ResolverState, RuntimeRelease, UnitId};
use taskid_runtime::{spawn, yield_now, Runtime};

#[test]
fn id_is_stable_across_suspension() {
    let runtime = Runtime::new(16);
    let ids = runtime
        .run(async {
            let mut ids = vec![taskid::resolve_current_unit_id()];
            for _ in 0..5 {
                yield_now().await;
                ids.push(taskid::resolve_current_unit_id());
            }
            ids
        })
        .expect("main task finished");
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]), "{ids:?}");
}

#[test]
fn id_is_stable_while_waiting_on_another_task() {
    let runtime = Runtime::new(16);
    let (before, child, after) = runtime
        .run(async {
            let before = taskid::resolve_current_unit_id();
            let child = spawn(async {
                yield_now().await;
                taskid::resolve_current_unit_id()
            })
            .await;
            (before, child, taskid::resolve_current_unit_id())
        })
        .expect("main task finished");
    assert_eq!(before, after);
    assert_ne!(before, child);
}

#[test]
fn live_tasks_have_distinct_ids() {
    const TASKS: usize = 256;

    let runtime = Runtime::new(TASKS);
    let first_polls: Rc<RefCell<Vec<UnitId>>> = Rc::default();
    let seen = first_polls.clone();
    let finished = runtime
        .run(async move {
            let handles: Vec<_> = (0..TASKS)
                .map(|_| {
                    let seen = seen.clone();
                    spawn(async move {
                        let id = taskid::resolve_current_unit_id();
                        seen.borrow_mut().push(id);
                        // every sibling gets its first poll before anyone resumes
                        yield_now().await;
                        assert_eq!(id, taskid::resolve_current_unit_id());
                        id
                    })
                })
                .collect();
            futures::future::join_all(handles).await
        })
        .expect("main task finished");

    let first_polls = first_polls.borrow();
    assert_eq!(first_polls.len(), TASKS);
    let distinct: HashSet<_> = first_polls.iter().collect();
    assert_eq!(distinct.len(), TASKS);
    assert_eq!(*first_polls, finished);
}

#[test]
fn detection_happens_once_for_the_process() {
    let runtime = Runtime::new(64);
    runtime.run(async {
        for _ in 0..32 {
            spawn(async {
                taskid::resolve_current_unit_id();
                yield_now().await;
                taskid::resolve_current_unit_id();
            });
        }
    });
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                Runtime::new(4).run(async { taskid::resolve_current_unit_id() });
            });
        }
    });

    assert_eq!(taskid::global().source().detections(), 1);
    let expected = RuntimeRelease::parse(taskid_runtime::VERSION);
    match taskid::global().state() {
        ResolverState::Ready(detection) => assert_eq!(detection.release(), expected),
        other => panic!("unexpected resolver state {other:?}"),
    }
    assert_eq!(taskid::init(), Ok(expected));
    assert_eq!(taskid::global().source().detections(), 1);
}

#[test]
fn outside_a_task_is_an_error_not_a_value() {
    assert_eq!(taskid::try_current_unit_id(), Err(taskid::ResolveError::OutsideTask));
}

#[test]
#[should_panic(expected = "no task is running on this thread")]
fn resolving_outside_a_task_panics() {
    taskid::resolve_current_unit_id();
}
