use libasync::{set_thread_wait_handler, Builder, Scheduler, Task, WaitHandle};

use std::sync::atomic::Ordering::{Relaxed, SeqCst};
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn nested_spawn_and_wait_on_a_single_worker() {
    const OUTER: usize = 100;
    const INNER: usize = 10;

    init_log();

    // One worker: every wait below must make progress by executing other
    // tasks, or the test deadlocks.
    let pool = Builder::new().pool_size(1).build();
    let cnt = Arc::new(AtomicUsize::new(0));

    let outers: Vec<_> = (0..OUTER)
        .map(|_| {
            let cnt = cnt.clone();
            let sender = pool.sender().clone();

            pool.spawn(move || {
                let inners: Vec<_> = (0..INNER)
                    .map(|_| {
                        let cnt = cnt.clone();
                        sender.spawn(move || {
                            cnt.fetch_add(1, Relaxed);
                        })
                    })
                    .collect();

                for inner in &inners {
                    inner.wait();
                }

                cnt.fetch_add(1, Relaxed);
            })
        })
        .collect();

    for outer in &outers {
        outer.wait();
    }

    assert_eq!(OUTER * (INNER + 1), cnt.load(Relaxed));
}

#[test]
fn wait_picks_up_the_local_task() {
    init_log();

    let pool = Builder::new().pool_size(1).build();
    let sender = pool.sender().clone();
    let (tx, rx) = mpsc::channel();

    let outer = pool.spawn(move || {
        let inner_tx = tx.clone();
        let inner = sender.spawn(move || {
            inner_tx.send(thread::current().id()).unwrap();
        });

        // The worker's own deque holds the inner task; the wait runs it
        // right here instead of parking.
        inner.wait();

        tx.send(thread::current().id()).unwrap();
    });

    outer.wait();

    let inner_thread = rx.recv().unwrap();
    let outer_thread = rx.recv().unwrap();
    assert_eq!(inner_thread, outer_thread);
}

#[test]
fn waiter_steals_from_a_busy_peer() {
    init_log();

    let pool = Builder::new().pool_size(2).build();
    let done = Arc::new(AtomicBool::new(false));

    let task = {
        let done = done.clone();
        Task::new(move || done.store(true, SeqCst))
    };
    let handle = task.wait_handle();

    // One worker blocks waiting on the task before it is even scheduled.
    let parent = pool.spawn({
        let handle = handle.clone();
        move || handle.wait()
    });

    // The other worker queues the task on its own deque and then spins
    // until someone else has run it. Only the waiting worker can, by
    // stealing it.
    let sender = pool.sender().clone();
    let spin_done = done.clone();
    let blocker = pool.spawn(move || {
        thread::sleep(Duration::from_millis(50));
        sender.schedule(task);

        while !spin_done.load(SeqCst) {
            thread::yield_now();
        }
    });

    parent.wait();
    blocker.wait();
    assert!(done.load(SeqCst));
}

#[test]
fn generic_wait_from_an_external_thread() {
    init_log();

    let pool = Builder::new().pool_size(2).build();
    let (tx, rx) = mpsc::channel();

    let handle = pool.spawn(move || {
        thread::sleep(Duration::from_millis(20));
        tx.send(thread::current().id()).unwrap();
    });

    // The test thread is not a worker, so this parks on a private event
    // rather than entering the scheduling loop.
    handle.wait();
    assert!(handle.is_ready());

    let worker_thread = rx.try_recv().unwrap();
    assert_ne!(thread::current().id(), worker_thread);
}

#[test]
fn wait_on_finished_task_returns_immediately() {
    init_log();

    let task = Task::new(|| {});
    let handle = task.wait_handle();
    task.run();

    handle.wait();
    assert!(handle.is_ready());
}

#[test]
fn wait_handler_can_be_swapped_and_restored() {
    static SPUN: AtomicBool = AtomicBool::new(false);

    fn spin_handler(task: &WaitHandle) {
        SPUN.store(true, SeqCst);

        while !task.is_ready() {
            thread::yield_now();
        }
    }

    init_log();

    let previous = set_thread_wait_handler(spin_handler);

    let pool = Builder::new().pool_size(1).build();

    // The task cannot finish until the custom handler has run, so the
    // wait below cannot hit the already-ready fast path.
    let handle = pool.spawn(|| {
        while !SPUN.load(SeqCst) {
            thread::yield_now();
        }
    });

    handle.wait();
    assert!(SPUN.load(SeqCst));

    set_thread_wait_handler(previous);
}
