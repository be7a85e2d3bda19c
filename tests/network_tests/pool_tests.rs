//! Tests for WorkerPool

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use crossbeam::channel;
use wordbank::network::WorkerPool;
use wordbank::WordbankError;

#[test]
fn test_pool_runs_all_jobs() {
    let pool = WorkerPool::new(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..100 {
        let counter = Arc::clone(&counter);
        pool.spawn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.join();
    assert_eq!(counter.load(Ordering::SeqCst), 100);
}

#[test]
fn test_pool_zero_size_rejected() {
    assert!(matches!(WorkerPool::new(0), Err(WordbankError::Config(_))));
}

#[test]
fn test_pool_runs_jobs_concurrently() {
    const SIZE: usize = 4;
    let pool = WorkerPool::new(SIZE).unwrap();
    assert_eq!(pool.size(), SIZE);

    // Every job waits for all the others, so this only finishes if they
    // run at the same time
    let barrier = Arc::new(Barrier::new(SIZE));
    let (tx, rx) = channel::unbounded();
    for _ in 0..SIZE {
        let barrier = Arc::clone(&barrier);
        let tx = tx.clone();
        pool.spawn(move || {
            barrier.wait();
            tx.send(()).unwrap();
        })
        .unwrap();
    }

    for _ in 0..SIZE {
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}

#[test]
fn test_pool_survives_panicking_job() {
    let pool = WorkerPool::new(1).unwrap();
    let (tx, rx) = channel::unbounded();

    pool.spawn(|| panic!("job failure")).unwrap();
    pool.spawn(move || tx.send(42).unwrap()).unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
}

#[test]
fn test_pool_spawn_after_shutdown_fails() {
    let pool = WorkerPool::new(2).unwrap();
    pool.shutdown();

    assert!(pool.is_shutdown());
    assert!(matches!(pool.spawn(|| {}), Err(WordbankError::PoolShutdown)));
}

#[test]
fn test_pool_shutdown_drains_queue() {
    let pool = WorkerPool::new(1).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        pool.spawn(move || {
            std::thread::sleep(Duration::from_millis(1));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    // Queued jobs still run after shutdown
    pool.shutdown();
    pool.join();
    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert_eq!(pool.active(), 0);
}
