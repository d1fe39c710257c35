//! `notification_contract` 集成测试：阈值通知的触发时机、次数与重入安全。
//!
//! # 测试目标（Why）
//! - 通知在锁外触发：监听器重入缓冲（查询、读取、写入）不得死锁；
//! - 监听器看到的快照必须等于触发操作完成后的状态；
//! - 每次满足条件的操作恰好触发一次，未安装或已移除时从不触发。

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use spark_ring::{Availability, RingBuffer, ThresholdListener};

/// 记录最近一次在回调内部重新查询到的可用量。
fn recorder() -> (
    Arc<Mutex<Option<(usize, usize)>>>,
    impl Fn(&RingBuffer, Availability) + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let callback = move |ring: &RingBuffer, _: Availability| {
        let now = ring.available();
        *sink.lock().unwrap() = Some((now.readable, now.writable));
    };
    (seen, callback)
}

/// 读回调阈值 4：写后可读量不足 4 不触发，达到后触发并在回调内观测到写后状态；
/// 切换为写回调阈值 4 后，读后可写量不足 4 不触发，达到后触发。
#[test]
fn callbacks_observe_post_operation_state_when_reentering() {
    let ring = RingBuffer::<u8>::new(8, 0).expect("创建缓冲失败");
    let (seen, callback) = recorder();

    ring.write(&[0xCE]).unwrap();
    assert_eq!(*seen.lock().unwrap(), None);

    ring.set_read_callback(callback, 4);
    ring.write(&[0xCE]).unwrap();
    assert_eq!(*seen.lock().unwrap(), None);
    ring.write(&[0xCE, 0xFA, 0xAD, 0xDE]).unwrap();
    assert_eq!(*seen.lock().unwrap(), Some((6, 2)));
    ring.clear_read_callback();

    let (seen, callback) = recorder();
    ring.set_write_callback(callback, 4);
    ring.read_vec(1).unwrap();
    assert_eq!(*seen.lock().unwrap(), None);
    ring.read_vec(4).unwrap();
    assert_eq!(*seen.lock().unwrap(), Some((1, 7)));
    ring.clear_write_callback();
}

/// 容量 8、已占用 7：读 1 后可写 2 不触发；再读 3 后可写 5，触发恰好一次。
#[test]
fn write_callback_fires_once_when_writable_reaches_threshold() {
    let ring = RingBuffer::<u8>::new(8, 0).expect("创建缓冲失败");
    ring.write(&[7; 7]).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    {
        let fired = Arc::clone(&fired);
        let snapshots = Arc::clone(&snapshots);
        ring.set_write_callback(
            move |_, available| {
                fired.fetch_add(1, Ordering::SeqCst);
                snapshots.lock().unwrap().push(available);
            },
            4,
        );
    }

    ring.read_vec(1).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    ring.read_vec(3).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(
        snapshots.lock().unwrap().as_slice(),
        &[Availability {
            readable: 3,
            writable: 5,
            rewindable: 0
        }]
    );
}

/// 失败的操作与回溯都不触发通知。
#[test]
fn failures_and_rewinds_never_notify() {
    let ring = RingBuffer::<u8>::new(4, 2).expect("创建缓冲失败");
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    ring.set_read_callback(
        move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        0,
    );
    let counter = Arc::clone(&fired);
    ring.set_write_callback(
        move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        0,
    );

    assert!(ring.write(&[0; 3]).is_err());
    assert!(ring.read(&mut [0; 1]).is_err());
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    ring.write(&[1, 2]).unwrap();
    ring.read_vec(2).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
    ring.rewind(2).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

/// 空写入不改变状态，但已有可读量满足阈值时仍触发一次，快照即当前状态；
/// 阈值高于当前可读量时空写入保持静默。
#[test]
fn empty_write_fires_when_existing_level_meets_threshold() {
    let ring = RingBuffer::<u8>::new(8, 0).expect("创建缓冲失败");
    ring.write(&[1, 2, 3, 4]).unwrap();

    let snapshots = Arc::new(Mutex::new(Vec::new()));
    {
        let snapshots = Arc::clone(&snapshots);
        ring.set_read_callback(
            move |_, available| snapshots.lock().unwrap().push(available),
            4,
        );
    }

    ring.write(&[]).unwrap();
    assert_eq!(
        snapshots.lock().unwrap().as_slice(),
        &[Availability {
            readable: 4,
            writable: 4,
            rewindable: 0
        }]
    );

    let silent = Arc::new(AtomicUsize::new(0));
    {
        let silent = Arc::clone(&silent);
        ring.set_read_callback(
            move |_, _| {
                silent.fetch_add(1, Ordering::SeqCst);
            },
            5,
        );
    }
    ring.write(&[]).unwrap();
    assert_eq!(silent.load(Ordering::SeqCst), 0);
    assert_eq!(ring.available().readable, 4);
}

/// 移除回调后不再触发；替换回调后只有新回调触发。
#[test]
fn cleared_or_replaced_callbacks_stop_firing() {
    let ring = RingBuffer::<u8>::new(4, 0).expect("创建缓冲失败");
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&first);
    ring.set_read_callback(
        move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        1,
    );
    ring.write(&[1]).unwrap();

    let counter = Arc::clone(&second);
    ring.set_read_callback(
        move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        1,
    );
    ring.write(&[2]).unwrap();

    ring.clear_read_callback();
    ring.write(&[3]).unwrap();

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

/// 监听器在回调内直接排空缓冲：重入读取不会死锁，且会级联触发写回调。
#[test]
fn listener_may_drain_ring_from_inside_callback() {
    let ring = RingBuffer::<u8>::new(8, 0).expect("创建缓冲失败");
    let drained = Arc::new(Mutex::new(Vec::new()));
    let writable_seen = Arc::new(AtomicUsize::new(0));

    {
        let drained = Arc::clone(&drained);
        ring.set_read_callback(
            move |ring: &RingBuffer, available| {
                let batch = ring.read_vec(available.readable).expect("回调内读取失败");
                drained.lock().unwrap().extend(batch);
            },
            4,
        );
    }
    {
        let writable_seen = Arc::clone(&writable_seen);
        ring.set_write_callback(
            move |_, available| writable_seen.store(available.writable, Ordering::SeqCst),
            8,
        );
    }

    ring.write(b"ab").unwrap();
    assert!(drained.lock().unwrap().is_empty());
    ring.write(b"cd").unwrap();
    assert_eq!(drained.lock().unwrap().as_slice(), b"abcd");
    assert_eq!(writable_seen.load(Ordering::SeqCst), 8);
    assert!(ring.is_empty());
}

/// 自定义监听器类型以 trait 对象安装，可被多个缓冲共享；复制出的缓冲沿用同一监听器。
#[test]
fn shared_listener_is_notified_by_every_ring() {
    #[derive(Default)]
    struct Tally(AtomicUsize);

    impl ThresholdListener<u8> for Tally {
        fn on_threshold(&self, _ring: &RingBuffer<u8>, _available: Availability) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let tally = Arc::new(Tally::default());
    let left = RingBuffer::<u8>::new(4, 0).unwrap();
    let right = RingBuffer::<u8>::new(4, 0).unwrap();
    left.set_read_listener(tally.clone(), 2);
    right.set_read_listener(tally.clone(), 2);

    left.write(&[1, 2]).unwrap();
    right.write(&[1]).unwrap();
    right.write(&[2]).unwrap();
    assert_eq!(tally.0.load(Ordering::SeqCst), 2);

    let copy = left.try_clone().unwrap();
    copy.write(&[3]).unwrap();
    assert_eq!(tally.0.load(Ordering::SeqCst), 3);
}

/// 多线程并发读写时，每个写回调都能在锁外完成查询，不出现死锁。
#[test]
fn concurrent_callbacks_do_not_deadlock() {
    let ring = Arc::new(RingBuffer::<u8>::new(64, 8).unwrap());
    let notifications = Arc::new(AtomicUsize::new(0));
    {
        let notifications = Arc::clone(&notifications);
        ring.set_read_callback(
            move |ring: &RingBuffer, _| {
                let _ = ring.available();
                notifications.fetch_add(1, Ordering::Relaxed);
            },
            1,
        );
    }

    const TOTAL: usize = 20_000;
    let producer = {
        let ring = Arc::clone(&ring);
        std::thread::spawn(move || {
            let mut sent = 0usize;
            while sent < TOTAL {
                let byte = [sent as u8];
                match ring.write(&byte) {
                    Ok(()) => sent += 1,
                    Err(err) => {
                        assert!(err.is_recoverable());
                        std::thread::yield_now();
                    }
                }
            }
        })
    };

    let mut received = 0usize;
    let mut byte = [0u8; 1];
    while received < TOTAL {
        match ring.read(&mut byte) {
            Ok(()) => {
                assert_eq!(byte[0], received as u8, "数据顺序必须保持");
                received += 1;
            }
            Err(_) => std::thread::yield_now(),
        }
    }

    producer.join().expect("生产者线程不应 panic");
    assert_eq!(notifications.load(Ordering::Relaxed), TOTAL);
}
