//! Concurrency stress tests: many threads logging into shared sinks.

use fanlog::prelude::*;
use fanlog::{SinkResult, WriteAck};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct CountingSink {
    kind: SinkKind,
    written: AtomicUsize,
}

impl CountingSink {
    fn new(kind: SinkKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            written: AtomicUsize::new(0),
        })
    }
}

impl Sink for CountingSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }
    fn is_enabled(&self) -> bool {
        true
    }
    fn set_enabled(&self, _enabled: bool) {}
    fn min_severity(&self) -> Severity {
        Severity::Debug
    }
    fn write(&self, _record: &Record) -> SinkResult<WriteAck> {
        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(WriteAck::new(self.kind))
    }
    fn close(&self) {}
}

#[test]
fn concurrent_writers_lose_nothing_on_the_immediate_path() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let sink = CountingSink::new(SinkKind::Console);
    let logger = Arc::new(Logger::builder("stress").sink_arc(sink.clone()).build());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info(format!("thread {} message {}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sink.written.load(Ordering::SeqCst), THREADS * PER_THREAD);
    assert_eq!(
        logger.metrics().total_logged(),
        (THREADS * PER_THREAD) as u64
    );
}

#[test]
fn concurrent_writers_drain_through_the_deferred_lane() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 200;

    let sink = CountingSink::new(SinkKind::Database);
    let logger = Arc::new(
        Logger::builder("stress-deferred")
            .sink_arc(sink.clone())
            .queue_capacity(THREADS * PER_THREAD)
            .build(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.warning(format!("deferred {}", i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut logger = Arc::into_inner(logger).unwrap();
    assert!(logger.shutdown(Duration::from_secs(10)));
    assert_eq!(sink.written.load(Ordering::SeqCst), THREADS * PER_THREAD);
}

#[test]
fn reconfiguration_races_with_logging() {
    let sink = CountingSink::new(SinkKind::Console);
    let logger = Arc::new(Logger::builder("reconfig").sink_arc(sink).build());

    let writer = {
        let logger = Arc::clone(&logger);
        thread::spawn(move || {
            for i in 0..1000 {
                logger.info(format!("m{}", i));
            }
        })
    };
    let toggler = {
        let logger = Arc::clone(&logger);
        thread::spawn(move || {
            for _ in 0..100 {
                logger.set_sink_enabled(SinkKind::Console, false);
                logger.set_sink_enabled(SinkKind::Console, true);
            }
        })
    };

    writer.join().unwrap();
    toggler.join().unwrap();

    // Every record was either delivered or filtered; none vanished.
    let metrics = logger.metrics();
    assert_eq!(metrics.total_logged() + metrics.total_filtered(), 1000);
}

#[test]
fn full_queue_drops_are_counted_not_blocking() {
    struct BlockingSink {
        release: Mutex<()>,
    }
    impl Sink for BlockingSink {
        fn kind(&self) -> SinkKind {
            SinkKind::Database
        }
        fn is_enabled(&self) -> bool {
            true
        }
        fn set_enabled(&self, _enabled: bool) {}
        fn min_severity(&self) -> Severity {
            Severity::Debug
        }
        fn write(&self, _record: &Record) -> SinkResult<WriteAck> {
            let _held = self.release.lock();
            Ok(WriteAck::new(SinkKind::Database))
        }
        fn close(&self) {}
    }

    let sink = Arc::new(BlockingSink {
        release: Mutex::new(()),
    });
    let mut logger = Logger::builder("backpressure")
        .sink_arc(sink.clone())
        .queue_capacity(4)
        .build();

    // Hold the sink shut so the queue fills, then overflow it.
    {
        let _gate = sink.release.lock();
        thread::sleep(Duration::from_millis(20));
        for i in 0..100 {
            logger.info(format!("overflow {}", i));
        }
        // Calls returned immediately even though nothing could drain.
        assert!(logger.metrics().deferred_dropped() > 0);
    }

    logger.shutdown(Duration::from_secs(5));
    assert_eq!(
        logger.metrics().queue_full_events(),
        logger.metrics().deferred_dropped()
    );
}
