// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Fan-in scheduler behaviour across real producer threads.

use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use streamfunnel::crossbeam_channel::Receiver;
use streamfunnel::{
    ChannelSink, FlowReturn, FnSink, FunnelConfig, RoundRobinFunnel, SourceId, StreamEvent,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn funnel(config: FunnelConfig) -> (RoundRobinFunnel<u32>, Receiver<StreamEvent<u32>>) {
    streamfunnel::init_logging("streamfunnel=debug");
    let (sink, rx) = ChannelSink::<u32>::unbounded();
    (RoundRobinFunnel::new(config, Box::new(sink)).unwrap(), rx)
}

fn collect_until_eos(rx: &Receiver<StreamEvent<u32>>) -> Vec<StreamEvent<u32>> {
    let mut events = Vec::new();
    loop {
        let event = rx.recv_timeout(RECV_TIMEOUT).expect("funnel stalled");
        let done = event == StreamEvent::Eos;
        events.push(event);
        if done {
            return events;
        }
    }
}

fn data_sources(events: &[StreamEvent<u32>]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Data(item) => item.source_id.map(|id| id.as_u32()),
            _ => None,
        })
        .collect()
}

fn payloads_of(events: &[StreamEvent<u32>], source: u32) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Data(item) if item.source_id == Some(SourceId(source)) => {
                Some(item.payload)
            }
            _ => None,
        })
        .collect()
}

#[test]
#[serial]
fn test_equal_rate_producers_are_visited_round_robin() {
    let (funnel, rx) = funnel(FunnelConfig::default());
    let producers: Vec<_> = (0..3).map(|_| funnel.register_producer(None).unwrap()).collect();
    funnel.start().unwrap();

    let threads: Vec<_> = producers
        .iter()
        .cloned()
        .map(|producer| {
            thread::spawn(move || {
                for i in 0..5 {
                    assert!(producer.push(i).is_ok());
                    thread::sleep(Duration::from_millis(2));
                }
                producer.mark_eos();
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let events = collect_until_eos(&rx);
    let expected: Vec<u32> = (0..15).map(|i| i % 3).collect();
    assert_eq!(data_sources(&events), expected);

    // Announcements precede data, and the global segment precedes all data.
    let first_data = events.iter().position(|e| e.is_data()).unwrap();
    assert!(events[..first_data].contains(&StreamEvent::PadAdded(SourceId(0))));
    assert!(matches!(events[first_data - 1], StreamEvent::Segment(None, _)));

    // Every producer's EOS is forwarded before the terminal EOS.
    let tail = &events[events.len() - 4..];
    assert_eq!(
        tail,
        &[
            StreamEvent::SourceEos(SourceId(0)),
            StreamEvent::SourceEos(SourceId(1)),
            StreamEvent::SourceEos(SourceId(2)),
            StreamEvent::Eos,
        ]
    );

    funnel.join();
    assert!(!funnel.is_running());
}

#[test]
#[serial]
fn test_per_producer_order_is_preserved() {
    let (funnel, rx) = funnel(FunnelConfig::default().with_queue_size(3));
    let producers: Vec<_> = (0..4).map(|_| funnel.register_producer(None).unwrap()).collect();
    funnel.start().unwrap();

    let threads: Vec<_> = producers
        .iter()
        .cloned()
        .enumerate()
        .map(|(n, producer)| {
            thread::spawn(move || {
                for i in 0..50 {
                    producer.push(i);
                    if (i as usize + n) % 7 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                producer.mark_eos();
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let events = collect_until_eos(&rx);
    for source in 0..4 {
        assert_eq!(payloads_of(&events, source), (0..50).collect::<Vec<_>>());
    }
}

#[test]
#[serial]
fn test_silent_producer_is_skipped_after_timeout() {
    let (funnel, rx) = funnel(FunnelConfig::default().with_wait_timeout_ms(20));
    let p0 = funnel.register_producer(None).unwrap();
    let p1 = funnel.register_producer(None).unwrap();
    let p2 = funnel.register_producer(None).unwrap();
    funnel.start().unwrap();

    let started = Instant::now();
    let threads: Vec<_> = [p0.clone(), p2.clone()]
        .into_iter()
        .map(|producer| {
            thread::spawn(move || {
                for i in 0..10 {
                    producer.push(i);
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let mut seen = Vec::new();
    while seen.len() < 20 {
        if let StreamEvent::Data(item) = rx.recv_timeout(RECV_TIMEOUT).unwrap() {
            seen.push(item.source_id.unwrap().as_u32());
        }
    }
    // p1 costs at most one timeout per pass, never a stall.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!seen.contains(&1));
    assert_eq!(seen.iter().filter(|&&s| s == 0).count(), 10);
    assert_eq!(seen.iter().filter(|&&s| s == 2).count(), 10);

    p1.push(99);
    loop {
        if let StreamEvent::Data(item) = rx.recv_timeout(RECV_TIMEOUT).unwrap() {
            assert_eq!(item.source_id, Some(SourceId(1)));
            assert_eq!(item.payload, 99);
            break;
        }
    }
    funnel.stop();
}

#[test]
#[serial]
fn test_ready_item_emitted_within_one_pass() {
    let (funnel, rx) = funnel(FunnelConfig::default().with_wait_timeout_ms(50));
    let quiet = funnel.register_producer(None).unwrap();
    let busy = funnel.register_producer(None).unwrap();
    funnel.start().unwrap();

    // Let both announcements and the quiet producer's first deadline pass.
    thread::sleep(Duration::from_millis(100));
    while rx.try_recv().is_ok() {}

    let pushed = Instant::now();
    busy.push(1);
    loop {
        if let StreamEvent::Data(item) = rx.recv_timeout(RECV_TIMEOUT).unwrap() {
            assert_eq!(item.source_id, Some(busy.id()));
            break;
        }
    }
    assert!(pushed.elapsed() < Duration::from_millis(500));
    drop(quiet);
    funnel.stop();
}

#[test]
#[serial]
fn test_push_blocks_at_capacity() {
    let (funnel, rx) = funnel(FunnelConfig::default().with_queue_size(2));
    let producer = funnel.register_producer(None).unwrap();

    assert!(producer.push(0).is_ok());
    assert!(producer.push(1).is_ok());
    assert_eq!(producer.queued(), producer.capacity());

    let blocked = {
        let producer = producer.clone();
        thread::spawn(move || producer.push(2))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!blocked.is_finished());
    assert_eq!(producer.queued(), 2);

    funnel.start().unwrap();
    assert_eq!(blocked.join().unwrap(), FlowReturn::Ok);
    producer.mark_eos();

    let events = collect_until_eos(&rx);
    assert_eq!(payloads_of(&events, 0), vec![0, 1, 2]);
}

#[test]
#[serial]
fn test_terminal_eos_waits_for_every_producer() {
    let (funnel, rx) = funnel(FunnelConfig::default().with_wait_timeout_ms(5));
    let p0 = funnel.register_producer(None).unwrap();
    let p1 = funnel.register_producer(None).unwrap();
    funnel.start().unwrap();

    p0.push(1);
    p0.mark_eos();
    let deadline = Instant::now() + Duration::from_millis(150);
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(event) => assert_ne!(event, StreamEvent::Eos),
            Err(_) => break,
        }
    }

    p1.mark_eos();
    let events = collect_until_eos(&rx);
    assert!(events.contains(&StreamEvent::SourceEos(SourceId(1))));
    assert_eq!(events.last(), Some(&StreamEvent::Eos));
    funnel.join();
}

#[test]
#[serial]
fn test_unregister_mid_stream_sends_eos_before_removal() {
    let (funnel, rx) = funnel(FunnelConfig::default().with_wait_timeout_ms(10));
    let leaving = funnel.register_producer(None).unwrap();
    let staying = funnel.register_producer(None).unwrap();
    funnel.start().unwrap();

    leaving.push(1);
    staying.push(2);
    thread::sleep(Duration::from_millis(50));
    funnel.unregister_producer(&leaving).unwrap();
    assert_eq!(funnel.producer_count(), 1);

    staying.push(3);
    staying.mark_eos();
    let events = collect_until_eos(&rx);

    let eos = events
        .iter()
        .position(|e| *e == StreamEvent::SourceEos(SourceId(0)))
        .unwrap();
    assert_eq!(events[eos + 1], StreamEvent::PadRemoved(SourceId(0)));
    assert!(events[eos..]
        .iter()
        .all(|e| !(e.is_data() && e.source_id() == Some(SourceId(0)))));
    assert_eq!(payloads_of(&events, 1), vec![2, 3]);
    assert_eq!(leaving.push(4), FlowReturn::NotLinked);
}

#[test]
#[serial]
fn test_downstream_failure_is_reported_and_recovers() {
    streamfunnel::init_logging("streamfunnel=debug");
    let failing = Arc::new(AtomicBool::new(true));
    let sink = {
        let failing = Arc::clone(&failing);
        FnSink(move |event: StreamEvent<u32>| {
            if event.is_data() && failing.load(Ordering::SeqCst) {
                FlowReturn::Flushing
            } else {
                FlowReturn::Ok
            }
        })
    };
    let funnel =
        RoundRobinFunnel::new(FunnelConfig::default().with_wait_timeout_ms(5), Box::new(sink))
            .unwrap();
    let producer = funnel.register_producer(None).unwrap();
    funnel.start().unwrap();

    producer.push(1);
    wait_for_flow(&funnel, FlowReturn::Flushing);
    assert_eq!(producer.push(2), FlowReturn::Flushing);

    failing.store(false, Ordering::SeqCst);
    producer.push(3);
    wait_for_flow(&funnel, FlowReturn::Ok);
    assert_eq!(producer.push(4), FlowReturn::Ok);
    funnel.stop();
}

fn wait_for_flow(funnel: &RoundRobinFunnel<u32>, flow: FlowReturn) {
    let deadline = Instant::now() + RECV_TIMEOUT;
    while funnel.last_flow() != flow {
        assert!(Instant::now() < deadline, "never observed {}", flow);
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
#[serial]
fn test_stop_releases_blocked_producer() {
    let (funnel, _rx) = funnel(FunnelConfig::default().with_queue_size(1));
    let producer = funnel.register_producer(None).unwrap();
    producer.push(0);

    let blocked = {
        let producer = producer.clone();
        thread::spawn(move || producer.push(1))
    };
    thread::sleep(Duration::from_millis(20));
    funnel.stop();
    assert_eq!(blocked.join().unwrap(), FlowReturn::Flushing);
    assert_eq!(producer.queued(), 0);
}
