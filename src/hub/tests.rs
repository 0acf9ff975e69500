use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{Client, Hub, RELOAD};

/// Records everything the hub does to it.
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<String>>,
    closed: AtomicUsize,
    fail: AtomicBool,
}

struct FakeClient(Arc<Recorder>);

impl Client for FakeClient {
    fn send(&mut self, text: &str) -> tungstenite::Result<()> {
        if self.0.fail.load(Ordering::SeqCst) {
            return Err(tungstenite::Error::ConnectionClosed);
        }
        self.0.sent.lock().push(text.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn fake() -> (Box<dyn Client>, Arc<Recorder>) {
    let record = Arc::new(Recorder::default());
    (Box::new(FakeClient(Arc::clone(&record))), record)
}

fn spawn_hub() -> (Arc<Hub>, thread::JoinHandle<()>) {
    let hub = Arc::new(Hub::new());
    let runner = Arc::clone(&hub);
    let handle = thread::spawn(move || runner.run());
    (hub, handle)
}

fn wait_until(mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_broadcast_without_clients_does_not_block() {
    let hub = Hub::new();
    let started = Instant::now();
    // Nobody drains the queue: the first 16 are accepted, the rest dropped
    let accepted = (0..64).filter(|_| hub.broadcast(RELOAD)).count();
    assert_eq!(accepted, 16);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_broadcast_reaches_every_client() {
    let (hub, handle) = spawn_hub();
    let (a, record_a) = fake();
    let (b, record_b) = fake();
    hub.register(a);
    hub.register(b);
    wait_until(|| hub.client_count() == 2);

    assert!(hub.broadcast(RELOAD));
    wait_until(|| record_a.sent.lock().len() == 1 && record_b.sent.lock().len() == 1);
    assert_eq!(record_a.sent.lock()[0], "reload");

    hub.stop();
    handle.join().unwrap();
}

#[test]
fn test_write_failure_removes_and_closes_once() {
    let (hub, handle) = spawn_hub();
    let (healthy, healthy_record) = fake();
    let (broken, broken_record) = fake();
    broken_record.fail.store(true, Ordering::SeqCst);

    hub.register(healthy);
    let broken_id = hub.register(broken);
    wait_until(|| hub.client_count() == 2);

    hub.broadcast(RELOAD);
    wait_until(|| hub.client_count() == 1);
    assert_eq!(broken_record.closed.load(Ordering::SeqCst), 1);

    // Reader noticing the same disconnect later is a no-op
    hub.unregister(broken_id);
    hub.broadcast(RELOAD);
    wait_until(|| healthy_record.sent.lock().len() == 2);
    assert_eq!(broken_record.closed.load(Ordering::SeqCst), 1);

    hub.stop();
    handle.join().unwrap();
    assert_eq!(healthy_record.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unregister_closes_connection() {
    let (hub, handle) = spawn_hub();
    let (client, record) = fake();
    let id = hub.register(client);
    wait_until(|| hub.client_count() == 1);

    hub.unregister(id);
    hub.unregister(id);
    wait_until(|| hub.client_count() == 0);
    assert_eq!(record.closed.load(Ordering::SeqCst), 1);

    hub.stop();
    handle.join().unwrap();
    assert_eq!(record.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_twice_closes_each_client_once() {
    let (hub, handle) = spawn_hub();
    let records: Vec<_> = (0..3)
        .map(|_| {
            let (client, record) = fake();
            hub.register(client);
            record
        })
        .collect();
    wait_until(|| hub.client_count() == 3);

    hub.stop();
    hub.stop();
    handle.join().unwrap();

    assert_eq!(hub.client_count(), 0);
    for record in &records {
        assert_eq!(record.closed.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_stop_before_run() {
    let hub = Hub::new();
    let (pending, record) = fake();
    hub.register(pending);

    hub.stop();
    hub.stop();
    // Returns immediately, closing the registration that never got in
    hub.run();
    assert_eq!(record.closed.load(Ordering::SeqCst), 1);

    // Registering after stop closes right away
    let (late, late_record) = fake();
    hub.register(late);
    assert_eq!(late_record.closed.load(Ordering::SeqCst), 1);
    assert!(!hub.broadcast(RELOAD));
}

#[test]
fn test_second_run_returns() {
    let (hub, handle) = spawn_hub();
    wait_until(|| hub.running.load(Ordering::SeqCst));
    // Must not deadlock or spawn a competing loop
    hub.run();
    hub.stop();
    handle.join().unwrap();
}

#[test]
fn test_stop_without_run_closes_queued_registrations() {
    let hub = Hub::new();
    let (queued, record) = fake();
    hub.register(queued);
    assert_eq!(record.closed.load(Ordering::SeqCst), 0);

    hub.stop();
    assert_eq!(record.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_registration_queued_after_loop_exit_is_closed() {
    let (hub, handle) = spawn_hub();
    hub.stop();
    handle.join().unwrap();

    // A registration that passed the stopped check just before stop
    let (raced, raced_record) = fake();
    hub.register_tx.send((99, raced)).unwrap();

    let (late, late_record) = fake();
    hub.register(late);
    assert_eq!(late_record.closed.load(Ordering::SeqCst), 1);
    assert_eq!(raced_record.closed.load(Ordering::SeqCst), 1);
    assert_eq!(hub.register_rx.len(), 0);
}
