use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use tempfile::TempDir;

use super::debounce::Debounce;
use super::roots::WatchSet;
use super::{Watcher, is_qualifying, is_temp_file};

fn make_event(paths: Vec<&str>, kind: EventKind) -> Event {
    Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

/// Start a counting watcher on its own thread and wait for setup.
fn spawn_counting(roots: Vec<PathBuf>, debounce: Duration) -> (Arc<Watcher>, Arc<AtomicUsize>, thread::JoinHandle<()>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let watcher = Arc::new(Watcher::new(roots, debounce, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let runner = Arc::clone(&watcher);
    let handle = thread::spawn(move || {
        runner.start().unwrap();
    });
    thread::sleep(Duration::from_millis(300));
    (watcher, count, handle)
}

// ----------------------------------------------------------------------------
// Debounce
// ----------------------------------------------------------------------------

#[test]
fn test_debounce_idle() {
    let mut debounce = Debounce::new(Duration::from_millis(100));
    assert!(debounce.deadline().is_none());
    assert!(!debounce.take_due(Instant::now()));
}

#[test]
fn test_debounce_rearm_replaces_deadline() {
    let mut debounce = Debounce::new(Duration::from_millis(100));
    let t0 = Instant::now();

    debounce.arm(t0);
    debounce.arm(t0 + Duration::from_millis(50));

    // First deadline has passed, but it was replaced
    assert!(!debounce.take_due(t0 + Duration::from_millis(120)));
    assert!(debounce.take_due(t0 + Duration::from_millis(150)));
    // Fires once
    assert!(!debounce.take_due(t0 + Duration::from_millis(500)));
    assert!(debounce.deadline().is_none());
}

#[test]
fn test_debounce_cancel() {
    let mut debounce = Debounce::new(Duration::from_millis(10));
    let t0 = Instant::now();
    debounce.arm(t0);
    debounce.cancel();
    assert!(!debounce.take_due(t0 + Duration::from_secs(1)));
}

// ----------------------------------------------------------------------------
// Event qualification
// ----------------------------------------------------------------------------

#[test]
fn test_qualifying_kinds() {
    let write = EventKind::Modify(ModifyKind::Data(DataChange::Any));
    let create = EventKind::Create(CreateKind::File);
    let remove = EventKind::Remove(RemoveKind::File);
    let rename = EventKind::Modify(ModifyKind::Name(RenameMode::Both));

    for kind in [write, create, remove, rename] {
        assert!(is_qualifying(&make_event(vec!["/site/content/a.md"], kind)), "{kind:?}");
    }
}

#[test]
fn test_metadata_and_access_ignored() {
    let chmod = EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions));
    let access = EventKind::Access(AccessKind::Any);

    assert!(!is_qualifying(&make_event(vec!["/site/content/a.md"], chmod)));
    assert!(!is_qualifying(&make_event(vec!["/site/content/a.md"], access)));
}

#[test]
fn test_temp_only_event_ignored() {
    let write = EventKind::Modify(ModifyKind::Data(DataChange::Any));
    assert!(!is_qualifying(&make_event(vec!["/site/content/.a.md.swp"], write)));
    assert!(is_qualifying(&make_event(
        vec!["/site/content/a.md~", "/site/content/a.md"],
        write
    )));
}

#[test]
fn test_is_temp_file() {
    assert!(is_temp_file(&PathBuf::from("/x/post.md.swp")));
    assert!(is_temp_file(&PathBuf::from("/x/post.md~")));
    assert!(is_temp_file(&PathBuf::from("/x/.hidden")));
    assert!(!is_temp_file(&PathBuf::from("/x/post.md")));
}

// ----------------------------------------------------------------------------
// Watch set
// ----------------------------------------------------------------------------

#[test]
fn test_watch_set_expands_directories_and_skips_missing() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    fs::create_dir_all(root.join("blog/2024")).unwrap();
    fs::write(root.join("forge.toml"), "").unwrap();

    let mut backend = notify::recommended_watcher(|_| {}).unwrap();
    let mut set = WatchSet::new(vec![
        root.join("blog"),
        root.join("forge.toml"),
        root.join("missing"),
    ]);
    set.attach_all(&mut backend);

    assert!(set.contains(&root.join("blog")));
    assert!(set.contains(&root.join("blog/2024")));
    assert!(set.contains(&root.join("forge.toml")));
    assert!(!set.contains(&root.join("missing")));
    assert_eq!(set.len(), 3);

    // Re-walking registers nothing twice
    assert_eq!(set.attach_tree(&mut backend, &root.join("blog")), 0);
}

#[test]
fn test_watch_set_detach_and_reattach() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    fs::create_dir_all(root.join("blog/2024")).unwrap();
    fs::write(root.join("forge.toml"), "").unwrap();
    fs::write(root.join("blog/post.md"), "").unwrap();

    let mut backend = notify::recommended_watcher(|_| {}).unwrap();
    let mut set = WatchSet::new(vec![root.join("blog"), root.join("forge.toml")]);
    set.attach_all(&mut backend);
    assert_eq!(set.len(), 3);

    fs::remove_dir_all(root.join("blog")).unwrap();
    assert_eq!(set.detach(&mut backend, &root.join("blog")), 2);
    assert!(!set.contains(&root.join("blog/2024")));

    fs::create_dir_all(root.join("blog/2025")).unwrap();
    assert_eq!(set.reattach(&mut backend, &root.join("blog")), 2);
    assert!(set.contains(&root.join("blog/2025")));

    // A replaced root file is registered again
    assert_eq!(set.detach(&mut backend, &root.join("forge.toml")), 1);
    assert_eq!(set.reattach(&mut backend, &root.join("forge.toml")), 1);

    // Plain files are covered by their directory
    fs::write(root.join("blog/new.md"), "").unwrap();
    assert_eq!(set.reattach(&mut backend, &root.join("blog/new.md")), 0);
    assert_eq!(set.len(), 3);
}

// ----------------------------------------------------------------------------
// Watcher lifecycle
// ----------------------------------------------------------------------------

#[test]
fn test_burst_fires_once() {
    let temp = TempDir::new().unwrap();
    let (watcher, count, handle) =
        spawn_counting(vec![temp.path().to_path_buf()], Duration::from_millis(250));

    for i in 0..5 {
        fs::write(temp.path().join(format!("page-{i}.md")), "hello").unwrap();
        thread::sleep(Duration::from_millis(30));
    }
    thread::sleep(Duration::from_millis(900));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    watcher.stop();
    handle.join().unwrap();
}

#[test]
fn test_spaced_changes_fire_separately() {
    let temp = TempDir::new().unwrap();
    let (watcher, count, handle) =
        spawn_counting(vec![temp.path().to_path_buf()], Duration::from_millis(100));

    fs::write(temp.path().join("a.md"), "one").unwrap();
    thread::sleep(Duration::from_millis(600));
    fs::write(temp.path().join("a.md"), "two").unwrap();
    thread::sleep(Duration::from_millis(600));

    assert_eq!(count.load(Ordering::SeqCst), 2);
    watcher.stop();
    handle.join().unwrap();
}

#[test]
fn test_new_directory_is_watched() {
    let temp = TempDir::new().unwrap();
    let (watcher, count, handle) =
        spawn_counting(vec![temp.path().to_path_buf()], Duration::from_millis(100));

    fs::create_dir(temp.path().join("notes")).unwrap();
    thread::sleep(Duration::from_millis(500));
    let after_mkdir = count.load(Ordering::SeqCst);
    assert_eq!(after_mkdir, 1);

    fs::write(temp.path().join("notes/first.md"), "nested").unwrap();
    thread::sleep(Duration::from_millis(500));
    assert_eq!(count.load(Ordering::SeqCst), 2);

    watcher.stop();
    handle.join().unwrap();
}

#[test]
fn test_recreated_directory_is_watched() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("notes")).unwrap();
    let (watcher, count, handle) =
        spawn_counting(vec![temp.path().to_path_buf()], Duration::from_millis(100));

    fs::remove_dir(temp.path().join("notes")).unwrap();
    thread::sleep(Duration::from_millis(500));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    fs::create_dir(temp.path().join("notes")).unwrap();
    thread::sleep(Duration::from_millis(500));
    assert_eq!(count.load(Ordering::SeqCst), 2);

    fs::write(temp.path().join("notes/again.md"), "back").unwrap();
    thread::sleep(Duration::from_millis(500));
    assert_eq!(count.load(Ordering::SeqCst), 3);

    watcher.stop();
    handle.join().unwrap();
}

#[test]
fn test_channel_variant_signals() {
    let temp = TempDir::new().unwrap();
    let (watcher, rx) = Watcher::channel(vec![temp.path().to_path_buf()], Duration::from_millis(100));
    let watcher = Arc::new(watcher);
    let runner = Arc::clone(&watcher);
    let handle = thread::spawn(move || runner.start().unwrap());
    thread::sleep(Duration::from_millis(300));

    fs::write(temp.path().join("index.md"), "# hi").unwrap();
    assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());

    watcher.stop();
    handle.join().unwrap();
}

#[test]
fn test_stop_is_idempotent_and_may_precede_start() {
    let watcher = Watcher::new(vec![PathBuf::from("/definitely/not/here")], Duration::from_millis(50), || {});
    watcher.stop();
    watcher.stop();

    let started = Instant::now();
    watcher.start().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_missing_roots_are_not_fatal() {
    let (watcher, count, handle) = spawn_counting(
        vec![PathBuf::from("/definitely/not/here")],
        Duration::from_millis(50),
    );
    watcher.stop();
    handle.join().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}
