use std::path::PathBuf;

use psu_file_manager::{
    FileManagerBuilder, FileType, LoadState, SortOrder, StdStorage, StorageDriver,
};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    p.push(format!("psu-file-manager-{prefix}-{pid}-{t}"));
    p
}

fn volume(prefix: &str) -> PathBuf {
    let dir = unique_temp_dir(prefix);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("logs")).unwrap();
    std::fs::write(dir.join("logs/run1.dlog"), vec![0u8; 300]).unwrap();
    std::fs::write(dir.join("logs/run2.DLOG"), vec![0u8; 100]).unwrap();
    std::fs::write(dir.join("ramp.py"), b"print(1)").unwrap();
    std::fs::write(dir.join("notes.txt"), b"hello").unwrap();
    dir
}

#[test]
fn std_storage_lists_and_classifies_host_files() {
    let dir = volume("catalog");
    let mut storage = StdStorage::new(&dir);
    storage.mount().unwrap();

    let builder = FileManagerBuilder::new(storage);
    let (gate, _queue) = builder.channel(std::thread::current().id());
    let manager = builder.build(gate);

    let mut session = manager.lock();
    session.load_directory();
    assert_eq!(session.raw_state(), LoadState::Ready);
    assert_eq!(session.entry_count(), 3);
    assert_eq!(session.name(0), "logs");
    assert_eq!(session.entry_type(0), FileType::Directory);
    assert_eq!(session.entry_type(1), FileType::Other);
    assert_eq!(session.entry_type(2), FileType::Script);
    assert!(session.modified(1) > 0);

    session.select_entry(0);
    assert_eq!(session.current_dir(), "/logs");
    assert_eq!(session.entry_count(), 2);
    session.set_sort_order(SortOrder::SizeAsc);
    assert_eq!(session.name(0), "run2.DLOG");
    assert_eq!(session.size(0), 100);
    drop(session);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn std_storage_rename_and_delete_through_the_session() {
    let dir = volume("ops");
    let mut storage = StdStorage::new(&dir).with_capacity(1 << 20);
    storage.mount().unwrap();

    let builder = FileManagerBuilder::new(storage);
    let (gate, _queue) = builder.channel(std::thread::current().id());
    let manager = builder.build(gate);

    let mut session = manager.lock();
    session.load_directory();
    // logs, notes.txt, ramp.py
    session.select_entry(1);
    session.on_rename_input("todo");
    assert!(dir.join("todo.txt").exists());
    assert!(!dir.join("notes.txt").exists());
    assert_eq!(session.name(2), "todo.txt");

    session.select_entry(2);
    session.delete_selected();
    assert!(!dir.join("todo.txt").exists());
    assert_eq!(session.entry_count(), 2);

    let info = session.storage_info().unwrap();
    assert_eq!(info.total(), 1 << 20);
    assert_eq!(info.used, 300 + 100 + 8);
    drop(session);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unmounted_std_storage_reports_not_present() {
    let dir = volume("unmounted");
    let builder = FileManagerBuilder::new(StdStorage::new(&dir));
    let (gate, _queue) = builder.channel(std::thread::current().id());
    let manager = builder.build(gate);

    let mut session = manager.lock();
    assert_eq!(session.state(), LoadState::NotPresent);
    session.load_directory();
    assert_eq!(session.raw_state(), LoadState::NotPresent);
    drop(session);

    std::fs::remove_dir_all(&dir).unwrap();
}
