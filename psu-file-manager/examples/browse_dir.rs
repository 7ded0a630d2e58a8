//! List a host directory the way the instrument's file manager shows the SD card.
//!
//! Usage: `cargo run -p psu-file-manager --example browse_dir -- [DIR] [SORT]`
//! where SORT is 0..=5 (name/size/time, ascending/descending).
//! Set `RUST_LOG=psu_file_manager=trace` to see the catalog events.

use std::time::{Duration, Instant};

use psu_file_manager::{
    FileManagerBuilder, LoadState, MemoryPreferences, SortOrder, StdStorage, StorageDriver,
};
use tracing_subscriber::{EnvFilter, fmt};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "psu_file_manager=debug,warn".into());
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let sort_order = args
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .map(SortOrder::from_index)
        .unwrap_or_default();

    let mut storage = StdStorage::new(&root);
    storage.mount()?;

    let (manager, owner) = FileManagerBuilder::new(storage)
        .preferences(MemoryPreferences {
            sort_order,
            ..Default::default()
        })
        .spawn()?;

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let state = manager.lock().state();
        match state {
            LoadState::Ready => break,
            LoadState::NotPresent => return Err(format!("cannot list {root}").into()),
            LoadState::Starting | LoadState::Loading if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(20));
            }
            state => return Err(format!("still {state:?} after 10 s").into()),
        }
    }

    {
        let mut session = manager.lock();
        println!(
            "{} ({} entries, sorted {:?})",
            session.current_dir_display(),
            session.entry_count(),
            session.sort_order()
        );
        let page = session.page_size();
        let mut start = 0;
        while start < session.entry_count() {
            // The last page is clamped back, so rows before `start` were already printed.
            session.set_scroll_start(start);
            let last = (session.scroll_start() + page).min(session.entry_count());
            for row in start..last {
                let modified =
                    chrono::DateTime::from_timestamp(i64::from(session.modified(row)), 0)
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                println!(
                    "{:>4}  {:<9} {:>10}  {}  {}",
                    row,
                    format!("{:?}", session.entry_type(row)),
                    session.size(row),
                    modified,
                    session.name(row)
                );
            }
            start += page;
        }
        if session.is_truncated() {
            println!("(listing truncated: arena full)");
        }
        if let Some(info) = session.storage_info() {
            println!("{} of {} bytes free", info.free, info.total());
        }
    }

    owner
        .shutdown()
        .map_err(|_| "file manager owner thread panicked")?;
    Ok(())
}
