//! Page-lifetime mutable state. Everything here is touched only from event
//! handlers and resumed futures on the main thread; the channel-slot and
//! handle types enforce the at-most-one invariants.

use std::cell::RefCell;

use gloo_timers::callback::Interval;
use ragai_console::chat::AutoTitleGate;
use ragai_console::config_store::CrawlConfigStore;
use ragai_console::jobs::{ChannelSlots, LogChannel};

use crate::api::SseHandle;

thread_local! {
    pub static CRAWL_STORE: RefCell<CrawlConfigStore> = RefCell::new(CrawlConfigStore::new());
    pub static LOG_STREAMS: RefCell<ChannelSlots<SseHandle>> = RefCell::new(ChannelSlots::new());
    pub static TITLE_GATE: RefCell<AutoTitleGate> = RefCell::new(AutoTitleGate::new());
    pub static CURRENT_CONVERSATION: RefCell<Option<String>> = const { RefCell::new(None) };
    pub static CHAT_STREAM: RefCell<Option<SseHandle>> = const { RefCell::new(None) };
    pub static CURRENT_CRAWL_JOB: RefCell<Option<String>> = const { RefCell::new(None) };
    pub static CURRENT_INGEST_JOB: RefCell<Option<String>> = const { RefCell::new(None) };
    pub static INGEST_POLL: RefCell<Option<Interval>> = const { RefCell::new(None) };
    pub static WORKER_POLL: RefCell<Option<Interval>> = const { RefCell::new(None) };
}

/// Install a stream handle on a log channel, closing whatever held the
/// channel before.
pub fn assign_log_stream(channel: LogChannel, handle: SseHandle) {
    LOG_STREAMS.with(|slots| {
        if let Some(previous) = slots.borrow_mut().assign(channel, handle) {
            previous.close();
        }
    });
}

/// Idempotent close-and-clear for one channel.
pub fn close_log_stream(channel: LogChannel) {
    LOG_STREAMS.with(|slots| {
        if let Some(handle) = slots.borrow_mut().take(channel) {
            handle.close();
        }
    });
}

pub fn close_all_log_streams() {
    LOG_STREAMS.with(|slots| {
        for handle in slots.borrow_mut().take_all() {
            handle.close();
        }
    });
}

pub fn stop_ingest_poll() {
    INGEST_POLL.with(|slot| {
        if let Some(interval) = slot.borrow_mut().take() {
            interval.cancel();
        }
    });
}

pub fn stop_worker_poll() {
    WORKER_POLL.with(|slot| {
        if let Some(interval) = slot.borrow_mut().take() {
            interval.cancel();
        }
    });
}

pub fn close_chat_stream() {
    CHAT_STREAM.with(|slot| {
        if let Some(handle) = slot.borrow_mut().take() {
            handle.close();
        }
    });
}
