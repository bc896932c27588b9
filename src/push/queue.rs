//! A bounded event queue that drops the oldest entry on overflow instead of
//! blocking the reader — mirrors the original implementation's channel
//! handling (`if len(l.Events) == l.chanSize { <-l.Events }`), which
//! `tokio::sync::mpsc` has no built-in equivalent for.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::model::Event;

pub(crate) struct EventQueue {
    capacity: usize,
    inner: Mutex<VecDeque<Event>>,
    notify: Notify,
    closed: std::sync::atomic::AtomicBool,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        EventQueue {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn push(&self, event: Event) {
        let mut guard = self.inner.lock().unwrap();
        if guard.len() == self.capacity {
            guard.pop_front();
        }
        guard.push_back(event);
        drop(guard);
        self.notify.notify_one();
    }

    pub fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub async fn recv(&self) -> Option<Event> {
        loop {
            {
                let mut guard = self.inner.lock().unwrap();
                if let Some(event) = guard.pop_front() {
                    return Some(event);
                }
                if self.closed.load(std::sync::atomic::Ordering::SeqCst) {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }
}
