use std::{
    sync::{
        mpsc::{channel, Receiver, Sender},
        Arc, RwLock,
    },
    thread,
};

/// A comment lifecycle notification: something happened to `comment_id`.
/// The optional fields are hints for the case where the comment is already
/// gone upstream by the time a recorder looks it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentEvent {
    pub comment_id: i64,
    pub post_id: Option<i64>,
    pub parent_id: Option<i64>,
}

impl CommentEvent {
    pub fn new(comment_id: i64) -> Self {
        Self {
            comment_id,
            post_id: None,
            parent_id: None,
        }
    }

    pub fn with_hints(comment_id: i64, post_id: i64, parent_id: i64) -> Self {
        Self {
            comment_id,
            post_id: Some(post_id),
            parent_id: Some(parent_id),
        }
    }
}

/// Fanout hub between the comment subsystem and any number of observers.
/// Each observer gets its own channel; `observe` drains it on a dedicated
/// thread, so an attached recorder sees events one at a time, in the order
/// they were announced.
#[derive(Clone)]
pub struct CommentEvents {
    senders: Arc<RwLock<Vec<Sender<CommentEvent>>>>,
}

impl CommentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, event: CommentEvent) {
        let mut senders = self.senders.write().unwrap();
        senders.retain(|tx| tx.send(event).is_ok());
    }

    pub fn observer(&self) -> Receiver<CommentEvent> {
        let (tx, rx) = channel();
        self.senders.write().unwrap().push(tx);
        rx
    }

    pub fn observe(&self, mut callback: impl FnMut(CommentEvent) + Send + 'static) {
        let rx = self.observer();
        thread::spawn(move || {
            rx.iter().for_each(|event| callback(event));
        });
    }
}

impl Default for CommentEvents {
    fn default() -> Self {
        Self {
            senders: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn single_observer_receives() {
        let events = CommentEvents::new();
        let rx = events.observer();
        events.notify(CommentEvent::new(7));
        let received = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received.comment_id, 7);
    }

    #[test]
    fn observers_see_events_in_order() {
        let events = CommentEvents::new();
        let rx = events.observer();
        for id in 1..=5 {
            events.notify(CommentEvent::new(id));
        }
        let ids: Vec<i64> = (0..5)
            .map(|_| {
                rx.recv_timeout(Duration::from_millis(100))
                    .unwrap()
                    .comment_id
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn callback_runs_on_observer_thread() {
        let events = CommentEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        events.observe(move |event| {
            seen_clone.lock().unwrap().push(event.comment_id);
        });
        thread::sleep(Duration::from_millis(10));
        events.notify(CommentEvent::new(1));
        events.notify(CommentEvent::new(2));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn dropped_observers_are_cleaned_up() {
        let events = CommentEvents::new();
        {
            let _rx = events.observer();
        }
        let live = events.observer();
        events.notify(CommentEvent::new(3));
        let received = live.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received.comment_id, 3);
    }

    #[test]
    fn clones_share_observers() {
        let hub = CommentEvents::new();
        let hub_clone = hub.clone();
        let rx = hub.observer();
        hub_clone.notify(CommentEvent::with_hints(9, 4, 0));
        let event = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event.comment_id, 9);
        assert_eq!(event.post_id, Some(4));
        assert_eq!(event.parent_id, Some(0));
    }
}
