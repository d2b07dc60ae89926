// ABOUTME: Single worker thread running fire-and-forget remote writes in order
// ABOUTME: flush() waits for everything queued before it

use crate::Result;
use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(String, Job),
    Flush(Sender<()>),
}

pub struct BackgroundQueue {
    sender: Mutex<Option<Sender<Message>>>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundQueue {
    pub fn new(name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Message>();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for message in rx {
                    match message {
                        Message::Run(description, job) => {
                            debug!("Running queued task: {}", description);
                            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                                log::error!("Queued task panicked: {}", description);
                            }
                        }
                        Message::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })?;

        Ok(BackgroundQueue {
            sender: Mutex::new(Some(tx)),
            worker: Some(worker),
        })
    }

    fn send(&self, message: Message) -> bool {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match sender.as_ref() {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    pub fn push(&self, description: impl Into<String>, job: impl FnOnce() + Send + 'static) {
        let description = description.into();
        if !self.send(Message::Run(description.clone(), Box::new(job))) {
            log::warn!("Background queue stopped, dropped task: {}", description);
        }
    }

    /// Blocks until every task queued before this call has run.
    pub fn flush(&self) {
        let (tx, rx) = mpsc::channel();
        if self.send(Message::Flush(tx)) {
            let _ = rx.recv();
        }
    }
}

impl Drop for BackgroundQueue {
    fn drop(&mut self) {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_jobs_run_in_order_before_flush_returns() {
        let queue = BackgroundQueue::new("test-queue").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let seen = Arc::clone(&seen);
            queue.push(format!("job {}", i), move || seen.lock().unwrap().push(i));
        }
        queue.flush();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_panicking_job_does_not_stop_worker() {
        let queue = BackgroundQueue::new("test-queue").unwrap();
        let ran = Arc::new(Mutex::new(false));

        queue.push("explodes", || panic!("write failed hard"));
        let flag = Arc::clone(&ran);
        queue.push("after", move || *flag.lock().unwrap() = true);
        queue.flush();

        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn test_drop_drains_pending_jobs() {
        let seen = Arc::new(Mutex::new(0));
        {
            let queue = BackgroundQueue::new("test-queue").unwrap();
            let seen = Arc::clone(&seen);
            queue.push("increment", move || *seen.lock().unwrap() += 1);
        }
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
