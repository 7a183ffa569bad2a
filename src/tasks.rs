//! Owned background tasks with cancellation on teardown.
//!
//! All spawning goes through the ambient tokio runtime; callers must be
//! inside one.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, sleep, Duration, Instant, MissedTickBehavior};

use crate::logging::{debug, obj, v_str, Domain};

pub struct TaskSet {
    name: &'static str,
    alive: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskSet {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            alive: Arc::new(AtomicBool::new(true)),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Runs `job` once per `period`, first run one period from now.
    pub fn every<F, Fut>(&self, period: Duration, job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticker = interval_at(Instant::now() + period, period);
        self.run_ticker(ticker, job);
    }

    /// Runs `job` immediately, then once per `period`.
    pub fn every_now<F, Fut>(&self, period: Duration, job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.run_ticker(interval(period), job);
    }

    fn run_ticker<F, Fut>(&self, mut ticker: tokio::time::Interval, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // A slow job delays the next tick instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let alive = self.alive.clone();
        self.push(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if !alive.load(Ordering::SeqCst) {
                    break;
                }
                job().await;
            }
        }));
    }

    /// Runs `job` once after `delay` unless the set is shut down first.
    pub fn after<Fut>(&self, delay: Duration, job: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let alive = self.alive.clone();
        self.push(tokio::spawn(async move {
            sleep(delay).await;
            if alive.load(Ordering::SeqCst) {
                job.await;
            }
        }));
    }

    /// Runs `job` until it finishes or the set is shut down.
    pub fn spawn<Fut>(&self, job: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push(tokio::spawn(job));
    }

    fn push(&self, handle: JoinHandle<()>) {
        if !self.is_alive() {
            handle.abort();
            return;
        }
        if let Ok(mut handles) = self.handles.lock() {
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }
    }

    /// Number of tasks still scheduled or running.
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .map(|h| h.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    pub fn shutdown(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut handles) = self.handles.lock() {
            for h in handles.drain(..) {
                h.abort();
            }
        }
        debug(Domain::System, "tasks.shutdown", obj(&[("set", v_str(self.name))]));
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Ok(mut handles) = self.handles.lock() {
            for h in handles.drain(..) {
                h.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test(start_paused = true)]
    async fn test_every_waits_one_period() {
        let tasks = TaskSet::new("test");
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        tasks.every(Duration::from_millis(100), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(260)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_now_runs_immediately() {
        let tasks = TaskSet::new("test");
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        tasks.every_now(Duration::from_secs(60), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_delayed_job() {
        let tasks = TaskSet::new("test");
        let fired = Arc::new(AtomicBool::new(false));
        let f = fired.clone();
        tasks.after(Duration::from_millis(500), async move {
            f.store(true, Ordering::SeqCst);
        });
        assert_eq!(tasks.pending(), 1);

        sleep(Duration::from_millis(100)).await;
        tasks.shutdown();
        sleep(Duration::from_secs(1)).await;

        assert!(!fired.load(Ordering::SeqCst));
        assert!(!tasks.is_alive());
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_after_shutdown_is_dropped() {
        let tasks = TaskSet::new("test");
        tasks.shutdown();
        let fired = Arc::new(AtomicBool::new(false));
        let f = fired.clone();
        tasks.after(Duration::from_millis(1), async move {
            f.store(true, Ordering::SeqCst);
        });
        sleep(Duration::from_millis(10)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
