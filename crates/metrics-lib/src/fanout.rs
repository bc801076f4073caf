//! Concurrent fan-out with a completion barrier
//!
//! Every logical operation launches its independent queries as tokio tasks
//! tagged with a role. [`FanOut::join`] waits for all of them, even when one
//! fails early, and results are looked up by role so the assembled record
//! does not depend on completion order.
//!
//! Partial sums from concurrent children go through an [`Accumulator`]: each
//! task computes its local value and folds it into the shared total once,
//! under the lock, after its own queries finished.

use crate::error::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

/// Logical role of a task inside one fan-out
pub type Role = &'static str;

/// A set of launched tasks awaiting the barrier
pub struct FanOut<T> {
    handles: Vec<(Role, JoinHandle<T>)>,
}

impl<T: Send + 'static> FanOut<T> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Launch `task` immediately under `role`
    pub fn spawn<F>(&mut self, role: Role, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.handles.push((role, tokio::spawn(task)));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every task. A panicked task does not stop the others from
    /// being awaited; it is reported once all have finished.
    pub async fn join(self) -> Result<Joined<T>> {
        let mut results = Vec::with_capacity(self.handles.len());
        let mut aborted = None;

        for (role, handle) in self.handles {
            match handle.await {
                Ok(value) => results.push((role, value)),
                Err(e) => {
                    warn!(role, error = %e, "Fan-out task aborted");
                    aborted.get_or_insert(MetricsError::TaskAborted {
                        role: role.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        match aborted {
            Some(err) => Err(err),
            None => Ok(Joined { results }),
        }
    }
}

impl<T: Send + 'static> Default for FanOut<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Results of a joined fan-out, addressable by role
#[derive(Debug)]
pub struct Joined<T> {
    results: Vec<(Role, T)>,
}

impl<T> Joined<T> {
    /// Remove and return the result of `role`
    pub fn take(&mut self, role: Role) -> Option<T> {
        let idx = self.results.iter().position(|(r, _)| *r == role)?;
        Some(self.results.remove(idx).1)
    }

    pub fn get(&self, role: Role) -> Option<&T> {
        self.results.iter().find(|(r, _)| *r == role).map(|(_, v)| v)
    }

    /// Results in launch order
    pub fn into_ordered(self) -> Vec<T> {
        self.results.into_iter().map(|(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Launch every `(role, task)` pair and wait for all of them
pub async fn run_all<T, F, I>(tasks: I) -> Result<Joined<T>>
where
    I: IntoIterator<Item = (Role, F)>,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut fan_out = FanOut::new();
    for (role, task) in tasks {
        fan_out.spawn(role, task);
    }
    fan_out.join().await
}

/// Per-entity usage sums folded across child tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub cpu_use: f64,
    pub cpu_usage: f64,
    pub memory_use: f64,
    pub memory_usage: f64,
    pub disk_use: f64,
}

impl AddAssign for UsageTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.cpu_use += rhs.cpu_use;
        self.cpu_usage += rhs.cpu_usage;
        self.memory_use += rhs.memory_use;
        self.memory_usage += rhs.memory_usage;
        self.disk_use += rhs.disk_use;
    }
}

/// Mutex-protected running total shared by concurrent tasks
#[derive(Debug, Clone, Default)]
pub struct Accumulator<T> {
    total: Arc<Mutex<T>>,
}

impl<T: AddAssign + Copy + Default> Accumulator<T> {
    pub fn new() -> Self {
        Self {
            total: Arc::new(Mutex::new(T::default())),
        }
    }

    /// Fold one task-local partial into the total
    pub async fn add(&self, partial: T) {
        let mut total = self.total.lock().await;
        *total += partial;
    }

    pub async fn total(&self) -> T {
        *self.total.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keyed_by_role_not_completion() {
        let mut fan_out = FanOut::new();
        fan_out.spawn("slow", async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            1
        });
        fan_out.spawn("fast", async { 2 });

        let mut joined = fan_out.join().await.unwrap();
        assert_eq!(joined.take("slow"), Some(1));
        assert_eq!(joined.take("fast"), Some(2));
        assert_eq!(joined.take("fast"), None);
    }

    #[tokio::test]
    async fn test_join_waits_for_every_task() {
        let finished = Arc::new(AtomicUsize::new(0));
        let tasks = (0..10u64).map(|i| {
            let finished = finished.clone();
            ("task", async move {
                tokio::time::sleep(Duration::from_millis(5 * (10 - i))).await;
                finished.fetch_add(1, Ordering::SeqCst);
                i
            })
        });

        let joined = run_all(tasks).await.unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 10);
        assert_eq!(joined.into_ordered(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failed_task_does_not_short_circuit() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut fan_out: FanOut<Result<u32>> = FanOut::new();

        fan_out.spawn("fails", async {
            Err(MetricsError::query_failed("http://prom", "refused"))
        });
        let f = finished.clone();
        fan_out.spawn("slow", async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            f.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });

        let mut joined = fan_out.join().await.unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(joined.take("fails").unwrap().is_err());
        assert_eq!(joined.take("slow").unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_panicking_task_reports_task_aborted() {
        let finished = Arc::new(AtomicUsize::new(0));
        let mut fan_out: FanOut<()> = FanOut::new();

        fan_out.spawn("boom", async {
            panic!("worker exploded");
        });
        let f = finished.clone();
        fan_out.spawn("ok", async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.fetch_add(1, Ordering::SeqCst);
        });

        let err = fan_out.join().await.unwrap_err();
        assert!(matches!(err, MetricsError::TaskAborted { ref role, .. } if role == "boom"));
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_accumulator_never_loses_updates() {
        let acc: Accumulator<UsageTotals> = Accumulator::new();
        let mut fan_out = FanOut::new();

        for i in 1..=50u32 {
            let acc = acc.clone();
            fan_out.spawn("child", async move {
                tokio::task::yield_now().await;
                let partial = UsageTotals {
                    cpu_use: f64::from(i),
                    cpu_usage: 1.0,
                    memory_use: 2.0 * f64::from(i),
                    memory_usage: 0.0,
                    disk_use: 1024.0,
                };
                acc.add(partial).await;
            });
        }
        fan_out.join().await.unwrap();

        let total = acc.total().await;
        assert_eq!(total.cpu_use, 1275.0);
        assert_eq!(total.cpu_usage, 50.0);
        assert_eq!(total.memory_use, 2550.0);
        assert_eq!(total.disk_use, 51200.0);
    }

    #[tokio::test]
    async fn test_empty_fan_out() {
        let fan_out: FanOut<u8> = FanOut::new();
        assert!(fan_out.is_empty());
        let joined = fan_out.join().await.unwrap();
        assert!(joined.is_empty());
    }
}
