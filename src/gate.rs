//! Suspend gate serializing bus configuration against the poll loop
//!
//! `configure` is not safe to interleave with `refresh_all` on the same
//! transport: a mode write observed mid-refresh can corrupt the next
//! reading or the write itself. All configuration therefore runs inside
//! one critical section at a time with polling paused. Release is tied to
//! token drop, so an error path inside the critical section cannot leave
//! the gate stuck.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct GateInner {
    /// A foreground critical section is active
    suspended: bool,
    /// A refresh is in flight on the poll thread
    polling: bool,
}

pub(crate) struct SuspendGate {
    inner: Mutex<GateInner>,
    cond: Condvar,
}

/// Exclusive critical-section token. Polling stays paused until drop.
pub(crate) struct GateToken<'a> {
    gate: &'a SuspendGate,
}

/// Marks a refresh in flight; `acquire` waits for it to clear
pub(crate) struct PollPermit<'a> {
    gate: &'a SuspendGate,
}

impl SuspendGate {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner::default()),
            cond: Condvar::new(),
        }
    }

    /// Block until no critical section or in-flight refresh remains, then
    /// suspend polling
    pub(crate) fn acquire(&self) -> GateToken<'_> {
        let mut inner = self.inner.lock();
        while inner.suspended || inner.polling {
            self.cond.wait(&mut inner);
        }
        inner.suspended = true;
        GateToken { gate: self }
    }

    /// Cancellable acquire. A timed-out waiter never counts as having
    /// acquired and leaves the gate state untouched.
    pub(crate) fn acquire_timeout(&self, timeout: Duration) -> Result<GateToken<'_>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.suspended || inner.polling {
            if self.cond.wait_until(&mut inner, deadline).timed_out() {
                return Err(Error::Timeout);
            }
        }
        inner.suspended = true;
        Ok(GateToken { gate: self })
    }

    /// Permit for one refresh pass, unless a critical section holds the
    /// gate. The poll loop skips its cycle on `None`.
    pub(crate) fn begin_poll(&self) -> Option<PollPermit<'_>> {
        let mut inner = self.inner.lock();
        if inner.suspended {
            return None;
        }
        inner.polling = true;
        Some(PollPermit { gate: self })
    }

    #[cfg(test)]
    pub(crate) fn is_suspended(&self) -> bool {
        self.inner.lock().suspended
    }
}

impl Drop for GateToken<'_> {
    fn drop(&mut self) {
        let mut inner = self.gate.inner.lock();
        inner.suspended = false;
        drop(inner);
        self.gate.cond.notify_all();
    }
}

impl Drop for PollPermit<'_> {
    fn drop(&mut self) {
        let mut inner = self.gate.inner.lock();
        inner.polling = false;
        drop(inner);
        self.gate.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_single_critical_section_across_threads() {
        let gate = Arc::new(SuspendGate::new());
        let active = Arc::new(AtomicUsize::new(0));
        let violation = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = Arc::clone(&gate);
            let active = Arc::clone(&active);
            let violation = Arc::clone(&violation);
            handles.push(thread::spawn(move || {
                for _ in 0..5 {
                    let _token = gate.acquire();
                    if active.fetch_add(1, Ordering::SeqCst) != 0 {
                        violation.store(true, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_millis(2));
                    active.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(!violation.load(Ordering::SeqCst));
        assert!(!gate.is_suspended());
    }

    #[test]
    fn test_timed_out_acquire_leaves_gate_usable() {
        let gate = Arc::new(SuspendGate::new());

        let holder = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _token = gate.acquire();
                thread::sleep(Duration::from_millis(100));
            })
        };
        // Let the holder win the gate first
        thread::sleep(Duration::from_millis(20));

        assert!(matches!(
            gate.acquire_timeout(Duration::from_millis(10)),
            Err(Error::Timeout)
        ));

        holder.join().unwrap();
        assert!(!gate.is_suspended());
        assert!(gate.acquire_timeout(Duration::from_millis(100)).is_ok());
    }

    #[test]
    fn test_acquire_waits_for_in_flight_refresh() {
        let gate = Arc::new(SuspendGate::new());
        let (tx, rx) = crossbeam_channel::bounded(1);

        let permit = gate.begin_poll().unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _token = gate.acquire();
                tx.send(()).unwrap();
            })
        };

        // The acquire must not complete while the refresh is in flight
        assert!(rx.recv_timeout(Duration::from_millis(30)).is_err());
        drop(permit);
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
        waiter.join().unwrap();
    }

    #[test]
    fn test_poll_denied_while_suspended() {
        let gate = SuspendGate::new();
        let token = gate.acquire();
        assert!(gate.begin_poll().is_none());
        drop(token);
        assert!(gate.begin_poll().is_some());
    }
}
