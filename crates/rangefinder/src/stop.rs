//! Cancellation for file-driven runs.
//!
//! A run ends early when Ctrl-C is pressed or the frame limit is hit.
//! The interrupt only raises a flag; the loop notices it during the
//! bounded wait after the current frame and stops cleanly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rangefinder_pipeline::StopSignal;

/// How often the interrupt flag is checked while waiting between frames.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Raise `flag` when Ctrl-C is received.
///
/// The handler runs on a background thread with its own single-threaded
/// Tokio runtime, so the frame loop stays synchronous.
///
/// # Errors
///
/// Fails if the runtime or its thread cannot be created.
pub fn install_interrupt_handler(flag: Arc<AtomicBool>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name(String::from("ctrl-c"))
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("interrupt received, stopping after this frame");
                        flag.store(true, Ordering::SeqCst);
                    }
                    Err(error) => tracing::warn!(%error, "cannot listen for Ctrl-C"),
                }
            });
        })?;
    Ok(())
}

/// Stops on interrupt or after a fixed number of ticks, sleeping `wait`
/// between them.
///
/// With no limit and no interrupt it only paces the loop; the run then
/// ends when the frame source is exhausted.
#[derive(Debug, Clone)]
pub struct StopControl {
    remaining: Option<u64>,
    interrupted: Arc<AtomicBool>,
}

impl StopControl {
    /// Stop after `limit` ticks (never when `None`) or once `interrupted`
    /// is raised.
    #[must_use]
    pub const fn new(limit: Option<u64>, interrupted: Arc<AtomicBool>) -> Self {
        Self {
            remaining: limit,
            interrupted,
        }
    }

    /// Whether the interrupt flag has been raised.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Sleep for up to `wait`, returning early with `true` on interrupt.
    fn wait_for_interrupt(&self, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        loop {
            if self.was_interrupted() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

impl StopSignal for StopControl {
    fn should_stop(&mut self, wait: Duration) -> bool {
        if let Some(remaining) = &mut self.remaining {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                return true;
            }
        }
        self.wait_for_interrupt(wait)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn stops_after_limit() {
        let mut stop = StopControl::new(Some(3), flag());
        let polls: Vec<bool> = (0..3).map(|_| stop.should_stop(Duration::ZERO)).collect();
        assert_eq!(polls, vec![false, false, true]);
        assert!(!stop.was_interrupted());
    }

    #[test]
    fn unlimited_never_stops() {
        let mut stop = StopControl::new(None, flag());
        assert!((0..100).all(|_| !stop.should_stop(Duration::ZERO)));
    }

    #[test]
    fn raised_flag_stops_immediately() {
        let interrupted = flag();
        let mut stop = StopControl::new(None, Arc::clone(&interrupted));
        assert!(!stop.should_stop(Duration::ZERO));
        interrupted.store(true, Ordering::SeqCst);
        assert!(stop.should_stop(Duration::ZERO));
        assert!(stop.was_interrupted());
    }

    #[test]
    fn interrupt_cuts_the_wait_short() {
        let interrupted = flag();
        let mut stop = StopControl::new(None, Arc::clone(&interrupted));
        let raiser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            interrupted.store(true, Ordering::SeqCst);
        });
        let started = Instant::now();
        assert!(stop.should_stop(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(10));
        raiser.join().unwrap();
    }
}
