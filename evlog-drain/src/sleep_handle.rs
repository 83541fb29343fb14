use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Sleep;

/// An optional timer that can be armed and disarmed.
///
/// Awaiting an idle handle never completes, which makes it usable as a branch in `select!`.
#[derive(Debug)]
pub struct SleepHandle(Option<Pin<Box<Sleep>>>);

impl SleepHandle {
    /// Creates a disarmed handle.
    pub fn idle() -> Self {
        Self(None)
    }

    /// Arms the timer to fire after `duration`, replacing a running timer.
    pub fn set(&mut self, duration: Duration) {
        self.0 = Some(Box::pin(tokio::time::sleep(duration)));
    }

    /// Disarms the timer.
    pub fn reset(&mut self) {
        self.0 = None;
    }

    /// Returns `true` if the timer is disarmed.
    pub fn is_idle(&self) -> bool {
        self.0.is_none()
    }
}

impl Future for SleepHandle {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().0 {
            Some(ref mut sleep) => sleep.as_mut().poll(cx),
            None => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_never_fires() {
        let mut handle = SleepHandle::idle();
        assert!(handle.is_idle());

        let fired = tokio::time::timeout(Duration::from_secs(60), &mut handle).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_and_reset() {
        let mut handle = SleepHandle::idle();
        handle.set(Duration::from_millis(100));
        assert!(!handle.is_idle());

        let start = Instant::now();
        (&mut handle).await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));

        handle.reset();
        assert!(handle.is_idle());
    }
}
