use std::{pin::Pin, task::Context, time::Duration};

use tokio::time::{Instant, Sleep, sleep};

/// Pings sent without a pong before the connection is considered dead
const MAX_PENDING_PINGS: u8 = 2;

#[derive(Debug)]
pub(super) struct KeepAlive {
    interval: Duration,
    timer: Pin<Box<Sleep>>,
    pending_pings: u8,
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum KeepAliveOutcome {
    Alive,
    Dead,
}

impl KeepAlive {
    pub(super) fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: Box::pin(sleep(interval)),
            pending_pings: 0,
        }
    }

    /// Push the next ping back, something was received from the peer
    pub(super) fn reset(&mut self) {
        self.timer.as_mut().reset(Instant::now() + self.interval);
    }

    pub(super) fn handle_pong(&mut self) {
        self.pending_pings = self.pending_pings.saturating_sub(1);
    }

    pub(super) fn poll(
        &mut self,
        cx: &mut Context<'_>,
        send_ping: impl FnOnce(),
    ) -> KeepAliveOutcome {
        if self.timer.as_mut().poll(cx).is_pending() {
            KeepAliveOutcome::Alive
        } else {
            self.ping(cx, send_ping)
        }
    }

    #[cold]
    fn ping(&mut self, cx: &mut Context<'_>, send_ping: impl FnOnce()) -> KeepAliveOutcome {
        if self.pending_pings >= MAX_PENDING_PINGS {
            return KeepAliveOutcome::Dead;
        }

        send_ping();
        self.pending_pings += 1;

        // register the waker for the next ping
        loop {
            self.reset();
            if self.timer.as_mut().poll(cx).is_pending() {
                break;
            }
        }

        KeepAliveOutcome::Alive
    }
}

#[cfg(test)]
mod tests {
    use std::{future, task::Poll, time::Duration};

    use super::{KeepAlive, KeepAliveOutcome};

    const INTERVAL: Duration = Duration::from_secs(10);

    async fn poll(keepalive: &mut KeepAlive, pings: &mut usize) -> KeepAliveOutcome {
        future::poll_fn(|cx| Poll::Ready(keepalive.poll(cx, || *pings += 1))).await
    }

    #[tokio::test(start_paused = true)]
    async fn dead_after_two_unanswered_pings() {
        let mut keepalive = KeepAlive::new(INTERVAL);
        let mut pings = 0;

        assert_eq!(poll(&mut keepalive, &mut pings).await, KeepAliveOutcome::Alive);
        assert_eq!(pings, 0);

        tokio::time::advance(INTERVAL).await;
        assert_eq!(poll(&mut keepalive, &mut pings).await, KeepAliveOutcome::Alive);
        assert_eq!(pings, 1);

        tokio::time::advance(INTERVAL).await;
        assert_eq!(poll(&mut keepalive, &mut pings).await, KeepAliveOutcome::Alive);
        assert_eq!(pings, 2);

        tokio::time::advance(INTERVAL).await;
        assert_eq!(poll(&mut keepalive, &mut pings).await, KeepAliveOutcome::Dead);
        assert_eq!(pings, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pongs_keep_it_alive() {
        let mut keepalive = KeepAlive::new(INTERVAL);
        let mut pings = 0;

        for _ in 0..5 {
            tokio::time::advance(INTERVAL).await;
            assert_eq!(poll(&mut keepalive, &mut pings).await, KeepAliveOutcome::Alive);
            keepalive.handle_pong();
        }
        assert_eq!(pings, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn traffic_postpones_pings() {
        let mut keepalive = KeepAlive::new(INTERVAL);
        let mut pings = 0;

        for _ in 0..5 {
            tokio::time::advance(INTERVAL / 2).await;
            keepalive.reset();
            assert_eq!(poll(&mut keepalive, &mut pings).await, KeepAliveOutcome::Alive);
        }
        assert_eq!(pings, 0);
    }
}
