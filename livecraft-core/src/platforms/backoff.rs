use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Exponential reconnect delays for the socket clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl ReconnectPolicy {
    pub fn backoff(&self) -> Backoff {
        Backoff { policy: *self, current: None }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    current: Option<Duration>,
}

impl Backoff {
    /// The delay before the next attempt: `initial`, then multiplied by
    /// `factor` each call, capped at `max`.
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.policy.initial,
            Some(d) => d.saturating_mul(self.policy.factor.max(1)),
        }
        .min(self.policy.max);
        self.current = Some(next);
        next
    }

    /// Call after a successful connection.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_the_cap_and_resets() {
        let mut b = ReconnectPolicy::default().backoff();
        let secs: Vec<u64> = (0..7).map(|_| b.next_delay().as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 30, 30]);
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn initial_above_max_is_capped() {
        let policy = ReconnectPolicy {
            initial: Duration::from_secs(60),
            max: Duration::from_secs(5),
            factor: 3,
        };
        assert_eq!(policy.backoff().next_delay(), Duration::from_secs(5));
    }
}
