//! Humanized pacing between browser actions.
//!
//! Bank frontends run bot-detection heuristics; instantaneous navigation and
//! zero-latency clicks are an easy tell. Every navigation and action sleeps
//! for a randomized duration drawn from the configured profile.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

/// Available pacing profiles, slowest to fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayProfile {
    Fast,
    Medium,
    Slow,
}

/// Concrete timings for one profile, in seconds.
#[derive(Debug, Clone, Copy)]
struct DelayValues {
    navigate_range: (f64, f64),
    wait_timeout: f64,
    action_range: (f64, f64),
}

impl DelayProfile {
    fn values(&self) -> DelayValues {
        match self {
            DelayProfile::Fast => DelayValues {
                navigate_range: (2.0, 3.0),
                wait_timeout: 4.0,
                action_range: (0.5, 1.5),
            },
            DelayProfile::Medium => DelayValues {
                navigate_range: (4.0, 5.0),
                wait_timeout: 8.0,
                action_range: (2.0, 3.0),
            },
            DelayProfile::Slow => DelayValues {
                navigate_range: (6.0, 7.0),
                wait_timeout: 12.0,
                action_range: (3.0, 5.0),
            },
        }
    }
}

/// Delay source for a browser session.
#[derive(Debug, Clone, Copy)]
pub struct Delays {
    profile: DelayProfile,
}

impl Delays {
    pub fn new(profile: DelayProfile) -> Self {
        Self { profile }
    }

    /// Randomized pause after a page navigation.
    pub fn navigate_delay(&self) -> Duration {
        Self::jittered(self.profile.values().navigate_range)
    }

    /// Upper bound for waiting on a selector to appear.
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.profile.values().wait_timeout)
    }

    /// Randomized pause after a click or keystroke burst.
    pub fn action_delay(&self) -> Duration {
        Self::jittered(self.profile.values().action_range)
    }

    fn jittered((lo, hi): (f64, f64)) -> Duration {
        let secs = rand::thread_rng().gen_range(lo..=hi);
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_timeout_is_fixed() {
        assert_eq!(
            Delays::new(DelayProfile::Fast).wait_timeout(),
            Duration::from_secs(4)
        );
        assert_eq!(
            Delays::new(DelayProfile::Slow).wait_timeout(),
            Duration::from_secs(12)
        );
    }

    #[test]
    fn test_delays_stay_within_profile_bounds() {
        let delays = Delays::new(DelayProfile::Medium);
        for _ in 0..50 {
            let nav = delays.navigate_delay().as_secs_f64();
            assert!((4.0..=5.0).contains(&nav), "navigate delay {nav} out of range");

            let action = delays.action_delay().as_secs_f64();
            assert!((2.0..=3.0).contains(&action), "action delay {action} out of range");
        }
    }

    #[test]
    fn test_profile_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            profile: DelayProfile,
        }
        let w: Wrapper = toml::from_str("profile = \"medium\"").unwrap();
        assert_eq!(w.profile, DelayProfile::Medium);
    }
}
