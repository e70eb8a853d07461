//! Inter-tick delay policy for the driver loop (spec §4.6).
//!
//! `Fixed` sleeps the same amount between every tick. `Auto` starts by
//! ticking back-to-back while the tree keeps transitioning, then backs off
//! geometrically once it settles into a steady run of RUNNING statuses, so a
//! busy-looping tree doesn't spin the driver at 100% CPU waiting on an I/O
//! bound action.

const FAST_TICKS: u32 = 5;
const MAX_DELAY_MS: u64 = 16;

#[derive(Debug, Clone, Copy)]
pub enum TickDelayStrategy {
    Fixed(u64),
    Auto,
}

/// Tracks the auto-backoff state machine across calls to `tick_while_running`.
#[derive(Debug, Clone)]
pub struct TickDelay {
    strategy: TickDelayStrategy,
    consecutive_running: u32,
    current_delay_ms: u64,
}

impl TickDelay {
    pub fn new(strategy: TickDelayStrategy) -> Self {
        TickDelay {
            strategy,
            consecutive_running: 0,
            current_delay_ms: 1,
        }
    }

    /// Records the outcome of the tick just completed and returns how long
    /// to sleep before the next one. A non-RUNNING status (the tree just
    /// transitioned) always resets the backoff to the fastest cadence.
    pub fn next_delay_ms(&mut self, still_running: bool) -> u64 {
        match self.strategy {
            TickDelayStrategy::Fixed(ms) => ms,
            TickDelayStrategy::Auto => {
                if !still_running {
                    self.consecutive_running = 0;
                    self.current_delay_ms = 1;
                    return 0;
                }
                self.consecutive_running += 1;
                if self.consecutive_running <= FAST_TICKS {
                    return 0;
                }
                let delay = self.current_delay_ms;
                self.current_delay_ms = (self.current_delay_ms * 2).min(MAX_DELAY_MS);
                delay
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_strategy_always_returns_configured_delay() {
        let mut d = TickDelay::new(TickDelayStrategy::Fixed(7));
        assert_eq!(d.next_delay_ms(true), 7);
        assert_eq!(d.next_delay_ms(false), 7);
        assert_eq!(d.next_delay_ms(true), 7);
    }

    #[test]
    fn auto_strategy_ticks_fast_before_backing_off() {
        let mut d = TickDelay::new(TickDelayStrategy::Auto);
        for _ in 0..FAST_TICKS {
            assert_eq!(d.next_delay_ms(true), 0);
        }
        assert_eq!(d.next_delay_ms(true), 1);
        assert_eq!(d.next_delay_ms(true), 2);
        assert_eq!(d.next_delay_ms(true), 4);
    }

    #[test]
    fn auto_strategy_caps_delay_at_max() {
        let mut d = TickDelay::new(TickDelayStrategy::Auto);
        for _ in 0..(FAST_TICKS + 10) {
            let _ = d.next_delay_ms(true);
        }
        assert!(d.next_delay_ms(true) <= MAX_DELAY_MS);
    }

    #[test]
    fn terminal_status_resets_backoff() {
        let mut d = TickDelay::new(TickDelayStrategy::Auto);
        for _ in 0..(FAST_TICKS + 3) {
            let _ = d.next_delay_ms(true);
        }
        assert_eq!(d.next_delay_ms(false), 0);
        for _ in 0..FAST_TICKS {
            assert_eq!(d.next_delay_ms(true), 0);
        }
    }
}
