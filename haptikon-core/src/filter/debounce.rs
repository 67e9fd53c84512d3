//! Debounce filter implementation
//!
//! Contact make and break on a resistive panel chatters for a few
//! milliseconds. The filter suppresses any claimed transition that lands
//! too soon after the opposite accepted transition, so one physical touch
//! never turns into several press/release pairs.

/// Press/release debounce filter
///
/// Tracks the timestamps of the last *accepted* press and release. A
/// claimed press within the window after the last accepted release is
/// reverted to "not pressed"; a claimed release within the window after
/// the last accepted press is reverted to "still pressed". Rejected
/// transitions never update the edge timestamps.
#[derive(Debug, Clone)]
pub struct DebounceFilter {
    window_ms: u32,
    last_press_ms: Option<u32>,
    last_release_ms: Option<u32>,
}

impl DebounceFilter {
    /// Create a filter with the given minimum transition spacing
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            last_press_ms: None,
            last_release_ms: None,
        }
    }

    /// Reclassify a claimed contact state against the debounce window
    ///
    /// `was_pressed` is the accepted state of the previous tick and
    /// `claimed` the averager's verdict for this tick. Returns the
    /// accepted state for this tick.
    pub fn apply(&mut self, was_pressed: bool, claimed: bool, now_ms: u32) -> bool {
        match (was_pressed, claimed) {
            // Claimed press: chatter if the panel was released moments ago
            (false, true) => {
                if let Some(release_ms) = self.last_release_ms {
                    if now_ms.wrapping_sub(release_ms) < self.window_ms {
                        return false;
                    }
                }
                self.last_press_ms = Some(now_ms);
                true
            }
            // Claimed release: chatter if contact was made moments ago
            (true, false) => {
                if let Some(press_ms) = self.last_press_ms {
                    if now_ms.wrapping_sub(press_ms) < self.window_ms {
                        return true;
                    }
                }
                self.last_release_ms = Some(now_ms);
                false
            }
            // No transition claimed
            _ => claimed,
        }
    }

    /// Forget the accepted-edge history
    ///
    /// Used when the steady-state stream is interrupted (calibration
    /// rounds) so stale edges cannot veto the next genuine transition.
    pub fn reset(&mut self) {
        self.last_press_ms = None;
        self.last_release_ms = None;
    }
}
