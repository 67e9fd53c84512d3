//! Gesture classification state machine
//!
//! One interaction is live at a time: created at press, mutated while
//! held, finalized at release. All tap-sequence bookkeeping is explicit
//! instance state so multiple pipelines stay independent and tests stay
//! deterministic.

use super::types::{Gesture, GestureKind};
use crate::config::TouchConfig;
use crate::touch::TouchPoint;

/// Interaction phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    /// No interaction in progress
    Idle,
    /// Contact down, record being updated every tick
    Active,
    /// Released; record pending until the consumer clears it
    Finalized,
}

/// Gesture classifier
///
/// Consumes the debounced, calibrated touch stream one tick at a time and
/// keeps at most one pending gesture per interaction.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    double_tap_window_ms: u32,
    long_press_ms: u32,
    drag_threshold_px: u16,
    drag_min_duration_ms: u32,
    swipe_min_distance_px: u16,
    swipe_min_velocity_px_s: u32,

    phase: Phase,
    gesture: Gesture,
    dragging: bool,
    start_ms: u32,
    tap_count: u8,
    last_release_ms: Option<u32>,
}

impl GestureClassifier {
    /// Create a classifier from the pipeline configuration
    pub fn new(config: &TouchConfig) -> Self {
        Self {
            double_tap_window_ms: config.double_tap_window_ms,
            long_press_ms: config.long_press_ms,
            drag_threshold_px: config.drag_threshold_px,
            drag_min_duration_ms: config.drag_min_duration_ms,
            swipe_min_distance_px: config.swipe_min_distance_px,
            swipe_min_velocity_px_s: config.swipe_min_velocity_px_s,
            phase: Phase::Idle,
            gesture: Gesture::none(),
            dragging: false,
            start_ms: 0,
            tap_count: 0,
            last_release_ms: None,
        }
    }

    /// Advance the state machine with this tick's touch point
    pub fn update(&mut self, point: &TouchPoint) {
        if point.is_new_press() {
            self.on_press(point);
        } else if point.is_new_release() {
            self.on_release(point);
        } else if point.pressed && self.phase == Phase::Active {
            self.on_held(point);
        }
    }

    /// Whether a classified gesture is waiting to be consumed
    pub fn has_pending(&self) -> bool {
        self.gesture.kind != GestureKind::None
    }

    /// Copy of the live or finalized record
    pub fn peek(&self) -> Gesture {
        self.gesture
    }

    /// Consume the pending gesture
    ///
    /// Idempotent. Clearing while contact is still held keeps the
    /// interaction tracking, so a continuing drag announces its next
    /// DragMove on a later tick; clearing a finalized record returns the
    /// classifier to idle.
    pub fn clear(&mut self) {
        match self.phase {
            Phase::Finalized => {
                self.gesture = Gesture::none();
                self.phase = Phase::Idle;
            }
            Phase::Active => {
                self.gesture.kind = GestureKind::None;
            }
            Phase::Idle => {
                self.gesture = Gesture::none();
            }
        }
    }

    /// Drop all interaction state, including the tap sequence
    ///
    /// Used when the steady-state stream is interrupted (calibration
    /// rounds).
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.gesture = Gesture::none();
        self.dragging = false;
        self.tap_count = 0;
        self.last_release_ms = None;
    }

    fn on_press(&mut self, point: &TouchPoint) {
        let position = point.position();
        self.gesture = Gesture {
            kind: GestureKind::None,
            start: position,
            current: position,
            end: position,
            ..Gesture::none()
        };
        self.phase = Phase::Active;
        self.dragging = false;
        self.start_ms = point.timestamp_ms;

        // A press shortly after the previous release extends the tap
        // sequence; the second press is already a double tap.
        let quick_retap = self.last_release_ms.is_some_and(|release_ms| {
            point.timestamp_ms.wrapping_sub(release_ms) < self.double_tap_window_ms
        });
        if quick_retap {
            self.tap_count += 1;
            if self.tap_count >= 2 {
                self.gesture.kind = GestureKind::DoubleTap;
                self.tap_count = 0;
            }
        } else {
            self.tap_count = 1;
        }
    }

    fn on_held(&mut self, point: &TouchPoint) {
        let position = point.position();
        self.gesture.current = position;
        self.gesture.dx = position.x - self.gesture.start.x;
        self.gesture.dy = position.y - self.gesture.start.y;
        self.gesture.duration_ms = point.timestamp_ms.wrapping_sub(self.start_ms);

        let distance = distance_px(self.gesture.dx, self.gesture.dy);

        // Long-press is tested before any movement test so a slow,
        // stationary hold always wins over marginal motion.
        if !self.dragging
            && self.gesture.duration_ms > self.long_press_ms
            && distance < self.drag_threshold_px as u32
        {
            self.gesture.kind = GestureKind::LongPress;
        } else if distance > self.drag_threshold_px as u32
            && self.gesture.duration_ms > self.drag_min_duration_ms
        {
            self.gesture.kind = if self.dragging {
                GestureKind::DragMove
            } else {
                GestureKind::DragStart
            };
            self.dragging = true;
        }
    }

    fn on_release(&mut self, point: &TouchPoint) {
        if self.phase != Phase::Active {
            return;
        }

        let position = point.position();
        self.gesture.current = position;
        self.gesture.end = position;
        self.gesture.dx = position.x - self.gesture.start.x;
        self.gesture.dy = position.y - self.gesture.start.y;
        self.gesture.duration_ms = point.timestamp_ms.wrapping_sub(self.start_ms);

        let distance = distance_px(self.gesture.dx, self.gesture.dy);
        let velocity = distance * 1000 / self.gesture.duration_ms.max(1);
        self.gesture.velocity_px_s = velocity;

        if self.dragging {
            self.gesture.kind = GestureKind::DragEnd;
        } else if distance > self.swipe_min_distance_px as u32
            && velocity > self.swipe_min_velocity_px_s
        {
            self.gesture.kind = classify_swipe(self.gesture.dx, self.gesture.dy);
        } else if self.tap_count == 1 && self.gesture.kind == GestureKind::None {
            self.gesture.kind = GestureKind::Tap;
        }

        self.phase = Phase::Finalized;
        self.last_release_ms = Some(point.timestamp_ms);
    }
}

/// Pick the swipe direction from the dominant displacement axis
fn classify_swipe(dx: i16, dy: i16) -> GestureKind {
    if (dx as i32).abs() >= (dy as i32).abs() {
        if dx >= 0 {
            GestureKind::SwipeRight
        } else {
            GestureKind::SwipeLeft
        }
    } else if dy >= 0 {
        GestureKind::SwipeDown
    } else {
        GestureKind::SwipeUp
    }
}

/// Straight-line displacement length in pixels
fn distance_px(dx: i16, dy: i16) -> u32 {
    let dx = dx as i32;
    let dy = dy as i32;
    isqrt((dx * dx + dy * dy) as u32)
}

/// Integer square root (Newton's method)
fn isqrt(value: u32) -> u32 {
    if value < 2 {
        return value;
    }
    let mut x = value;
    let mut next = (x + value / x) / 2;
    while next < x {
        x = next;
        next = (x + value / x) / 2;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> GestureClassifier {
        GestureClassifier::new(&TouchConfig::default())
    }

    fn press(x: i16, y: i16, t: u32) -> TouchPoint {
        TouchPoint {
            x,
            y,
            pressed: true,
            was_pressed: false,
            timestamp_ms: t,
            ..TouchPoint::new()
        }
    }

    fn held(x: i16, y: i16, t: u32) -> TouchPoint {
        TouchPoint {
            x,
            y,
            pressed: true,
            was_pressed: true,
            timestamp_ms: t,
            ..TouchPoint::new()
        }
    }

    fn release(x: i16, y: i16, t: u32) -> TouchPoint {
        TouchPoint {
            x,
            y,
            pressed: false,
            was_pressed: true,
            timestamp_ms: t,
            ..TouchPoint::new()
        }
    }

    #[test]
    fn test_tap() {
        let mut gc = classifier();
        gc.update(&press(100, 100, 1000));
        gc.update(&held(101, 101, 1100));
        gc.update(&release(101, 101, 1150));

        let gesture = gc.peek();
        assert_eq!(gesture.kind, GestureKind::Tap);
        assert_eq!(gesture.duration_ms, 150);
        assert_eq!(gesture.end, crate::touch::Point::new(101, 101));
    }

    #[test]
    fn test_double_tap_on_second_press() {
        let mut gc = classifier();
        gc.update(&press(100, 100, 0));
        gc.update(&release(100, 100, 100));
        assert_eq!(gc.peek().kind, GestureKind::Tap);
        gc.clear();

        // Second press 200 ms after the release, inside the window; the
        // double tap is pending before the finger lifts.
        gc.update(&press(102, 100, 300));
        assert_eq!(gc.peek().kind, GestureKind::DoubleTap);

        gc.update(&release(102, 100, 380));
        assert_eq!(gc.peek().kind, GestureKind::DoubleTap);
    }

    #[test]
    fn test_tap_counter_resets_after_window() {
        let mut gc = classifier();
        gc.update(&press(100, 100, 0));
        gc.update(&release(100, 100, 100));
        gc.clear();

        // Next press well past the window starts a fresh sequence
        gc.update(&press(100, 100, 1000));
        gc.update(&release(100, 100, 1100));
        assert_eq!(gc.peek().kind, GestureKind::Tap);
    }

    #[test]
    fn test_double_tap_counter_resets_to_zero() {
        let mut gc = classifier();
        for cycle in 0..2u32 {
            let base = cycle * 200;
            gc.update(&press(100, 100, base));
            gc.update(&release(100, 100, base + 80));
            gc.clear();
        }

        // Third quick press: counter was zeroed by the double tap, so this
        // is tap number one again, not a second double tap.
        gc.update(&press(100, 100, 500));
        assert_eq!(gc.peek().kind, GestureKind::None);
        gc.update(&release(100, 100, 580));
        assert_eq!(gc.peek().kind, GestureKind::Tap);
    }

    #[test]
    fn test_long_press_fires_while_held() {
        let mut gc = classifier();
        gc.update(&press(100, 100, 0));

        let mut t = 0;
        while t < 900 {
            t += 10;
            gc.update(&held(100, 100, t));
        }

        // Still held, already classified
        assert!(gc.has_pending());
        let gesture = gc.peek();
        assert_eq!(gesture.kind, GestureKind::LongPress);
        assert!(gesture.duration_ms >= 900);

        gc.update(&release(100, 100, 950));
        assert_eq!(gc.peek().kind, GestureKind::LongPress);
    }

    #[test]
    fn test_slow_movement_becomes_drag() {
        let mut gc = classifier();
        gc.update(&press(100, 100, 0));
        gc.update(&held(104, 100, 200));
        assert_eq!(gc.peek().kind, GestureKind::None);

        gc.update(&held(120, 100, 350));
        assert_eq!(gc.peek().kind, GestureKind::DragStart);

        gc.update(&held(130, 100, 400));
        assert_eq!(gc.peek().kind, GestureKind::DragMove);

        gc.update(&release(160, 100, 500));
        let gesture = gc.peek();
        assert_eq!(gesture.kind, GestureKind::DragEnd);
        assert_eq!(gesture.dx, 60);
        assert_eq!(gesture.velocity_px_s, 120);
    }

    #[test]
    fn test_drag_survives_long_hold() {
        // Once dragging, a pause in place must not morph into LongPress
        let mut gc = classifier();
        gc.update(&press(100, 100, 0));
        gc.update(&held(130, 100, 350));
        assert_eq!(gc.peek().kind, GestureKind::DragStart);

        gc.update(&held(130, 100, 1300));
        assert_eq!(gc.peek().kind, GestureKind::DragMove);
    }

    #[test]
    fn test_swipe_right() {
        let mut gc = classifier();
        gc.update(&press(50, 120, 0));
        gc.update(&held(180, 119, 80));
        gc.update(&release(250, 118, 150));

        let gesture = gc.peek();
        assert_eq!(gesture.kind, GestureKind::SwipeRight);
        assert_eq!(gesture.dx, 200);
        // 200 px over 150 ms
        assert_eq!(gesture.velocity_px_s, 1333);
    }

    #[test]
    fn test_swipe_directions() {
        let cases = [
            ((200, 120), (60, 120), GestureKind::SwipeLeft),
            ((160, 200), (160, 40), GestureKind::SwipeUp),
            ((160, 40), (160, 200), GestureKind::SwipeDown),
        ];

        for ((sx, sy), (ex, ey), expected) in cases {
            let mut gc = classifier();
            gc.update(&press(sx, sy, 0));
            gc.update(&release(ex, ey, 120));
            assert_eq!(gc.peek().kind, expected);
        }
    }

    #[test]
    fn test_slow_far_release_is_not_a_swipe() {
        // Distance qualifies but velocity does not
        let mut gc = classifier();
        gc.update(&press(50, 120, 0));
        gc.update(&held(60, 120, 200));
        gc.update(&held(150, 120, 2500));
        gc.update(&release(150, 120, 2600));

        // Movement past the drag threshold with a long contact time is a
        // drag, never a swipe.
        assert_eq!(gc.peek().kind, GestureKind::DragEnd);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut gc = classifier();
        gc.update(&press(100, 100, 0));
        gc.update(&release(100, 100, 80));
        assert!(gc.has_pending());

        gc.clear();
        assert!(!gc.has_pending());
        assert_eq!(gc.peek().kind, GestureKind::None);

        gc.clear();
        assert_eq!(gc.peek().kind, GestureKind::None);
    }

    #[test]
    fn test_clear_during_drag_reannounces() {
        let mut gc = classifier();
        gc.update(&press(100, 100, 0));
        gc.update(&held(130, 100, 350));
        assert_eq!(gc.peek().kind, GestureKind::DragStart);

        gc.clear();
        assert!(!gc.has_pending());

        gc.update(&held(140, 100, 400));
        assert_eq!(gc.peek().kind, GestureKind::DragMove);
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(2), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(40_004), 200);
        assert_eq!(isqrt(u32::MAX), 65_535);
    }
}
