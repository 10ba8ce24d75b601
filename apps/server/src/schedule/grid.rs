//! Canonical slot grid and coarse-range splitting.
//!
//! Both walk the same way: step from the start in fixed increments and emit a
//! slot while its start is still inside the span. The grid lets a slot's end
//! run past the window; range splitting clips the final slot to the range end.

use crate::error::SchedulingError;

use super::time::{ServiceClock, Slot, TimeOfDay, MINUTES_PER_DAY};

pub const DEFAULT_SLOT_MINUTES: u16 = 90;

/// Validated grid configuration for one field's service day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    window_start: TimeOfDay,
    window_end: TimeOfDay,
    slot_minutes: u16,
}

impl SlotGrid {
    pub fn new(
        window_start: TimeOfDay,
        window_end: TimeOfDay,
        slot_minutes: u16,
    ) -> Result<Self, SchedulingError> {
        if window_start == window_end || slot_minutes == 0 || slot_minutes > MINUTES_PER_DAY {
            return Err(SchedulingError::InvalidWindow {
                start: window_start,
                end: window_end,
                slot_minutes,
            });
        }
        Ok(Self {
            window_start,
            window_end,
            slot_minutes,
        })
    }

    pub fn window_start(&self) -> TimeOfDay {
        self.window_start
    }

    pub fn window_end(&self) -> TimeOfDay {
        self.window_end
    }

    pub fn slot_minutes(&self) -> u16 {
        self.slot_minutes
    }

    /// Service clock for this grid. When the last slot runs past midnight
    /// and past the window end, the rollover moves to that slot's end so the
    /// slot stays a valid range.
    pub fn clock(&self) -> ServiceClock {
        let window = ServiceClock::for_window(self.window_start, self.window_end);
        let span = window.span(self.window_start, self.window_end);
        let step = self.slot_minutes as u32;
        let last_end = span.start + span.duration_minutes().div_ceil(step) * step;
        let day = MINUTES_PER_DAY as u32;
        if last_end > day && last_end <= day + self.window_start.minutes() as u32 {
            ServiceClock::new(TimeOfDay::wrapping(last_end))
        } else {
            window
        }
    }

    /// Ordered slots covering the window. Same input, same output.
    pub fn generate(&self) -> Vec<Slot> {
        let span = self.clock().span(self.window_start, self.window_end);
        walk(span.start, span.end, self.slot_minutes as u32, false)
    }
}

/// 15:30 → 05:00 next day, 90-minute slots.
impl Default for SlotGrid {
    fn default() -> Self {
        Self {
            window_start: TimeOfDay::hm(15, 30).unwrap_or(TimeOfDay::MIDNIGHT),
            window_end: TimeOfDay::hm(5, 0).unwrap_or(TimeOfDay::MIDNIGHT),
            slot_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

/// Splits `[range.start, range.end)` into `slot_minutes` pieces. Both bounds
/// are placed on `clock`, so a range crosses midnight only when its end falls
/// at or before the rollover. The last piece may be shorter and always ends
/// at `range.end`.
pub fn split_range(
    range: Slot,
    slot_minutes: u16,
    clock: ServiceClock,
) -> Result<Vec<Slot>, SchedulingError> {
    if slot_minutes == 0 {
        return Err(SchedulingError::validation("slot length must be positive"));
    }
    let span = clock.checked_span(range.start, range.end).ok_or_else(|| {
        SchedulingError::validation(format!(
            "time range {}-{} does not end after it starts",
            range.start, range.end
        ))
    })?;
    Ok(walk(span.start, span.end, slot_minutes as u32, true))
}

fn walk(from: u32, until: u32, step: u32, clip: bool) -> Vec<Slot> {
    let mut slots = Vec::new();
    let mut at = from;
    while at < until {
        let end = if clip { (at + step).min(until) } else { at + step };
        slots.push(Slot {
            start: TimeOfDay::wrapping(at),
            end: TimeOfDay::wrapping(end),
        });
        at += step;
    }
    slots
}
