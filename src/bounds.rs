use crate::color::Pixel;

/// Bounds of the rendering area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderingBounds {
    pub start: u16,
    pub end: u16,
}

impl RenderingBounds {
    /// Whole strip
    pub const fn full(strip_len: u16) -> Self {
        Self {
            start: 0,
            end: strip_len,
        }
    }

    /// `[start_offset, strip_len - end_offset)`, empty when the offsets overlap
    pub const fn window(strip_len: u16, start_offset: u16, end_offset: u16) -> Self {
        let end = strip_len.saturating_sub(end_offset);
        let start = if start_offset < end { start_offset } else { end };
        Self { start, end }
    }

    /// Get the number of LEDs in the rendering area
    pub const fn count(self) -> u16 {
        self.end.saturating_sub(self.start)
    }
}

/// Get a slice of the LEDs within the bounds, clipped to the buffer
pub(crate) fn bounded(leds: &mut [Pixel], bounds: RenderingBounds) -> &mut [Pixel] {
    let end = usize::from(bounds.end).min(leds.len());
    let start = usize::from(bounds.start).min(end);
    &mut leds[start..end]
}
