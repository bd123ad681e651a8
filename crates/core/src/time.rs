// Time unit conversion between the millisecond surface and native clocks
//
// Positions cross the public surface as integer milliseconds. Native
// primitives count either in seconds (f64) or in rational ticks of a
// timescale. Conversions always start from the integer form so repeated
// seeks never accumulate float error.

/// Rational native timestamp: `value / timescale` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTime {
    pub value: i64,
    pub timescale: i32,
}

/// Timescale used when converting a millisecond seek target
pub const MILLIS_TIMESCALE: i32 = 1000;

impl NativeTime {
    pub const ZERO: NativeTime = NativeTime {
        value: 0,
        timescale: MILLIS_TIMESCALE,
    };

    pub fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// A timestamp is addressable only with a positive timescale
    pub fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    /// `round(value / timescale * 1000)`, clamped at zero
    ///
    /// Returns `None` for an invalid timescale.
    pub fn to_millis(&self) -> Option<u64> {
        if !self.is_valid() {
            return None;
        }
        let scaled = self.value as i128 * 1000;
        let ts = self.timescale as i128;
        let rounded = if scaled >= 0 {
            (scaled + ts / 2) / ts
        } else {
            (scaled - ts / 2) / ts
        };
        Some(rounded.clamp(0, u64::MAX as i128) as u64)
    }

    /// Convert milliseconds into ticks of `timescale`, rounding to nearest
    pub fn from_millis(millis: u64, timescale: i32) -> Self {
        let ts = timescale.max(1) as i128;
        let value = (millis as i128 * ts + 500) / 1000;
        Self {
            value: value.min(i64::MAX as i128) as i64,
            timescale: ts as i32,
        }
    }
}

/// Seconds (as reported by a native clip) to whole milliseconds
pub fn secs_to_millis(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0).round() as u64
}

/// Whole milliseconds to native seconds
pub fn millis_to_secs(millis: u64) -> f64 {
    millis as f64 / 1000.0
}
