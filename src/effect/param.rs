//! Tunable effect and calibration parameters

/// Static description of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: i16,
    pub max: i16,
    /// Amount added per encoder step
    pub step: i16,
    /// Wrap around the range instead of clamping
    pub wrap: bool,
    pub default: i16,
}

impl ParamSpec {
    pub const fn new(name: &'static str, min: i16, max: i16, step: i16, default: i16) -> Self {
        Self {
            name,
            min,
            max,
            step,
            wrap: false,
            default,
        }
    }

    #[must_use]
    pub const fn wrapping(mut self) -> Self {
        self.wrap = true;
        self
    }
}

/// Result of changing a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub value: i16,
    /// The requested value was outside `[min, max]`
    pub limit_hit: bool,
}

/// A parameter with its current value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    spec: ParamSpec,
    value: i16,
}

impl Parameter {
    pub const fn new(spec: ParamSpec) -> Self {
        let value = clamp(spec.default as i32, spec.min, spec.max);
        Self { spec, value }
    }

    pub const fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    pub const fn value(&self) -> i16 {
        self.value
    }

    /// Set an absolute value, clamped to the range.
    pub fn set(&mut self, value: i16) -> Adjustment {
        let raw = i32::from(value);
        self.value = clamp(raw, self.spec.min, self.spec.max);
        Adjustment {
            value: self.value,
            limit_hit: self.is_out_of_range(raw),
        }
    }

    /// Move by `steps * step`, clamping or wrapping at the bounds.
    pub fn adjust(&mut self, steps: i16) -> Adjustment {
        let raw = i32::from(self.value) + i32::from(steps) * i32::from(self.spec.step);
        let limit_hit = self.is_out_of_range(raw);
        self.value = if self.spec.wrap {
            wrap(raw, self.spec.min, self.spec.max)
        } else {
            clamp(raw, self.spec.min, self.spec.max)
        };
        Adjustment {
            value: self.value,
            limit_hit,
        }
    }

    pub fn reset(&mut self) {
        self.value = clamp(i32::from(self.spec.default), self.spec.min, self.spec.max);
    }

    fn is_out_of_range(&self, raw: i32) -> bool {
        raw < i32::from(self.spec.min) || raw > i32::from(self.spec.max)
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn clamp(value: i32, min: i16, max: i16) -> i16 {
    if value < min as i32 {
        min
    } else if value > max as i32 {
        max
    } else {
        value as i16
    }
}

#[allow(clippy::cast_possible_truncation)]
fn wrap(value: i32, min: i16, max: i16) -> i16 {
    let span = i32::from(max) - i32::from(min) + 1;
    if span <= 0 {
        return min;
    }
    (i32::from(min) + (value - i32::from(min)).rem_euclid(span)) as i16
}
