//! Threshold crossing with hysteresis

/// Direction of a threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Crossing {
    Rising,
    Falling,
}

/// Schmitt-style comparator
///
/// Reports a rising crossing at `value >= threshold` and only re-arms
/// after the value falls below `threshold - band`.
#[derive(Debug, Clone, Copy)]
pub struct Hysteresis {
    band: f32,
    above: bool,
}

impl Hysteresis {
    pub fn new(band: f32) -> Self {
        Self { band, above: false }
    }

    pub fn update(&mut self, value: f32, threshold: f32) -> Option<Crossing> {
        if !self.above && value >= threshold {
            self.above = true;
            Some(Crossing::Rising)
        } else if self.above && value < threshold - self.band {
            self.above = false;
            Some(Crossing::Falling)
        } else {
            None
        }
    }

    pub fn is_above(&self) -> bool {
        self.above
    }

    /// Back to the below-threshold state
    pub fn reset(&mut self) {
        self.above = false;
    }
}
