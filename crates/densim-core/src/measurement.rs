//! Measurement methods and records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::qubit::QubitRef;

/// How a measurement picks its outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementMethod {
    /// Sample the outcome from the session's random stream.
    #[default]
    Random,
    /// Take the more likely outcome; ties resolve to 0.
    Probable,
    /// Project onto 0, failing if that outcome is impossible.
    ForceZero,
    /// Project onto 1, failing if that outcome is impossible.
    ForceOne,
}

impl MeasurementMethod {
    /// The forced method for `value`.
    pub fn forced(value: bool) -> Self {
        if value { Self::ForceOne } else { Self::ForceZero }
    }

    /// The forced outcome, if this method forces one.
    pub fn forced_value(self) -> Option<bool> {
        match self {
            Self::ForceZero => Some(false),
            Self::ForceOne => Some(true),
            Self::Random | Self::Probable => None,
        }
    }

    /// Pick an outcome given normalized probabilities.
    ///
    /// `draw` is only called for [`MeasurementMethod::Random`] and must
    /// return a uniform sample from `[0, 1)`. Returns `None` when a forced
    /// outcome has probability below `epsilon`.
    pub fn select(
        self,
        p0: f64,
        p1: f64,
        epsilon: f64,
        draw: impl FnOnce() -> f64,
    ) -> Option<bool> {
        match self {
            Self::Random => Some(draw() < p1),
            Self::Probable => Some(p1 > p0),
            Self::ForceZero => (p0 >= epsilon).then_some(false),
            Self::ForceOne => (p1 >= epsilon).then_some(true),
        }
    }
}

impl fmt::Display for MeasurementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Probable => write!(f, "probable"),
            Self::ForceZero => write!(f, "0"),
            Self::ForceOne => write!(f, "1"),
        }
    }
}

/// Result of measuring one qubit.
///
/// `raw_probability` is `probability` as a little-endian IEEE-754 double,
/// for consumers that carry it as an opaque byte payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// The measured qubit.
    pub qubit: QubitRef,
    /// The outcome.
    pub value: bool,
    /// Probability of this outcome at the time of measurement.
    pub probability: f64,
    /// `probability.to_le_bytes()`.
    pub raw_probability: [u8; 8],
}

impl Measurement {
    /// Create a measurement record.
    pub fn new(qubit: QubitRef, value: bool, probability: f64) -> Self {
        Self {
            qubit,
            value,
            probability,
            raw_probability: probability.to_le_bytes(),
        }
    }

    /// The outcome as `0` or `1`.
    pub fn outcome(&self) -> u8 {
        u8::from(self.value)
    }

    /// Decode a probability carried as raw bytes.
    pub fn decode_probability(raw: [u8; 8]) -> f64 {
        f64::from_le_bytes(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-20;

    fn never() -> f64 {
        panic!("random draw not expected")
    }

    #[test]
    fn test_random_uses_draw() {
        let m = MeasurementMethod::Random;
        assert_eq!(m.select(0.3, 0.7, EPSILON, || 0.69), Some(true));
        assert_eq!(m.select(0.3, 0.7, EPSILON, || 0.7), Some(false));
    }

    #[test]
    fn test_probable_ties_to_zero() {
        let m = MeasurementMethod::Probable;
        assert_eq!(m.select(0.5, 0.5, EPSILON, never), Some(false));
        assert_eq!(m.select(0.4, 0.6, EPSILON, never), Some(true));
        assert_eq!(m.select(0.6, 0.4, EPSILON, never), Some(false));
    }

    #[test]
    fn test_forced_threshold() {
        assert_eq!(
            MeasurementMethod::ForceOne.select(1.0, 0.0, EPSILON, never),
            None
        );
        assert_eq!(
            MeasurementMethod::ForceOne.select(0.0, 1.0, EPSILON, never),
            Some(true)
        );
        assert_eq!(
            MeasurementMethod::ForceZero.select(1e-21, 1.0, EPSILON, never),
            None
        );
        assert_eq!(
            MeasurementMethod::ForceZero.select(1e-19, 1.0, EPSILON, never),
            Some(false)
        );
    }

    #[test]
    fn test_forced_constructor() {
        assert_eq!(MeasurementMethod::forced(true), MeasurementMethod::ForceOne);
        assert_eq!(MeasurementMethod::forced(false).forced_value(), Some(false));
        assert_eq!(MeasurementMethod::Random.forced_value(), None);
        assert_eq!(MeasurementMethod::default(), MeasurementMethod::Random);
    }

    #[test]
    fn test_raw_probability_is_little_endian() {
        let m = Measurement::new(QubitRef(1), true, 0.25);
        assert_eq!(m.raw_probability, [0, 0, 0, 0, 0, 0, 0xd0, 0x3f]);
        assert_eq!(Measurement::decode_probability(m.raw_probability), 0.25);
        assert_eq!(m.outcome(), 1);
    }

    #[test]
    fn test_method_serde_names() {
        let json = serde_json::to_string(&MeasurementMethod::ForceOne).unwrap();
        assert_eq!(json, "\"force_one\"");
        assert_eq!(MeasurementMethod::Probable.to_string(), "probable");
    }
}
