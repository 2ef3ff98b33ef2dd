//! Value Objects for loyalty and orders

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Loyalty points. One point is worth one currency unit at redemption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points(i64);

impl Points {
    pub const ZERO: Points = Points(0);

    pub fn new(value: i64) -> Result<Self, PointsError> {
        if value < 0 { return Err(PointsError::Negative); }
        Ok(Self(value))
    }
    /// Clamps negative input to zero.
    pub fn saturating(value: i64) -> Self { Self(value.max(0)) }
    pub fn value(&self) -> i64 { self.0 }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
    pub fn add(&self, other: Points) -> Self { Self(self.0.saturating_add(other.0)) }
    pub fn subtract(&self, other: Points) -> Option<Self> {
        if other.0 > self.0 { None } else { Some(Self(self.0 - other.0)) }
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PointsError { Negative }
impl std::error::Error for PointsError {}
impl fmt::Display for PointsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Points cannot be negative") }
}

/// Regional storefront an order was placed in. Each store has its own catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreRegion { #[default] China, Thailand, Vietnam }

impl StoreRegion {
    pub fn as_str(&self) -> &'static str {
        match self { Self::China => "china", Self::Thailand => "thailand", Self::Vietnam => "vietnam" }
    }
}

impl fmt::Display for StoreRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StoreRegion {
    type Err = UnknownValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "china" => Ok(Self::China),
            "thailand" => Ok(Self::Thailand),
            "vietnam" => Ok(Self::Vietnam),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Returned when a stored enum column holds a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownValue(pub String);
impl std::error::Error for UnknownValue {}
impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Unknown value '{}'", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_points() {
        let p = Points::new(100).unwrap();
        assert_eq!(p.add(Points::new(50).unwrap()).value(), 150);
        assert_eq!(p.subtract(Points::new(30).unwrap()).unwrap().value(), 70);
        assert!(p.subtract(Points::new(101).unwrap()).is_none());
        assert_eq!(Points::new(-1), Err(PointsError::Negative));
        assert_eq!(Points::saturating(-7), Points::ZERO);
        assert_eq!(Points::saturating(42).value(), 42);
    }
    #[test]
    fn test_store_region_roundtrip() {
        assert_eq!("thailand".parse::<StoreRegion>().unwrap(), StoreRegion::Thailand);
        assert_eq!(StoreRegion::Vietnam.to_string(), "vietnam");
        assert!("japan".parse::<StoreRegion>().is_err());
    }
}
