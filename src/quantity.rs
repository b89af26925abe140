//! Physical quantities carried by graph edges: elapsed time and consumed energy.
//!
//! All amounts are integers in base units, so accumulated costs hash and compare
//! exactly. Time is counted in picoseconds, energy in picojoules.

use std::fmt;
use std::ops::{Add, AddAssign};

/// A physical symbol that can be bounded by a constraint window.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Symbol {
    Time,
    Energy,
}

impl Symbol {
    pub const ALL: [Symbol; 2] = [Symbol::Time, Symbol::Energy];
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Time => write!(f, "t"),
            Symbol::Energy => write!(f, "e"),
        }
    }
}

/// A unit of measurement, tied to exactly one [`Symbol`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Unit {
    Picoseconds,
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Picojoules,
    Nanojoules,
    Microjoules,
    Millijoules,
    Joules,
}

impl Unit {
    /// The symbol this unit measures.
    pub fn symbol(self) -> Symbol {
        match self {
            Unit::Picoseconds | Unit::Nanoseconds | Unit::Microseconds | Unit::Milliseconds | Unit::Seconds => {
                Symbol::Time
            }
            Unit::Picojoules | Unit::Nanojoules | Unit::Microjoules | Unit::Millijoules | Unit::Joules => {
                Symbol::Energy
            }
        }
    }

    /// Number of base units in one unit.
    pub fn scale(self) -> u64 {
        match self {
            Unit::Picoseconds | Unit::Picojoules => 1,
            Unit::Nanoseconds | Unit::Nanojoules => 1_000,
            Unit::Microseconds | Unit::Microjoules => 1_000_000,
            Unit::Milliseconds | Unit::Millijoules => 1_000_000_000,
            Unit::Seconds | Unit::Joules => 1_000_000_000_000,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Picoseconds => "ps",
            Unit::Nanoseconds => "ns",
            Unit::Microseconds => "us",
            Unit::Milliseconds => "ms",
            Unit::Seconds => "s",
            Unit::Picojoules => "pJ",
            Unit::Nanojoules => "nJ",
            Unit::Microjoules => "uJ",
            Unit::Millijoules => "mJ",
            Unit::Joules => "J",
        }
    }

    /// Parses a unit suffix such as `"ns"` or `"uJ"`.
    pub fn from_suffix(suffix: &str) -> Option<Unit> {
        let unit = match suffix {
            "ps" => Unit::Picoseconds,
            "ns" => Unit::Nanoseconds,
            "us" => Unit::Microseconds,
            "ms" => Unit::Milliseconds,
            "s" => Unit::Seconds,
            "pJ" => Unit::Picojoules,
            "nJ" => Unit::Nanojoules,
            "uJ" => Unit::Microjoules,
            "mJ" => Unit::Millijoules,
            "J" => Unit::Joules,
            _ => return None,
        };
        Some(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// A literal amount with a unit, e.g. `100ns`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Quantity {
    pub value: u64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: u64, unit: Unit) -> Self {
        Quantity { value, unit }
    }

    pub fn ns(value: u64) -> Self {
        Quantity::new(value, Unit::Nanoseconds)
    }

    pub fn ps(value: u64) -> Self {
        Quantity::new(value, Unit::Picoseconds)
    }

    pub fn nj(value: u64) -> Self {
        Quantity::new(value, Unit::Nanojoules)
    }

    pub fn pj(value: u64) -> Self {
        Quantity::new(value, Unit::Picojoules)
    }

    pub fn symbol(&self) -> Symbol {
        self.unit.symbol()
    }

    /// The amount in base units (saturating).
    pub fn base(&self) -> u64 {
        self.value.saturating_mul(self.unit.scale())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Per-symbol cost of an edge, or the accumulated cost of a branch.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Cost {
    /// Elapsed time in picoseconds.
    pub time: u64,
    /// Consumed energy in picojoules.
    pub energy: u64,
}

impl Cost {
    pub const ZERO: Cost = Cost { time: 0, energy: 0 };

    pub fn new(time: Quantity, energy: Quantity) -> Self {
        assert_eq!(time.symbol(), Symbol::Time, "Expected a time quantity, got {}", time);
        assert_eq!(energy.symbol(), Symbol::Energy, "Expected an energy quantity, got {}", energy);
        Cost {
            time: time.base(),
            energy: energy.base(),
        }
    }

    pub fn of_time(time: Quantity) -> Self {
        Cost::new(time, Quantity::pj(0))
    }

    pub fn get(&self, symbol: Symbol) -> u64 {
        match symbol {
            Symbol::Time => self.time,
            Symbol::Energy => self.energy,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Cost::ZERO
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Self) -> Self::Output {
        Cost {
            time: self.time.saturating_add(rhs.time),
            energy: self.energy.saturating_add(rhs.energy),
        }
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{t = {}ps, e = {}pJ}}", self.time, self.energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_units() {
        assert_eq!(Quantity::ns(100).base(), 100_000);
        assert_eq!(Quantity::new(2, Unit::Microjoules).base(), 2_000_000);
        assert_eq!(Quantity::new(u64::MAX, Unit::Seconds).base(), u64::MAX);
    }

    #[test]
    fn test_unit_suffix_roundtrip() {
        for unit in [Unit::Picoseconds, Unit::Nanoseconds, Unit::Seconds, Unit::Nanojoules, Unit::Joules] {
            assert_eq!(Unit::from_suffix(unit.suffix()), Some(unit));
        }
        assert_eq!(Unit::from_suffix("furlong"), None);
    }

    #[test]
    fn test_cost_accumulation() {
        let step = Cost::new(Quantity::ns(5), Quantity::pj(7));
        let mut total = Cost::ZERO;
        total += step;
        total += step;
        assert_eq!(total.get(Symbol::Time), 10_000);
        assert_eq!(total.get(Symbol::Energy), 14);
        assert!(total >= step);
    }

    #[test]
    #[should_panic(expected = "Expected a time quantity")]
    fn test_cost_wrong_dimension() {
        Cost::new(Quantity::nj(1), Quantity::nj(1));
    }
}
