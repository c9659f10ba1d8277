//! This module defines various unit types and their conversions.
use serde::{Deserialize, Serialize};

/// The number of hours in a (non-leap) year, used to convert power draw to annual energy
pub const HOURS_PER_YEAR: f64 = 8760.0;

macro_rules! unit_struct {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from a f64 value.
            pub const fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                $name(iter.map(|x| x.0).sum())
            }
        }

        impl float_cmp::ApproxEq for $name {
            type Margin = float_cmp::F64Margin;
            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

/// Represents a dimensionless quantity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Create a new dimensionless value
    pub const fn new(val: f64) -> Self {
        Self(val)
    }

    /// Returns the value as a f64.
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

// Base quantities
unit_struct!(Money, "A sum of money in GBP.");
unit_struct!(Area, "An area in square kilometres.");
unit_struct!(Length, "A cable length in metres.");
unit_struct!(Speed, "A downlink speed in Mbps.");
unit_struct!(Power, "A power draw in kilowatts.");
unit_struct!(Energy, "An amount of energy in kilowatt hours.");

// Derived quantities
unit_struct!(
    TrafficDensity,
    "Offered or delivered traffic per unit area, in Mbps/km²."
);
unit_struct!(SiteDensity, "A number of sites per km².");
unit_struct!(PopulationDensity, "Persons per km².");
unit_struct!(MoneyPerLength, "A cost per metre of cable in GBP.");
unit_struct!(Traffic, "An aggregate traffic volume in Mbps.");

impl_mul!(Length, MoneyPerLength, Money);
impl_mul!(TrafficDensity, Area, Traffic);
impl_div!(Traffic, Area, TrafficDensity);

impl Power {
    /// The energy consumed when drawing this power continuously for a year
    pub fn annual_energy(self) -> Energy {
        Energy(self.0 * HOURS_PER_YEAR)
    }
}

impl PopulationDensity {
    /// Compute the density of a population over an area
    pub fn of(population: u64, area: Area) -> Self {
        Self(population as f64 / area.0)
    }
}

impl SiteDensity {
    /// Compute the density of a count of sites over an area
    pub fn of(sites: usize, area: Area) -> Self {
        Self(sites as f64 / area.0)
    }
}
