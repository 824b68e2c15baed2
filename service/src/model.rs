// Rentacar
// Copyright 2024 The Rentacar Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! High-level data types for the rental domain.

use derive_getters::Getters;
use derive_more::Constructor;
use rentacar_core::model::{ModelError, ModelResult};
use rust_decimal::Decimal;
use std::fmt;
use time::Date;

/// Maximum length of a customer NIF as specified in the schema.
pub(crate) const CUSTOMERS_MAX_NIF_LENGTH: usize = 16;

/// Maximum length of a vehicle plate as specified in the schema.
pub(crate) const VEHICLES_MAX_PLATE_LENGTH: usize = 10;

/// Maximum length of a fuel type name as specified in the schema.
pub(crate) const FUEL_PRICES_MAX_FUEL_TYPE_LENGTH: usize = 16;

/// Represents a correctly-formatted (but maybe non-existent) customer national ID.
///
/// NIFs are case-insensitive and we normalize them to uppercase, which is how they appear
/// in official documents.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Nif(String);

impl Nif {
    /// Creates a new NIF from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.is_empty() {
            return Err(ModelError("NIF cannot be empty".to_owned()));
        }
        if s.len() > CUSTOMERS_MAX_NIF_LENGTH {
            return Err(ModelError("NIF is too long".to_owned()));
        }
        for ch in s.chars() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ModelError(format!("Unsupported character '{}' in NIF '{}'", ch, s)));
            }
        }

        Ok(Self(s.to_uppercase()))
    }

    /// Returns a view of this NIF as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Represents a correctly-formatted (but maybe non-existent) vehicle plate.
///
/// Plates are normalized to uppercase, matching how they are stamped.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Plate(String);

impl Plate {
    /// Creates a new plate from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.is_empty() {
            return Err(ModelError("Plate cannot be empty".to_owned()));
        }
        if s.len() > VEHICLES_MAX_PLATE_LENGTH {
            return Err(ModelError("Plate is too long".to_owned()));
        }
        for ch in s.chars() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ModelError(format!("Unsupported character '{}' in plate '{}'", ch, s)));
            }
        }

        Ok(Self(s.to_uppercase()))
    }

    /// Returns a view of this plate as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Represents a fuel type, such as `diesel`.
///
/// Fuel types are free-form lowercase labels that key into the fuel price list.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct FuelType(String);

impl FuelType {
    /// Creates a new fuel type from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.is_empty() {
            return Err(ModelError("Fuel type cannot be empty".to_owned()));
        }
        if s.len() > FUEL_PRICES_MAX_FUEL_TYPE_LENGTH {
            return Err(ModelError("Fuel type is too long".to_owned()));
        }
        for ch in s.chars() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ModelError(format!("Unsupported character '{}' in fuel type", ch)));
            }
        }

        Ok(Self(s.to_lowercase()))
    }

    /// Returns a view of this fuel type as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Generates a newtype over the `i64` keys that the database assigns from a sequence.
macro_rules! generated_key [
    ( $name:ident, $what:expr ) => {
        /// Database-assigned identifier newtype.  The wrapped value is guaranteed to be
        /// positive, as sequences start counting at 1.
        #[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from an `i64` with range validation.
            pub fn from_i64(id: i64) -> ModelResult<Self> {
                if id < 1 {
                    return Err(ModelError(format!("{} {} is out of range", $what, id)));
                }
                Ok(Self(id))
            }

            /// Returns the identifier as an `i64`.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    }
];

generated_key!(ModelId, "Model ID");
generated_key!(ReservationId, "Reservation ID");
generated_key!(InvoiceNumber, "Invoice number");

/// Details of a vehicle model needed to price a rental.
#[derive(Clone, Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct CarModel {
    /// Human-readable model name.
    name: String,

    /// Rental price for one day.
    price_per_day: Decimal,

    /// Fuel tank capacity in liters.
    tank_capacity: Decimal,

    /// Type of fuel the model burns.
    fuel_type: FuelType,
}

/// A reservation of one vehicle for one customer over a date range.
///
/// The date range follows half-open `[start_date, end_date)` semantics: the vehicle is
/// handed back before the end date starts, so a second rental may begin on that same day.
#[derive(Clone, Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Reservation {
    /// Database-assigned identifier of the reservation.
    id: ReservationId,

    /// NIF of the customer that holds the reservation.
    customer: Nif,

    /// Plate of the reserved vehicle.
    plate: Plate,

    /// First day of the rental.
    start_date: Date,

    /// Day the vehicle is due back, exclusive.
    end_date: Date,
}

/// An invoice charged to a customer.
#[derive(Clone, Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Invoice {
    /// Database-assigned invoice number.
    number: InvoiceNumber,

    /// NIF of the invoiced customer.
    customer: Nif,

    /// Total amount across all lines.
    amount: Decimal,
}

/// One line of an invoice.
#[derive(Clone, Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct InvoiceLine {
    /// Description of the charged concept.
    description: String,

    /// Amount charged by this line.
    amount: Decimal,
}
