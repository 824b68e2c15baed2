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

//! Business logic of the rental service.
//!
//! Every public operation of the [`Driver`] runs in its own database transaction.  If the
//! operation fails at any point, the transaction is rolled back on drop and the database is
//! left untouched.

use crate::db::Tx;
use rentacar_core::db::{Db, DbError};
use rentacar_core::model::ModelError;

mod fleet;
mod rent;
#[cfg(test)]
pub(crate) mod testutils;

/// Business logic errors.  These errors encompass backend and logical errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RentalError {
    /// Catch-all error type for unexpected database errors.
    #[error("{0}")]
    BackendError(String),

    /// Indicates that the customer referenced by an operation is not registered.
    #[error("{0}")]
    CustomerNotFound(String),

    /// Indicates an attempt to create an entity that already exists.
    #[error("{0}")]
    AlreadyExists(String),

    /// Indicates that a rental does not span at least one full day.
    #[error("{0}")]
    InsufficientDuration(String),

    /// Indicates a validation problem in the operation's input parameters.
    #[error("{0}")]
    InvalidInput(String),

    /// Indicates that the vehicle referenced by an operation is not part of the fleet.
    #[error("{0}")]
    VehicleNotFound(String),

    /// Indicates that the vehicle is already reserved over the requested dates.
    #[error("{0}")]
    VehicleUnavailable(String),
}

impl From<DbError> for RentalError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::AlreadyExists => RentalError::AlreadyExists("Already exists".to_owned()),
            DbError::ForeignKeyViolation(detail) => {
                // The constraint names in the schema (or the raw messages in the case of
                // SQLite) carry the name of the referenced table.
                if detail.contains("customer") {
                    RentalError::CustomerNotFound("Customer is not registered".to_owned())
                } else if detail.contains("vehicle") {
                    RentalError::VehicleNotFound("Vehicle is not part of the fleet".to_owned())
                } else {
                    log::debug!("Unclassified foreign key violation: {}", detail);
                    RentalError::BackendError(format!("Foreign key violation: {}", detail))
                }
            }
            e => {
                log::debug!("Database error: {}", e);
                RentalError::BackendError(e.to_string())
            }
        }
    }
}

impl From<ModelError> for RentalError {
    fn from(e: ModelError) -> Self {
        RentalError::InvalidInput(e.0)
    }
}

/// Result type for this module.
pub type RentalResult<T> = Result<T, RentalError>;

/// Business logic for the rental service.
///
/// The driver is `Clone`able and cheap to copy so that it can be handed out to every
/// concurrent caller.  Each operation consumes the driver because it takes ownership of a
/// single database transaction for its whole duration.
#[derive(Clone)]
pub struct Driver<D>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    /// The database that the driver uses for persistence.
    db: D,
}

impl<D> Driver<D>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    /// Creates a new driver backed by the given database.
    pub fn new(db: D) -> Self {
        Self { db }
    }
}
