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

//! Generic abstraction to access different database systems.
//!
//! The facilities in this module provide an abstraction over different
//! database systems such as PostgreSQL and SQLite.  The PostgreSQL backend is
//! for production use and the SQLite backend is primarily intended to support
//! unit tests.

use crate::model::ModelError;
use async_trait::async_trait;

/// Database errors.  Any unexpected errors that come from the database are classified as
/// `BackendError`, but errors we know about have more specific types.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// Indicates that a request to create an entry failed because it already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Catch-all error type for unexpected database errors.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Indicates a failure processing the data that already exists in the database.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// Indicates that a write referenced an entity that does not exist.  The string carries
    /// whatever detail the backend can supply about the violated constraint so that upper
    /// layers can recognize which reference was broken.
    #[error("Referential integrity violation: {0}")]
    ForeignKeyViolation(String),

    /// Indicates that a requested entry does not exist.
    #[error("Entity not found")]
    NotFound,

    /// Indicates that the database is not available (maybe because of too many active
    /// concurrent connections).
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// A transaction with no available operations.
///
/// Services extend this trait with their domain-specific operations, and the backend crates
/// provide types that implement the extended trait on top of a raw sqlx transaction.
#[async_trait]
pub trait BareTx {
    /// Commits the transaction.  If this is never called, the transaction is rolled back
    /// when the type is dropped.
    async fn commit(mut self) -> DbResult<()>;

    /// Initializes the database schema managed by this transaction type.
    async fn migrate(&mut self) -> DbResult<()> {
        Ok(())
    }

    /// Initializes the database schema for tests.  By default this is the same as the
    /// production schema.
    async fn migrate_test(&mut self) -> DbResult<()> {
        self.migrate().await
    }
}

/// Abstraction over the database connection.
///
/// Implementations wrap a connection pool.  Acquiring and releasing connections is fully
/// encapsulated here: a connection is taken from the pool when a transaction begins and
/// returned to it when the transaction object goes away, on every path.
#[async_trait]
pub trait Db {
    /// The raw sqlx transaction type used by this database.
    type SqlxTx: Send + Sync;

    /// The application-level transaction type minted by this database.
    type Tx: BareTx + From<Self::SqlxTx> + Send + Sync + 'static;

    /// Begins a transaction.
    ///
    /// It is the responsibility of the caller to call `commit` on the returned transaction.
    /// Otherwise the transaction is rolled back on drop.
    async fn begin(&self) -> DbResult<Self::Tx>;
}

/// Macros to help instantiate tests for multiple database systems.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Instantiates the `module::name` test for the database configured by `setup`.
    ///
    /// The `extra` metadata parameter can be used to tag the generated tests.
    #[macro_export]
    macro_rules! generate_one_test [
        ( $name:ident, $setup:expr, $module:path $(, #[$extra:meta] )? ) => {
            #[tokio::test]
            $(#[$extra])?
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        }
    ];

    pub use generate_one_test;

    /// Instantiates a collection of tests for a specific database system.
    ///
    /// The database implementation to run the tests against is determined by the `setup`
    /// expression, which needs to return a database object parameterized with the desired
    /// transaction type.  The returned database should also have been initialized with the
    /// desired schema.
    ///
    /// The `extra` metadata parameter can be used to tag the generated tests.
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module, #[$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module);
            )+
        };
    ];

    pub use generate_tests;
}
