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

//! Common utilities to interact with an SQLite database.
//!
//! SQLite has no native DATE or DECIMAL storage classes, so this crate also
//! provides the helpers that the service's queries use to store dates as
//! ISO-8601 text and monetary amounts as exact decimal text.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use derivative::Derivative;
use futures::lock::Mutex;
use futures::TryStreamExt;
use rentacar_core::db::{BareTx, Db, DbError, DbResult};
use rust_decimal::Decimal;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;
use std::marker::PhantomData;
use std::str::FromStr;
use time::{Date, Month};

/// Takes a raw SQLx error `e` and converts it to our generic error type.
///
/// SQLite reports constraint failures as free-form messages without naming the
/// offending constraint, so foreign-key violations carry the whole message as
/// their detail.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        e if e.to_string().contains("FOREIGN KEY constraint failed") => {
            DbError::ForeignKeyViolation(e.to_string())
        }
        e if e.to_string().contains("UNIQUE constraint failed") => DbError::AlreadyExists,
        e => DbError::BackendError(e.to_string()),
    }
}

/// A database instance backed by a SQLite database.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct SqliteDb<T>
where
    T: BareTx + From<Mutex<Transaction<'static, Sqlite>>> + Send + Sync + 'static,
{
    /// Shared SQLite connection pool.  This is a cloneable type that all concurrent
    /// transactions can use concurrently.
    pool: SqlitePool,

    /// Marker for the unused type `T`.
    _phantom_tx: PhantomData<T>,
}

impl<T> SqliteDb<T>
where
    T: BareTx + From<Mutex<Transaction<'static, Sqlite>>> + Send + Sync + 'static,
{
    /// Creates a new connection.
    async fn connect_internal(conn_str: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(conn_str)
            .map_err(map_sqlx_error)?
            .foreign_keys(true);

        // Every connection to an in-memory SQLite database is a separate database, so the
        // pool must never grow beyond one connection or queries would randomly land on an
        // uninitialized database.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self { pool, _phantom_tx: PhantomData })
    }

    /// Creates a new connection and sets the database schema.
    pub async fn connect(conn_str: &str) -> DbResult<Self> {
        let db = SqliteDb::<T>::connect_internal(conn_str).await?;

        let mut tx: T = db.begin().await?;
        tx.migrate().await?;
        tx.commit().await?;

        Ok(db)
    }
}

#[async_trait::async_trait]
impl<T> Db for SqliteDb<T>
where
    T: BareTx + From<Mutex<Transaction<'static, Sqlite>>> + Send + Sync + 'static,
{
    type SqlxTx = Mutex<Transaction<'static, Sqlite>>;
    type Tx = T;

    async fn begin(&self) -> DbResult<Self::Tx> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Self::Tx::from(Mutex::from(tx)))
    }
}

/// Helper function to initialize the database with a schema.  Use in implementations of
/// `BareTx::migrate`.
pub async fn run_schema(
    tx: &mut Mutex<Transaction<'static, Sqlite>>,
    schema: &str,
) -> DbResult<()> {
    let mut tx = tx.lock().await;
    let mut results = sqlx::query(schema).execute_many(&mut *tx).await;
    while results.try_next().await.map_err(map_sqlx_error)?.is_some() {
        // Nothing to do.
    }
    Ok(())
}

/// Converts a date as extracted from the database into a `Date`.
///
/// Dates are stored as `YYYY-MM-DD` text so that SQL relational operators sort
/// them chronologically.
pub fn build_date(raw: &str) -> DbResult<Date> {
    let error = || DbError::DataIntegrityError(format!("Invalid date '{}' in database", raw));

    let fields = raw.split('-').collect::<Vec<&str>>();
    if fields.len() != 3 {
        return Err(error());
    }
    let year = fields[0].parse::<i32>().map_err(|_| error())?;
    let month = fields[1].parse::<u8>().map_err(|_| error())?;
    let day = fields[2].parse::<u8>().map_err(|_| error())?;

    let month = Month::try_from(month).map_err(|_| error())?;
    Date::from_calendar_date(year, month, day).map_err(|_| error())
}

/// Converts a date into the `YYYY-MM-DD` text representation needed by the database.
pub fn unpack_date(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

/// Converts a monetary amount as extracted from the database into a `Decimal`.
pub fn build_money(raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid amount '{}': {}", raw, e)))
}

/// Converts a monetary amount into the decimal text representation needed by the database.
pub fn unpack_money(amount: Decimal) -> String {
    amount.to_string()
}

/// Test utilities for the SQLite connection.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Initializes a test database with the schema required by the transaction type `T`.
    pub async fn setup<T>() -> SqliteDb<T>
    where
        T: BareTx + From<Mutex<Transaction<'static, Sqlite>>> + Send + Sync + 'static,
    {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        SqliteDb::connect(":memory:").await.unwrap()
    }
}
