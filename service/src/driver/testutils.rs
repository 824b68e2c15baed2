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

//! Common utilities to write driver tests against an in-memory database.

use crate::db::sqlite::SqliteTx;
use crate::driver::Driver;
use rentacar_sqlite::SqliteDb;

/// State of a running test.
pub(crate) struct TestContext {
    /// The driver under test, backed by an in-memory database.
    driver: Driver<SqliteDb<SqliteTx>>,
}

impl TestContext {
    /// Initializes the driver against an empty in-memory database with the schema
    /// already in place.
    pub(crate) async fn setup() -> Self {
        let db = rentacar_sqlite::testutils::setup::<SqliteTx>().await;
        let driver = Driver::new(db);
        Self { driver }
    }

    /// Returns a driver instance for a single operation.
    pub(crate) fn driver(&self) -> Driver<SqliteDb<SqliteTx>> {
        self.driver.clone()
    }
}
