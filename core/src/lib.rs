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

//! Core abstractions shared by all Rentacar crates.
//!
//! The service adheres to the following layered architecture, and every crate
//! structures its code around these modules:
//!
//! 1.  `model`: The base layer, providing high-level data types that represent
//!     concepts in the rental domain.  There is no logic in here.  Extensive
//!     use of the newtype pattern with validating constructors is expected.
//!
//! 1.  `db`: The persistence layer.  The service extends the `BareTx` trait
//!     with a `Tx` type that provides domain-specific operations, and the
//!     backend crates supply `Db` implementations that mint such transactions
//!     from a connection pool.
//!
//! 1.  `driver`: The business logic layer.  The service provides a `Driver`
//!     type that coordinates access to the database, running each public
//!     operation within a single transaction.
//!
//! There are result and error types in every layer, such as `DbResult` and
//! `ModelError`.  Errors float to the top of the stack via the `?` operator,
//! being translated to the next layer's taxonomy at each boundary.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod db;
pub mod env;
pub mod model;
