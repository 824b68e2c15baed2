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

//! Car rental service.
//!
//! This crate implements the rental business operation as an in-process
//! library: callers construct a [`driver::Driver`] over a database provided by
//! one of the backend crates and invoke its operations directly.  The central
//! operation is [`driver::Driver::rent`], which reserves a vehicle for a
//! customer over a date range and writes the corresponding invoice, all within
//! a single database transaction.
//!
//! Production deployments use `rentacar_postgres::PostgresDb` with the
//! [`db::postgres::PostgresTx`] transaction type; tests run against an
//! in-memory SQLite database.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod db;
pub mod driver;
pub mod model;
