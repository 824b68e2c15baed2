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

//! Database abstraction in terms of the operations needed by the rental service.

use crate::model::*;
use rentacar_core::db::{BareTx, DbResult};
use rust_decimal::Decimal;
use time::Date;

pub mod postgres;
#[cfg(test)]
pub(crate) mod sqlite;

/// Maximum length of an invoice line description as specified in the schema.
pub(crate) const INVOICE_LINES_MAX_DESCRIPTION_LENGTH: usize = 40;

/// A transaction with high-level operations that deal with our types.
#[async_trait::async_trait]
pub trait Tx: BareTx {
    /// Registers the customer identified by `nif`.
    async fn put_customer(&mut self, nif: &Nif) -> DbResult<()>;

    /// Checks whether the customer identified by `nif` is registered.
    async fn customer_exists(&mut self, nif: &Nif) -> DbResult<bool>;

    /// Records a new vehicle model and returns its generated identifier.
    async fn put_model(
        &mut self,
        name: &str,
        price_per_day: Decimal,
        tank_capacity: Decimal,
        fuel_type: &FuelType,
    ) -> DbResult<ModelId>;

    /// Gets the pricing details of the model identified by `id`.
    async fn get_car_model(&mut self, id: ModelId) -> DbResult<CarModel>;

    /// Adds a vehicle identified by `plate` for an existing `model`.
    async fn put_vehicle(&mut self, plate: &Plate, model: ModelId) -> DbResult<()>;

    /// Looks up the vehicle identified by `plate` and returns its model reference, or `None`
    /// if the vehicle does not exist.
    async fn find_vehicle(&mut self, plate: &Plate) -> DbResult<Option<ModelId>>;

    /// Sets the per-liter price of `fuel_type`, replacing any previous price.
    async fn put_fuel_price(&mut self, fuel_type: &FuelType, price_per_liter: Decimal)
        -> DbResult<()>;

    /// Gets the per-liter price of `fuel_type`.
    async fn get_fuel_price(&mut self, fuel_type: &FuelType) -> DbResult<Decimal>;

    /// Checks whether any existing reservation for `plate` intersects the half-open
    /// `[start_date, end_date)` interval.  Touching intervals do not intersect.
    async fn vehicle_booked(
        &mut self,
        plate: &Plate,
        start_date: Date,
        end_date: Date,
    ) -> DbResult<bool>;

    /// Creates a reservation of `plate` for `customer` over `[start_date, end_date)` and
    /// returns its generated identifier.
    async fn put_reservation(
        &mut self,
        customer: &Nif,
        plate: &Plate,
        start_date: Date,
        end_date: Date,
    ) -> DbResult<ReservationId>;

    /// Gets all reservations for `plate`, ordered by start date.
    async fn get_reservations(&mut self, plate: &Plate) -> DbResult<Vec<Reservation>>;

    /// Creates an invoice charging `amount` to `customer` and returns its generated number.
    async fn put_invoice(&mut self, customer: &Nif, amount: Decimal) -> DbResult<InvoiceNumber>;

    /// Gets all invoices charged to `customer`, ordered by invoice number.
    async fn get_invoices(&mut self, customer: &Nif) -> DbResult<Vec<Invoice>>;

    /// Appends a line to the invoice identified by `invoice`.
    ///
    /// The `description` must already fit the schema's column width; see
    /// `INVOICE_LINES_MAX_DESCRIPTION_LENGTH`.
    async fn put_invoice_line(
        &mut self,
        invoice: InvoiceNumber,
        description: &str,
        amount: Decimal,
    ) -> DbResult<()>;

    /// Gets the lines of the invoice identified by `invoice`, in insertion order.
    async fn get_invoice_lines(&mut self, invoice: InvoiceNumber) -> DbResult<Vec<InvoiceLine>>;
}
