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

//! Maintenance of the customer registry, the fleet and the fuel price list, plus the
//! read-only queries over reservations and invoices.

use crate::db::Tx;
use crate::driver::{Driver, RentalError, RentalResult};
use crate::model::{FuelType, Invoice, InvoiceLine, ModelId, Nif, Plate, Reservation};
use rentacar_core::db::{BareTx, Db, DbError};
use rust_decimal::Decimal;

impl<D> Driver<D>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    /// Registers the customer identified by `customer`.
    pub async fn register_customer(self, customer: &Nif) -> RentalResult<()> {
        let mut tx = self.db.begin().await?;
        match tx.put_customer(customer).await {
            Ok(()) => (),
            Err(DbError::AlreadyExists) => {
                return Err(RentalError::AlreadyExists(format!(
                    "Customer {} is already registered",
                    customer
                )))
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        Ok(())
    }

    /// Records a new vehicle model and returns its generated identifier.
    pub async fn define_model(
        self,
        name: &str,
        price_per_day: Decimal,
        tank_capacity: Decimal,
        fuel_type: &FuelType,
    ) -> RentalResult<ModelId> {
        if name.is_empty() {
            return Err(RentalError::InvalidInput("Model name cannot be empty".to_owned()));
        }
        if price_per_day <= Decimal::ZERO {
            return Err(RentalError::InvalidInput(format!(
                "Price per day {} must be positive",
                price_per_day
            )));
        }
        if tank_capacity <= Decimal::ZERO {
            return Err(RentalError::InvalidInput(format!(
                "Tank capacity {} must be positive",
                tank_capacity
            )));
        }

        let mut tx = self.db.begin().await?;
        let id = tx.put_model(name, price_per_day, tank_capacity, fuel_type).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Adds the vehicle identified by `plate` to the fleet as an instance of `model`.
    pub async fn add_vehicle(self, plate: &Plate, model: ModelId) -> RentalResult<()> {
        let mut tx = self.db.begin().await?;
        match tx.put_vehicle(plate, model).await {
            Ok(()) => (),
            Err(DbError::AlreadyExists) => {
                return Err(RentalError::AlreadyExists(format!(
                    "Vehicle {} is already in the fleet",
                    plate
                )))
            }
            Err(DbError::ForeignKeyViolation(_)) => {
                return Err(RentalError::InvalidInput(format!("Model {} does not exist", model)))
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        Ok(())
    }

    /// Sets the per-liter price of `fuel_type`, replacing any previous price.
    pub async fn set_fuel_price(
        self,
        fuel_type: &FuelType,
        price_per_liter: Decimal,
    ) -> RentalResult<()> {
        if price_per_liter <= Decimal::ZERO {
            return Err(RentalError::InvalidInput(format!(
                "Price per liter {} must be positive",
                price_per_liter
            )));
        }

        let mut tx = self.db.begin().await?;
        tx.put_fuel_price(fuel_type, price_per_liter).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Returns all reservations for `plate`, ordered by start date.
    pub async fn reservations(self, plate: &Plate) -> RentalResult<Vec<Reservation>> {
        let mut tx = self.db.begin().await?;
        let reservations = tx.get_reservations(plate).await?;
        Ok(reservations)
    }

    /// Returns all invoices charged to `customer`, each coupled with its lines in
    /// insertion order.
    pub async fn invoices(self, customer: &Nif) -> RentalResult<Vec<(Invoice, Vec<InvoiceLine>)>> {
        let mut tx = self.db.begin().await?;
        let invoices = tx.get_invoices(customer).await?;
        let mut result = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let lines = tx.get_invoice_lines(*invoice.number()).await?;
            result.push((invoice, lines));
        }
        Ok(result)
    }
}
