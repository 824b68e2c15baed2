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

//! The rental operation: reserves a vehicle and invoices the rental.

use crate::db::{Tx, INVOICE_LINES_MAX_DESCRIPTION_LENGTH};
use crate::driver::{Driver, RentalError, RentalResult};
use crate::model::{CarModel, Nif, Plate};
use rentacar_core::db::{BareTx, Db, DbError};
use rust_decimal::Decimal;
use time::{Date, Duration};

/// Number of days a rental lasts when the caller does not supply a return date.
const DEFAULT_RENTAL_DAYS: i64 = 4;

/// Formats the invoice line description for the rental charge.
fn rental_description(days: i64, model: &CarModel) -> String {
    truncate_description(format!("{} days of rental, vehicle model {}", days, model.name()))
}

/// Formats the invoice line description for the fuel deposit charge.
fn deposit_description(model: &CarModel) -> String {
    truncate_description(format!(
        "Full tank of {} liters of {}",
        model.tank_capacity().trunc(),
        model.fuel_type()
    ))
}

/// Trims `description` to the width of the invoice lines column, respecting character
/// boundaries.
fn truncate_description(description: String) -> String {
    if description.chars().count() <= INVOICE_LINES_MAX_DESCRIPTION_LENGTH {
        description
    } else {
        description.chars().take(INVOICE_LINES_MAX_DESCRIPTION_LENGTH).collect()
    }
}

impl<D> Driver<D>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    /// Rents the vehicle identified by `plate` to the customer identified by `customer`
    /// starting on `start_date`.
    ///
    /// The vehicle is due back on `end_date`, exclusive, or `DEFAULT_RENTAL_DAYS` days after
    /// the start when no return date is given.  The rental is priced as the per-day rate of
    /// the vehicle's model times the number of days, plus a deposit for a full tank of fuel
    /// at the current per-liter price, and is recorded as one invoice with one line per
    /// charge.
    ///
    /// The reservation and the invoice are written in a single transaction, so a failure at
    /// any point leaves no trace in the database.
    pub async fn rent(
        self,
        customer: &Nif,
        plate: &Plate,
        start_date: Date,
        end_date: Option<Date>,
    ) -> RentalResult<()> {
        let end_date = match end_date {
            Some(date) => date,
            None => start_date + Duration::days(DEFAULT_RENTAL_DAYS),
        };
        let days = (end_date - start_date).whole_days();
        if days < 1 {
            return Err(RentalError::InsufficientDuration(format!(
                "Rental from {} to {} does not span a full day",
                start_date, end_date
            )));
        }

        let mut tx = self.db.begin().await?;

        if !tx.customer_exists(customer).await? {
            return Err(RentalError::CustomerNotFound(format!(
                "Customer {} is not registered",
                customer
            )));
        }

        let model_id = match tx.find_vehicle(plate).await? {
            Some(id) => id,
            None => {
                return Err(RentalError::VehicleNotFound(format!(
                    "Vehicle {} is not part of the fleet",
                    plate
                )))
            }
        };

        if tx.vehicle_booked(plate, start_date, end_date).await? {
            return Err(RentalError::VehicleUnavailable(format!(
                "Vehicle {} is already reserved between {} and {}",
                plate, start_date, end_date
            )));
        }

        let model = tx.get_car_model(model_id).await?;
        let price_per_liter = tx.get_fuel_price(model.fuel_type()).await?;

        // The check above is advisory only: a concurrent transaction may still win the same
        // dates, in which case the insertion trips the schema's overlap constraint.
        match tx.put_reservation(customer, plate, start_date, end_date).await {
            Ok(_id) => (),
            Err(DbError::AlreadyExists) => {
                return Err(RentalError::VehicleUnavailable(format!(
                    "Vehicle {} is already reserved between {} and {}",
                    plate, start_date, end_date
                )))
            }
            Err(e) => return Err(e.into()),
        }

        let rental = (model.price_per_day() * Decimal::from(days)).round_dp(2);
        let deposit = (price_per_liter * model.tank_capacity()).round_dp(2);

        let invoice = tx.put_invoice(customer, rental + deposit).await?;
        tx.put_invoice_line(invoice, &rental_description(days, &model), rental).await?;
        tx.put_invoice_line(invoice, &deposit_description(&model), deposit).await?;

        tx.commit().await?;
        Ok(())
    }
}
