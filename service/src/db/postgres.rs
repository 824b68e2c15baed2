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

//! Implementation of the database abstraction using PostgreSQL.

use crate::db::Tx;
use crate::model::*;
use rentacar_core::db::{BareTx, DbError, DbResult};
use rentacar_postgres::{map_sqlx_error, run_schema};
use rust_decimal::Decimal;
use sqlx::{Postgres, Row, Transaction};
use time::Date;

/// Schema to use to initialize the production database.
const SCHEMA: &str = include_str!("postgres.sql");

/// A transaction backed by a PostgreSQL database.
pub struct PostgresTx {
    /// Inner transaction type to obtain access to the raw sqlx transaction.
    tx: Transaction<'static, Postgres>,
}

impl From<Transaction<'static, Postgres>> for PostgresTx {
    fn from(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl BareTx for PostgresTx {
    async fn commit(mut self) -> DbResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn migrate(&mut self) -> DbResult<()> {
        run_schema(&mut self.tx, SCHEMA).await
    }
}

#[async_trait::async_trait]
impl Tx for PostgresTx {
    async fn put_customer(&mut self, nif: &Nif) -> DbResult<()> {
        let query_str = "INSERT INTO customers (nif) VALUES ($1)";
        let done = sqlx::query(query_str)
            .bind(nif.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insert affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn customer_exists(&mut self, nif: &Nif) -> DbResult<bool> {
        let query_str = "SELECT nif FROM customers WHERE nif = $1";
        let maybe_row = sqlx::query(query_str)
            .bind(nif.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(maybe_row.is_some())
    }

    async fn put_model(
        &mut self,
        name: &str,
        price_per_day: Decimal,
        tank_capacity: Decimal,
        fuel_type: &FuelType,
    ) -> DbResult<ModelId> {
        let query_str = "
            INSERT INTO models (name, price_per_day, tank_capacity, fuel_type)
            VALUES ($1, $2, $3, $4)
            RETURNING model_id
        ";
        let row = sqlx::query(query_str)
            .bind(name)
            .bind(price_per_day)
            .bind(tank_capacity)
            .bind(fuel_type.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        let id: i64 = row.try_get("model_id").map_err(map_sqlx_error)?;
        Ok(ModelId::from_i64(id)?)
    }

    async fn get_car_model(&mut self, id: ModelId) -> DbResult<CarModel> {
        let query_str = "
            SELECT name, price_per_day, tank_capacity, fuel_type
            FROM models WHERE model_id = $1
        ";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(map_sqlx_error)?;
        let price_per_day: Decimal = row.try_get("price_per_day").map_err(map_sqlx_error)?;
        let tank_capacity: Decimal = row.try_get("tank_capacity").map_err(map_sqlx_error)?;
        let fuel_type: String = row.try_get("fuel_type").map_err(map_sqlx_error)?;

        Ok(CarModel::new(name, price_per_day, tank_capacity, FuelType::new(fuel_type)?))
    }

    async fn put_vehicle(&mut self, plate: &Plate, model: ModelId) -> DbResult<()> {
        let query_str = "INSERT INTO vehicles (plate, model_id) VALUES ($1, $2)";
        let done = sqlx::query(query_str)
            .bind(plate.as_str())
            .bind(model.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insert affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn find_vehicle(&mut self, plate: &Plate) -> DbResult<Option<ModelId>> {
        let query_str = "SELECT model_id FROM vehicles WHERE plate = $1";
        let maybe_row = sqlx::query(query_str)
            .bind(plate.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        match maybe_row {
            None => Ok(None),
            Some(row) => {
                let id: i64 = row.try_get("model_id").map_err(map_sqlx_error)?;
                Ok(Some(ModelId::from_i64(id)?))
            }
        }
    }

    async fn put_fuel_price(
        &mut self,
        fuel_type: &FuelType,
        price_per_liter: Decimal,
    ) -> DbResult<()> {
        let query_str = "
            INSERT INTO fuel_prices (fuel_type, price_per_liter)
            VALUES ($1, $2)
            ON CONFLICT (fuel_type) DO UPDATE SET price_per_liter = $2
        ";
        let done = sqlx::query(query_str)
            .bind(fuel_type.as_str())
            .bind(price_per_liter)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Upsert affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn get_fuel_price(&mut self, fuel_type: &FuelType) -> DbResult<Decimal> {
        let query_str = "SELECT price_per_liter FROM fuel_prices WHERE fuel_type = $1";
        let row = sqlx::query(query_str)
            .bind(fuel_type.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.try_get("price_per_liter").map_err(map_sqlx_error)
    }

    async fn vehicle_booked(
        &mut self,
        plate: &Plate,
        start_date: Date,
        end_date: Date,
    ) -> DbResult<bool> {
        let query_str = "
            SELECT reservation_id FROM reservations
            WHERE plate = $1 AND start_date < $2 AND end_date > $3
            LIMIT 1
        ";
        let maybe_row = sqlx::query(query_str)
            .bind(plate.as_str())
            .bind(end_date)
            .bind(start_date)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(maybe_row.is_some())
    }

    async fn put_reservation(
        &mut self,
        customer: &Nif,
        plate: &Plate,
        start_date: Date,
        end_date: Date,
    ) -> DbResult<ReservationId> {
        let query_str = "
            INSERT INTO reservations (customer_nif, plate, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING reservation_id
        ";
        let row = sqlx::query(query_str)
            .bind(customer.as_str())
            .bind(plate.as_str())
            .bind(start_date)
            .bind(end_date)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        let id: i64 = row.try_get("reservation_id").map_err(map_sqlx_error)?;
        Ok(ReservationId::from_i64(id)?)
    }

    async fn get_reservations(&mut self, plate: &Plate) -> DbResult<Vec<Reservation>> {
        let query_str = "
            SELECT reservation_id, customer_nif, start_date, end_date
            FROM reservations
            WHERE plate = $1
            ORDER BY start_date
        ";
        let rows = sqlx::query(query_str)
            .bind(plate.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        let mut reservations = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("reservation_id").map_err(map_sqlx_error)?;
            let customer: String = row.try_get("customer_nif").map_err(map_sqlx_error)?;
            let start_date: Date = row.try_get("start_date").map_err(map_sqlx_error)?;
            let end_date: Date = row.try_get("end_date").map_err(map_sqlx_error)?;
            reservations.push(Reservation::new(
                ReservationId::from_i64(id)?,
                Nif::new(customer)?,
                plate.clone(),
                start_date,
                end_date,
            ));
        }
        Ok(reservations)
    }

    async fn put_invoice(&mut self, customer: &Nif, amount: Decimal) -> DbResult<InvoiceNumber> {
        let query_str = "
            INSERT INTO invoices (amount, customer_nif)
            VALUES ($1, $2)
            RETURNING invoice_number
        ";
        let row = sqlx::query(query_str)
            .bind(amount)
            .bind(customer.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        let number: i64 = row.try_get("invoice_number").map_err(map_sqlx_error)?;
        Ok(InvoiceNumber::from_i64(number)?)
    }

    async fn get_invoices(&mut self, customer: &Nif) -> DbResult<Vec<Invoice>> {
        let query_str = "
            SELECT invoice_number, amount
            FROM invoices
            WHERE customer_nif = $1
            ORDER BY invoice_number
        ";
        let rows = sqlx::query(query_str)
            .bind(customer.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let number: i64 = row.try_get("invoice_number").map_err(map_sqlx_error)?;
            let amount: Decimal = row.try_get("amount").map_err(map_sqlx_error)?;
            invoices.push(Invoice::new(
                InvoiceNumber::from_i64(number)?,
                customer.clone(),
                amount,
            ));
        }
        Ok(invoices)
    }

    async fn put_invoice_line(
        &mut self,
        invoice: InvoiceNumber,
        description: &str,
        amount: Decimal,
    ) -> DbResult<()> {
        let query_str = "
            INSERT INTO invoice_lines (invoice_number, description, amount)
            VALUES ($1, $2, $3)
        ";
        let done = sqlx::query(query_str)
            .bind(invoice.as_i64())
            .bind(description)
            .bind(amount)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insert affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn get_invoice_lines(&mut self, invoice: InvoiceNumber) -> DbResult<Vec<InvoiceLine>> {
        let query_str = "
            SELECT description, amount
            FROM invoice_lines
            WHERE invoice_number = $1
            ORDER BY line_id
        ";
        let rows = sqlx::query(query_str)
            .bind(invoice.as_i64())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let description: String = row.try_get("description").map_err(map_sqlx_error)?;
            let amount: Decimal = row.try_get("amount").map_err(map_sqlx_error)?;
            lines.push(InvoiceLine::new(description, amount));
        }
        Ok(lines)
    }
}
