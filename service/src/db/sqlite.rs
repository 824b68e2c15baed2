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

//! Implementation of the database abstraction using SQLite.

use crate::db::Tx;
use crate::model::*;
use futures::lock::Mutex;
use rentacar_core::db::{BareTx, DbError, DbResult};
use rentacar_sqlite::{
    build_date, build_money, map_sqlx_error, run_schema, unpack_date, unpack_money,
};
use rust_decimal::Decimal;
use sqlx::{Row, Sqlite, Transaction};
use time::Date;

/// Schema to use to initialize the test database.
const SCHEMA: &str = include_str!("sqlite.sql");

/// A transaction backed by a SQLite database.
pub(crate) struct SqliteTx {
    /// Inner transaction type to obtain access to the raw sqlx transaction.
    tx: Mutex<Transaction<'static, Sqlite>>,
}

impl From<Mutex<Transaction<'static, Sqlite>>> for SqliteTx {
    fn from(tx: Mutex<Transaction<'static, Sqlite>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl BareTx for SqliteTx {
    async fn commit(mut self) -> DbResult<()> {
        let tx = self.tx.into_inner();
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn migrate(&mut self) -> DbResult<()> {
        run_schema(&mut self.tx, SCHEMA).await
    }
}

#[async_trait::async_trait]
impl Tx for SqliteTx {
    async fn put_customer(&mut self, nif: &Nif) -> DbResult<()> {
        let mut tx = self.tx.lock().await;

        let query_str = "INSERT INTO customers (nif) VALUES (?)";
        let done = sqlx::query(query_str)
            .bind(nif.as_str())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insert affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn customer_exists(&mut self, nif: &Nif) -> DbResult<bool> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT nif FROM customers WHERE nif = ?";
        let maybe_row = sqlx::query(query_str)
            .bind(nif.as_str())
            .fetch_optional(&mut **tx)
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
        let mut tx = self.tx.lock().await;

        let query_str = "
            INSERT INTO models (name, price_per_day, tank_capacity, fuel_type)
            VALUES (?, ?, ?, ?)
        ";
        let done = sqlx::query(query_str)
            .bind(name)
            .bind(unpack_money(price_per_day))
            .bind(unpack_money(tank_capacity))
            .bind(fuel_type.as_str())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(ModelId::from_i64(done.last_insert_rowid())?)
    }

    async fn get_car_model(&mut self, id: ModelId) -> DbResult<CarModel> {
        let mut tx = self.tx.lock().await;

        let query_str = "
            SELECT name, price_per_day, tank_capacity, fuel_type
            FROM models WHERE model_id = ?
        ";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(map_sqlx_error)?;
        let price_per_day: String = row.try_get("price_per_day").map_err(map_sqlx_error)?;
        let tank_capacity: String = row.try_get("tank_capacity").map_err(map_sqlx_error)?;
        let fuel_type: String = row.try_get("fuel_type").map_err(map_sqlx_error)?;

        Ok(CarModel::new(
            name,
            build_money(&price_per_day)?,
            build_money(&tank_capacity)?,
            FuelType::new(fuel_type)?,
        ))
    }

    async fn put_vehicle(&mut self, plate: &Plate, model: ModelId) -> DbResult<()> {
        let mut tx = self.tx.lock().await;

        let query_str = "INSERT INTO vehicles (plate, model_id) VALUES (?, ?)";
        let done = sqlx::query(query_str)
            .bind(plate.as_str())
            .bind(model.as_i64())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insert affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn find_vehicle(&mut self, plate: &Plate) -> DbResult<Option<ModelId>> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT model_id FROM vehicles WHERE plate = ?";
        let maybe_row = sqlx::query(query_str)
            .bind(plate.as_str())
            .fetch_optional(&mut **tx)
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
        let mut tx = self.tx.lock().await;

        let query_str = "
            INSERT INTO fuel_prices (fuel_type, price_per_liter)
            VALUES (?, ?)
            ON CONFLICT (fuel_type) DO UPDATE SET price_per_liter = excluded.price_per_liter
        ";
        let done = sqlx::query(query_str)
            .bind(fuel_type.as_str())
            .bind(unpack_money(price_per_liter))
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Upsert affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn get_fuel_price(&mut self, fuel_type: &FuelType) -> DbResult<Decimal> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT price_per_liter FROM fuel_prices WHERE fuel_type = ?";
        let row = sqlx::query(query_str)
            .bind(fuel_type.as_str())
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        let price: String = row.try_get("price_per_liter").map_err(map_sqlx_error)?;
        build_money(&price)
    }

    async fn vehicle_booked(
        &mut self,
        plate: &Plate,
        start_date: Date,
        end_date: Date,
    ) -> DbResult<bool> {
        let mut tx = self.tx.lock().await;

        let query_str = "
            SELECT reservation_id FROM reservations
            WHERE plate = ? AND start_date < ? AND end_date > ?
            LIMIT 1
        ";
        let maybe_row = sqlx::query(query_str)
            .bind(plate.as_str())
            .bind(unpack_date(end_date))
            .bind(unpack_date(start_date))
            .fetch_optional(&mut **tx)
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
        let mut tx = self.tx.lock().await;

        let query_str = "
            INSERT INTO reservations (customer_nif, plate, start_date, end_date)
            VALUES (?, ?, ?, ?)
        ";
        let done = sqlx::query(query_str)
            .bind(customer.as_str())
            .bind(plate.as_str())
            .bind(unpack_date(start_date))
            .bind(unpack_date(end_date))
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(ReservationId::from_i64(done.last_insert_rowid())?)
    }

    async fn get_reservations(&mut self, plate: &Plate) -> DbResult<Vec<Reservation>> {
        let mut tx = self.tx.lock().await;

        let query_str = "
            SELECT reservation_id, customer_nif, start_date, end_date
            FROM reservations
            WHERE plate = ?
            ORDER BY start_date
        ";
        let rows = sqlx::query(query_str)
            .bind(plate.as_str())
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        let mut reservations = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("reservation_id").map_err(map_sqlx_error)?;
            let customer: String = row.try_get("customer_nif").map_err(map_sqlx_error)?;
            let start_date: String = row.try_get("start_date").map_err(map_sqlx_error)?;
            let end_date: String = row.try_get("end_date").map_err(map_sqlx_error)?;
            reservations.push(Reservation::new(
                ReservationId::from_i64(id)?,
                Nif::new(customer)?,
                plate.clone(),
                build_date(&start_date)?,
                build_date(&end_date)?,
            ));
        }
        Ok(reservations)
    }

    async fn put_invoice(&mut self, customer: &Nif, amount: Decimal) -> DbResult<InvoiceNumber> {
        let mut tx = self.tx.lock().await;

        let query_str = "INSERT INTO invoices (amount, customer_nif) VALUES (?, ?)";
        let done = sqlx::query(query_str)
            .bind(unpack_money(amount))
            .bind(customer.as_str())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(InvoiceNumber::from_i64(done.last_insert_rowid())?)
    }

    async fn get_invoices(&mut self, customer: &Nif) -> DbResult<Vec<Invoice>> {
        let mut tx = self.tx.lock().await;

        let query_str = "
            SELECT invoice_number, amount
            FROM invoices
            WHERE customer_nif = ?
            ORDER BY invoice_number
        ";
        let rows = sqlx::query(query_str)
            .bind(customer.as_str())
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let number: i64 = row.try_get("invoice_number").map_err(map_sqlx_error)?;
            let amount: String = row.try_get("amount").map_err(map_sqlx_error)?;
            invoices.push(Invoice::new(
                InvoiceNumber::from_i64(number)?,
                customer.clone(),
                build_money(&amount)?,
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
        let mut tx = self.tx.lock().await;

        let query_str = "
            INSERT INTO invoice_lines (invoice_number, description, amount)
            VALUES (?, ?, ?)
        ";
        let done = sqlx::query(query_str)
            .bind(invoice.as_i64())
            .bind(description)
            .bind(unpack_money(amount))
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insert affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn get_invoice_lines(&mut self, invoice: InvoiceNumber) -> DbResult<Vec<InvoiceLine>> {
        let mut tx = self.tx.lock().await;

        let query_str = "
            SELECT description, amount
            FROM invoice_lines
            WHERE invoice_number = ?
            ORDER BY rowid
        ";
        let rows = sqlx::query(query_str)
            .bind(invoice.as_i64())
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let description: String = row.try_get("description").map_err(map_sqlx_error)?;
            let amount: String = row.try_get("amount").map_err(map_sqlx_error)?;
            lines.push(InvoiceLine::new(description, build_money(&amount)?));
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::generate_db_tests;

    generate_db_tests!(rentacar_sqlite::testutils::setup::<SqliteTx>().await);
}
