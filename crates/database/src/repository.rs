use std::sync::Arc;

use core_types::{format_datetime, parse_datetime, Flight, NewFlight};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::connection::{live, SharedConnection};
use crate::error::DbError;

/// Validated CRUD over the flight catalog. The repository is the sole writer
/// of the `flight` table.
pub struct FlightRepository {
    conn: Arc<SharedConnection>,
}

impl FlightRepository {
    pub(crate) fn new(conn: Arc<SharedConnection>) -> Self {
        Self { conn }
    }

    /// Fetches the whole catalog, most recent departure first.
    pub async fn query_all(&self) -> Result<Vec<Flight>, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        let rows = sqlx::query(
            "SELECT flight_id, departure, destination, depart_time, arrive_time, \
                    price, total_seats, remain_seats \
             FROM flight ORDER BY depart_time DESC",
        )
        .fetch_all(&mut *conn)
        .await?;

        let flights = rows
            .into_iter()
            .map(flight_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(count = flights.len(), "flight catalog queried");
        Ok(flights)
    }

    /// Fetches a single flight by its id.
    pub async fn query_by_id(&self, flight_id: &str) -> Result<Flight, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        let row = sqlx::query(
            "SELECT flight_id, departure, destination, depart_time, arrive_time, \
                    price, total_seats, remain_seats \
             FROM flight WHERE flight_id = ?",
        )
        .bind(flight_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(flight_from_row).ok_or(DbError::NotFound)?
    }

    /// Validates and stores a new catalog entry, returning the stored flight.
    ///
    /// Validation short-circuits on the first failure; the uniqueness probe
    /// runs only after every field check has passed, and nothing is written
    /// unless the probe finds no existing row.
    pub async fn add(&self, new: &NewFlight) -> Result<Flight, DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        let flight = validate_new_flight(new)?;

        let existing = sqlx::query("SELECT flight_id FROM flight WHERE flight_id = ?")
            .bind(&flight.flight_id)
            .fetch_optional(&mut *conn)
            .await?;
        if existing.is_some() {
            return Err(DbError::Conflict(format!(
                "flight {} already exists",
                flight.flight_id
            )));
        }

        sqlx::query(
            "INSERT INTO flight (flight_id, departure, destination, depart_time, \
                                 arrive_time, price, total_seats, remain_seats) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&flight.flight_id)
        .bind(&flight.departure)
        .bind(&flight.destination)
        .bind(format_datetime(flight.depart_time))
        .bind(format_datetime(flight.arrive_time))
        .bind(flight.price.to_string())
        .bind(flight.total_seats)
        .bind(flight.remain_seats)
        .execute(&mut *conn)
        .await?;

        tracing::info!(flight_id = %flight.flight_id, "flight added");
        Ok(flight)
    }

    /// Re-prices a flight. Zero affected rows means the flight is unknown.
    pub async fn update_price(&self, flight_id: &str, new_price: Decimal) -> Result<(), DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        if new_price <= Decimal::ZERO {
            return Err(DbError::Validation(
                "price must be greater than zero".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE flight SET price = ? WHERE flight_id = ?")
            .bind(new_price.to_string())
            .bind(flight_id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        tracing::info!(%flight_id, %new_price, "flight price updated");
        Ok(())
    }

    /// Updates the remaining-seat count, holding `0 <= remaining <= total`.
    ///
    /// The stored total is fetched first so the bound can be checked before
    /// any write happens.
    pub async fn update_seats(&self, flight_id: &str, new_remain: i64) -> Result<(), DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        let row = sqlx::query("SELECT total_seats FROM flight WHERE flight_id = ?")
            .bind(flight_id)
            .fetch_optional(&mut *conn)
            .await?;
        let total_seats: i64 = match row {
            Some(row) => row.try_get("total_seats")?,
            None => return Err(DbError::NotFound),
        };

        if new_remain < 0 || new_remain > total_seats {
            return Err(DbError::Validation(format!(
                "remaining seats must be between 0 and {total_seats}"
            )));
        }

        let result = sqlx::query("UPDATE flight SET remain_seats = ? WHERE flight_id = ?")
            .bind(new_remain)
            .bind(flight_id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        tracing::info!(%flight_id, new_remain, "flight seats updated");
        Ok(())
    }

    /// Removes a flight. Zero affected rows means the flight is unknown.
    pub async fn delete(&self, flight_id: &str) -> Result<(), DbError> {
        let mut guard = self.conn.lock().await;
        let conn = live(&mut guard)?;

        let result = sqlx::query("DELETE FROM flight WHERE flight_id = ?")
            .bind(flight_id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        tracing::info!(%flight_id, "flight deleted");
        Ok(())
    }
}

/// Field checks in contract order, each with its own message.
fn validate_new_flight(new: &NewFlight) -> Result<Flight, DbError> {
    if new.flight_id.is_empty() || new.departure.is_empty() || new.destination.is_empty() {
        return Err(DbError::Validation(
            "flight id, departure and destination are required".to_string(),
        ));
    }

    let depart_time = parse_datetime(&new.depart_time).map_err(|_| {
        DbError::Validation("depart time must use the YYYY-MM-DD HH:MM:SS format".to_string())
    })?;
    let arrive_time = parse_datetime(&new.arrive_time).map_err(|_| {
        DbError::Validation("arrive time must use the YYYY-MM-DD HH:MM:SS format".to_string())
    })?;
    if depart_time >= arrive_time {
        return Err(DbError::Validation(
            "departure must be earlier than arrival".to_string(),
        ));
    }

    if new.price <= Decimal::ZERO {
        return Err(DbError::Validation(
            "price must be greater than zero".to_string(),
        ));
    }

    if new.total_seats <= 0 || new.remain_seats < 0 || new.remain_seats > new.total_seats {
        return Err(DbError::Validation(
            "seat counts are invalid: total must be positive and remaining between 0 and total"
                .to_string(),
        ));
    }

    Ok(Flight {
        flight_id: new.flight_id.clone(),
        departure: new.departure.clone(),
        destination: new.destination.clone(),
        depart_time,
        arrive_time,
        price: new.price,
        total_seats: new.total_seats,
        remain_seats: new.remain_seats,
    })
}

/// Maps a `flight` row back into the domain struct. Timestamps and prices
/// are stored as text, so a row that fails to parse is a decode error, not
/// a driver error.
fn flight_from_row(row: SqliteRow) -> Result<Flight, DbError> {
    let depart_time: String = row.try_get("depart_time")?;
    let arrive_time: String = row.try_get("arrive_time")?;
    let price: String = row.try_get("price")?;

    Ok(Flight {
        flight_id: row.try_get("flight_id")?,
        departure: row.try_get("departure")?,
        destination: row.try_get("destination")?,
        depart_time: parse_datetime(&depart_time)
            .map_err(|e| DbError::Decode(format!("depart_time: {e}")))?,
        arrive_time: parse_datetime(&arrive_time)
            .map_err(|e| DbError::Decode(format!("arrive_time: {e}")))?,
        price: price
            .parse()
            .map_err(|e| DbError::Decode(format!("price: {e}")))?,
        total_seats: row.try_get("total_seats")?,
        remain_seats: row.try_get("remain_seats")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;

    async fn connected() -> Services {
        let services = Services::new("sqlite::memory:");
        services.connection.connect().await.unwrap();
        services
    }

    fn sample_flight() -> NewFlight {
        NewFlight {
            flight_id: "CA1234".to_string(),
            departure: "Beijing".to_string(),
            destination: "Shanghai".to_string(),
            depart_time: "2024-01-01 08:00:00".to_string(),
            arrive_time: "2024-01-01 10:00:00".to_string(),
            price: Decimal::from(500),
            total_seats: 100,
            remain_seats: 100,
        }
    }

    #[tokio::test]
    async fn add_then_query_round_trips() {
        let services = connected().await;
        let stored = services.flights.add(&sample_flight()).await.unwrap();

        let fetched = services.flights.query_by_id("CA1234").await.unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.departure, "Beijing");
        assert_eq!(fetched.destination, "Shanghai");
        assert_eq!(fetched.price, Decimal::from(500));
        assert_eq!(fetched.total_seats, 100);
        assert_eq!(fetched.remain_seats, 100);
    }

    #[tokio::test]
    async fn operations_require_a_live_connection() {
        let services = Services::new("sqlite::memory:");
        assert!(matches!(
            services.flights.query_all().await,
            Err(DbError::NotConnected)
        ));
        assert!(matches!(
            services.flights.add(&sample_flight()).await,
            Err(DbError::NotConnected)
        ));
        assert!(matches!(
            services.flights.delete("CA1234").await,
            Err(DbError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn add_rejects_reversed_schedule() {
        let services = connected().await;
        let mut flight = sample_flight();
        flight.depart_time = "2024-01-01 12:00:00".to_string();
        flight.arrive_time = "2024-01-01 10:00:00".to_string();

        assert!(matches!(
            services.flights.add(&flight).await,
            Err(DbError::Validation(_))
        ));
        // Nothing was inserted.
        assert!(matches!(
            services.flights.query_by_id("CA1234").await,
            Err(DbError::NotFound)
        ));
    }

    #[tokio::test]
    async fn add_validates_fields_in_order() {
        let services = connected().await;

        let mut flight = sample_flight();
        flight.departure = String::new();
        assert!(matches!(
            services.flights.add(&flight).await,
            Err(DbError::Validation(_))
        ));

        let mut flight = sample_flight();
        flight.depart_time = "01/01/2024 08:00".to_string();
        assert!(matches!(
            services.flights.add(&flight).await,
            Err(DbError::Validation(_))
        ));

        let mut flight = sample_flight();
        flight.price = Decimal::ZERO;
        assert!(matches!(
            services.flights.add(&flight).await,
            Err(DbError::Validation(_))
        ));

        let mut flight = sample_flight();
        flight.remain_seats = 101;
        assert!(matches!(
            services.flights.add(&flight).await,
            Err(DbError::Validation(_))
        ));

        let mut flight = sample_flight();
        flight.total_seats = 0;
        flight.remain_seats = 0;
        assert!(matches!(
            services.flights.add(&flight).await,
            Err(DbError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_flight_id_conflicts_and_keeps_original() {
        let services = connected().await;
        services.flights.add(&sample_flight()).await.unwrap();

        let mut second = sample_flight();
        second.destination = "Guangzhou".to_string();
        assert!(matches!(
            services.flights.add(&second).await,
            Err(DbError::Conflict(_))
        ));

        let stored = services.flights.query_by_id("CA1234").await.unwrap();
        assert_eq!(stored.destination, "Shanghai");
        assert_eq!(services.flights.query_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn query_all_orders_by_departure_descending() {
        let services = connected().await;
        services.flights.add(&sample_flight()).await.unwrap();

        let mut later = sample_flight();
        later.flight_id = "MU5678".to_string();
        later.depart_time = "2024-02-01 08:00:00".to_string();
        later.arrive_time = "2024-02-01 11:00:00".to_string();
        services.flights.add(&later).await.unwrap();

        let flights = services.flights.query_all().await.unwrap();
        assert_eq!(flights.len(), 2);
        assert_eq!(flights[0].flight_id, "MU5678");
        assert_eq!(flights[1].flight_id, "CA1234");
    }

    #[tokio::test]
    async fn update_price_three_way_outcomes() {
        let services = connected().await;
        services.flights.add(&sample_flight()).await.unwrap();

        assert!(matches!(
            services.flights.update_price("CA1234", Decimal::ZERO).await,
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            services
                .flights
                .update_price("ZZ9999", Decimal::from(400))
                .await,
            Err(DbError::NotFound)
        ));

        services
            .flights
            .update_price("CA1234", Decimal::from(450))
            .await
            .unwrap();
        let stored = services.flights.query_by_id("CA1234").await.unwrap();
        assert_eq!(stored.price, Decimal::from(450));
    }

    #[tokio::test]
    async fn update_seats_enforces_capacity() {
        let services = connected().await;
        services.flights.add(&sample_flight()).await.unwrap();

        // Unknown flight: not-found, nothing written.
        assert!(matches!(
            services.flights.update_seats("ZZ9999", 10).await,
            Err(DbError::NotFound)
        ));

        // Over capacity: validation failure, stored value untouched.
        assert!(matches!(
            services.flights.update_seats("CA1234", 150).await,
            Err(DbError::Validation(_))
        ));
        let stored = services.flights.query_by_id("CA1234").await.unwrap();
        assert_eq!(stored.remain_seats, 100);

        services.flights.update_seats("CA1234", 42).await.unwrap();
        let stored = services.flights.query_by_id("CA1234").await.unwrap();
        assert_eq!(stored.remain_seats, 42);

        // Zero is a legal remaining count.
        services.flights.update_seats("CA1234", 0).await.unwrap();
    }

    #[tokio::test]
    async fn delete_semantics() {
        let services = connected().await;
        services.flights.add(&sample_flight()).await.unwrap();

        assert!(matches!(
            services.flights.delete("ZZ9999").await,
            Err(DbError::NotFound)
        ));
        assert_eq!(services.flights.query_all().await.unwrap().len(), 1);

        services.flights.delete("CA1234").await.unwrap();
        assert!(matches!(
            services.flights.query_by_id("CA1234").await,
            Err(DbError::NotFound)
        ));
        assert!(services.flights.query_all().await.unwrap().is_empty());
    }
}
