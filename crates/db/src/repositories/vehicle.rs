use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};

use carlot_core::domain::filters::{FilterMap, FilterValue};
use carlot_core::domain::vehicle::Vehicle;

use super::{RepositoryError, VehicleRepository};
use crate::DbPool;

/// Keys matched by substring against a text column.
const TEXT_KEYS: &[&str] = &["brand", "model", "fuel", "color", "transmission"];

const SELECT_COLUMNS: &str = "SELECT id, brand, model, year, motorization, fuel, color, \
     mileage, doors, transmission, price, air_conditioning, electric_steering, status \
     FROM vehicle";

pub struct SqlVehicleRepository {
    pool: DbPool,
}

impl SqlVehicleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// A vehicle about to be inserted; the store assigns the id.
#[derive(Clone, Debug)]
pub struct NewVehicle {
    pub brand: String,
    pub model: String,
    pub year: i64,
    pub motorization: f64,
    pub fuel: String,
    pub color: String,
    pub mileage: f64,
    pub doors: i64,
    pub transmission: String,
    pub price: f64,
    pub air_conditioning: bool,
    pub electric_steering: bool,
    pub status: String,
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: i64,
    brand: String,
    model: String,
    year: i64,
    motorization: f64,
    fuel: String,
    color: String,
    mileage: f64,
    doors: i64,
    transmission: String,
    price: f64,
    air_conditioning: bool,
    electric_steering: bool,
    status: String,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Vehicle {
            id: row.id,
            brand: row.brand,
            model: row.model,
            year: row.year,
            motorization: row.motorization,
            fuel: row.fuel,
            color: row.color,
            mileage: row.mileage,
            doors: row.doors,
            transmission: row.transmission,
            price: row.price,
            air_conditioning: row.air_conditioning,
            electric_steering: row.electric_steering,
            status: row.status,
        }
    }
}

#[async_trait]
impl VehicleRepository for SqlVehicleRepository {
    async fn search(&self, filters: &FilterMap) -> Result<Vec<Vehicle>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        let mut has_condition = false;

        for key in TEXT_KEYS {
            let Some(value) = filters.get(*key) else { continue };
            match value {
                FilterValue::Text(text) => {
                    push_separator(&mut builder, &mut has_condition);
                    push_substring_match(&mut builder, key, text);
                }
                FilterValue::Number(number) => {
                    push_separator(&mut builder, &mut has_condition);
                    push_substring_match(&mut builder, key, &number.to_string());
                }
                FilterValue::List(items) if !items.is_empty() => {
                    push_separator(&mut builder, &mut has_condition);
                    builder.push("(");
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            builder.push(" OR ");
                        }
                        push_substring_match(&mut builder, key, item);
                    }
                    builder.push(")");
                }
                FilterValue::List(_) | FilterValue::Flag(_) => {}
            }
        }

        push_bound(&mut builder, &mut has_condition, filters, "year_min", "year >= ");
        push_bound(&mut builder, &mut has_condition, filters, "year_max", "year <= ");
        push_bound(&mut builder, &mut has_condition, filters, "price_min", "price >= ");
        push_bound(&mut builder, &mut has_condition, filters, "price_max", "price <= ");

        builder.push(" ORDER BY id");

        let rows = builder.build_query_as::<VehicleRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    async fn insert_many(&self, vehicles: &[NewVehicle]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for vehicle in vehicles {
            let result = sqlx::query(
                "INSERT INTO vehicle (brand, model, year, motorization, fuel, color, mileage, \
                 doors, transmission, price, air_conditioning, electric_steering, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )
            .bind(&vehicle.brand)
            .bind(&vehicle.model)
            .bind(vehicle.year)
            .bind(vehicle.motorization)
            .bind(&vehicle.fuel)
            .bind(&vehicle.color)
            .bind(vehicle.mileage)
            .bind(vehicle.doors)
            .bind(&vehicle.transmission)
            .bind(vehicle.price)
            .bind(vehicle.air_conditioning)
            .bind(vehicle.electric_steering)
            .bind(&vehicle.status)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicle")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_separator(builder: &mut QueryBuilder<'_, Sqlite>, has_condition: &mut bool) {
    if *has_condition {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *has_condition = true;
    }
}

fn push_substring_match(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, needle: &str) {
    // `column` only ever comes from TEXT_KEYS, never from user input.
    builder.push("LOWER(");
    builder.push(column);
    builder.push(") LIKE ");
    builder.push_bind(format!("%{}%", needle.to_lowercase()));
}

fn push_bound(
    builder: &mut QueryBuilder<'_, Sqlite>,
    has_condition: &mut bool,
    filters: &FilterMap,
    key: &str,
    comparison: &str,
) {
    let Some(bound) = filters.get(key).and_then(FilterValue::as_number) else {
        return;
    };
    push_separator(builder, has_condition);
    builder.push(comparison);
    builder.push_bind(bound);
}
