use crate::schema::{cars, sales};
use chrono::NaiveDateTime;
use diesel::{
    backend::Backend,
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
    sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    Available,
    Sold,
}

impl CarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::Sold => "sold",
        }
    }
}

impl Display for CarStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CarStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "available" => Ok(CarStatus::Available),
            "sold" => Ok(CarStatus::Sold),
            other => Err(format!("unknown car status '{}'", other)),
        }
    }
}

impl ToSql<Text, Sqlite> for CarStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for CarStatus {
    fn from_sql(value: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(value)?;
        Ok(text.parse()?)
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = cars)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Car {
    pub id: i32,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub status: CarStatus,
    pub created_at: NaiveDateTime,
}

impl Display for Car {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} {} ({}) - ${:.2} [{}]",
            self.id, self.make, self.model, self.year, self.price, self.status
        )
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cars)]
pub struct NewCar {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub status: CarStatus,
    pub created_at: NaiveDateTime,
}

/// Column values to overwrite; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = cars)]
pub struct CarChanges {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub status: Option<CarStatus>,
}

impl CarChanges {
    pub fn is_empty(&self) -> bool {
        self.make.is_none()
            && self.model.is_none()
            && self.year.is_none()
            && self.price.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CarFilter {
    pub make: Option<String>,
    pub status: Option<CarStatus>,
}

fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl Car {
    pub fn find(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Car>> {
        cars::table
            .find(id)
            .select(Car::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_sold(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Car>> {
        cars::table
            .filter(cars::id.eq(id))
            .filter(cars::status.eq(CarStatus::Sold))
            .select(Car::as_select())
            .first(conn)
            .optional()
    }

    /// SQLite `LIKE` folds ASCII case, which covers the make filter.
    pub fn list(conn: &mut SqliteConnection, filter: &CarFilter) -> QueryResult<Vec<Car>> {
        let mut query = cars::table.select(Car::as_select()).into_boxed();
        if let Some(make) = &filter.make {
            query = query.filter(cars::make.like(like_pattern(make)).escape('\\'));
        }
        if let Some(status) = filter.status {
            query = query.filter(cars::status.eq(status));
        }
        query.order(cars::id.asc()).load(conn)
    }

    pub fn insert(conn: &mut SqliteConnection, car: &NewCar) -> QueryResult<Car> {
        diesel::insert_into(cars::table)
            .values(car)
            .returning(Car::as_returning())
            .get_result(conn)
    }

    pub fn update(conn: &mut SqliteConnection, id: i32, changes: &CarChanges) -> QueryResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        diesel::update(cars::table.find(id)).set(changes).execute(conn)
    }

    pub fn set_status(conn: &mut SqliteConnection, id: i32, status: CarStatus) -> QueryResult<usize> {
        diesel::update(cars::table.find(id))
            .set(cars::status.eq(status))
            .execute(conn)
    }

    pub fn delete(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
        diesel::delete(cars::table.find(id)).execute(conn)
    }

    pub fn sale_count(conn: &mut SqliteConnection, id: i32) -> QueryResult<i64> {
        sales::table
            .filter(sales::car_id.eq(id))
            .count()
            .get_result(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_its_own_rendering() {
        for status in [CarStatus::Available, CarStatus::Sold] {
            assert_eq!(status.as_str().parse::<CarStatus>(), Ok(status));
        }
        assert!("reserved".parse::<CarStatus>().is_err());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("toy"), "%toy%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn car_line_shows_price_with_cents() {
        let car = Car {
            id: 7,
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            price: 18000.0,
            status: CarStatus::Available,
            created_at: NaiveDateTime::default(),
        };
        assert_eq!(car.to_string(), "7: Toyota Corolla (2020) - $18000.00 [available]");
    }
}
