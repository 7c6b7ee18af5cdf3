use crate::{
    error::Result,
    schema::{cars, customers, employees, sales},
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = sales)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Sale {
    pub id: i32,
    pub car_id: i32,
    pub customer_id: i32,
    pub employee_id: i32,
    pub date: NaiveDateTime,
    pub price: f64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sales)]
pub struct NewSale {
    pub car_id: i32,
    pub customer_id: i32,
    pub employee_id: i32,
    pub date: NaiveDateTime,
    pub price: f64,
    pub created_at: NaiveDateTime,
}

/// A sale joined with the display fields of the records it points at.
#[derive(Debug, Clone, PartialEq, Queryable, Serialize)]
pub struct SaleSummary {
    pub id: i32,
    pub make: String,
    pub model: String,
    pub customer: String,
    pub employee: String,
    pub date: NaiveDateTime,
    pub price: f64,
}

impl Display for SaleSummary {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "Sale {}: Car {} {} sold to {} by {} on {}",
            self.id,
            self.make,
            self.model,
            self.customer,
            self.employee,
            self.date.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// The three references a new sale needs, asked for in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleField {
    Car,
    Customer,
    Employee,
}

impl SaleField {
    pub fn prompt(&self) -> &'static str {
        match self {
            SaleField::Car => "Enter Car ID (must be a sold car)",
            SaleField::Customer => "Enter Customer ID",
            SaleField::Employee => "Enter Employee ID",
        }
    }

    pub fn rejection(&self) -> &'static str {
        match self {
            SaleField::Car => "Car not found or is not sold. Please enter a valid sold car ID.",
            SaleField::Customer => "Customer not found. Please enter a valid customer ID.",
            SaleField::Employee => "Employee not found. Please enter a valid employee ID.",
        }
    }
}

/// Where the sale workflow gets candidate ids from.
///
/// The workflow keeps asking until an id checks out, so an implementation
/// must eventually return an error (for example at end of input) if it has
/// nothing left to offer.
pub trait IdSource {
    fn next_id(&mut self, field: SaleField) -> Result<i32>;

    fn rejected(&mut self, field: SaleField) -> Result<()>;
}

impl Sale {
    pub fn find(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Sale>> {
        sales::table
            .find(id)
            .select(Sale::as_select())
            .first(conn)
            .optional()
    }

    pub fn summaries(conn: &mut SqliteConnection) -> QueryResult<Vec<SaleSummary>> {
        sales::table
            .inner_join(cars::table)
            .inner_join(customers::table)
            .inner_join(employees::table)
            .select((
                sales::id,
                cars::make,
                cars::model,
                customers::name,
                employees::name,
                sales::date,
                sales::price,
            ))
            .order(sales::id.asc())
            .load(conn)
    }

    pub fn insert(conn: &mut SqliteConnection, sale: &NewSale) -> QueryResult<Sale> {
        diesel::insert_into(sales::table)
            .values(sale)
            .returning(Sale::as_returning())
            .get_result(conn)
    }

    pub fn delete(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
        diesel::delete(sales::table.find(id)).execute(conn)
    }
}
