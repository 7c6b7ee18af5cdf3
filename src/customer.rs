use crate::schema::{customers, sales};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: NaiveDateTime,
}

impl Display for Customer {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} | Email: {} | Phone: {}",
            self.id, self.name, self.email, self.phone
        )
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = customers)]
pub struct CustomerChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

impl Customer {
    pub fn find(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Customer>> {
        customers::table
            .find(id)
            .select(Customer::as_select())
            .first(conn)
            .optional()
    }

    pub fn list(conn: &mut SqliteConnection) -> QueryResult<Vec<Customer>> {
        customers::table
            .select(Customer::as_select())
            .order(customers::id.asc())
            .load(conn)
    }

    pub fn insert(conn: &mut SqliteConnection, customer: &NewCustomer) -> QueryResult<Customer> {
        diesel::insert_into(customers::table)
            .values(customer)
            .returning(Customer::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut SqliteConnection,
        id: i32,
        changes: &CustomerChanges,
    ) -> QueryResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        diesel::update(customers::table.find(id))
            .set(changes)
            .execute(conn)
    }

    pub fn delete(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
        diesel::delete(customers::table.find(id)).execute(conn)
    }

    pub fn sale_count(conn: &mut SqliteConnection, id: i32) -> QueryResult<i64> {
        sales::table
            .filter(sales::customer_id.eq(id))
            .count()
            .get_result(conn)
    }
}
