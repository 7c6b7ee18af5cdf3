use crate::schema::{employees, sales};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Positions handed out to generated staff.
pub const POSITIONS: [&str; 4] = ["Manager", "Salesperson", "Technician", "Receptionist"];

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = employees)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Employee {
    pub id: i32,
    pub name: String,
    pub position: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Display for Employee {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {} | Position: {}", self.id, self.name, self.position)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = employees)]
pub struct NewEmployee {
    pub name: String,
    pub position: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = employees)]
pub struct EmployeeChanges {
    pub name: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl EmployeeChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.position.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

impl Employee {
    pub fn find(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Employee>> {
        employees::table
            .find(id)
            .select(Employee::as_select())
            .first(conn)
            .optional()
    }

    pub fn list(conn: &mut SqliteConnection) -> QueryResult<Vec<Employee>> {
        employees::table
            .select(Employee::as_select())
            .order(employees::id.asc())
            .load(conn)
    }

    pub fn insert(conn: &mut SqliteConnection, employee: &NewEmployee) -> QueryResult<Employee> {
        diesel::insert_into(employees::table)
            .values(employee)
            .returning(Employee::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut SqliteConnection,
        id: i32,
        changes: &EmployeeChanges,
    ) -> QueryResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        diesel::update(employees::table.find(id))
            .set(changes)
            .execute(conn)
    }

    pub fn delete(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
        diesel::delete(employees::table.find(id)).execute(conn)
    }

    pub fn sale_count(conn: &mut SqliteConnection, id: i32) -> QueryResult<i64> {
        sales::table
            .filter(sales::employee_id.eq(id))
            .count()
            .get_result(conn)
    }
}
