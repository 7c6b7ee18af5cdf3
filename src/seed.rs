//! Demo data generator.
//!
//! Wipes every table and refills it with random records. The random source
//! is passed in, so a seeded `StdRng` gives reproducible data while the CLI
//! uses the thread-local generator.

use crate::{
    car::{Car, CarStatus, NewCar},
    customer::{Customer, NewCustomer},
    employee::{Employee, NewEmployee, POSITIONS},
    error::Result,
    sale::{NewSale, Sale},
    schema::{cars, customers, employees, sales},
    store::Store,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use log::info;
use rand::{seq::SliceRandom, Rng};

const VEHICLES: [(&str, &[&str]); 8] = [
    ("Toyota", &["Corolla", "Camry", "RAV4", "Land Cruiser", "Hilux"]),
    ("Honda", &["Civic", "Accord", "CR-V", "Fit"]),
    ("Ford", &["Focus", "Ranger", "Everest", "Mustang"]),
    ("Nissan", &["X-Trail", "Navara", "Note", "Patrol"]),
    ("Subaru", &["Forester", "Outback", "Impreza"]),
    ("Mazda", &["Demio", "CX-5", "Axela"]),
    ("Volkswagen", &["Golf", "Polo", "Tiguan", "Amarok"]),
    ("Mercedes-Benz", &["C-Class", "E-Class", "GLE"]),
];

const FIRST_NAMES: [&str; 16] = [
    "Amina", "Brian", "Cynthia", "David", "Esther", "Felix", "Grace", "Hassan", "Irene", "James",
    "Wanjiru", "Kevin", "Lucy", "Mwangi", "Njeri", "Otieno",
];

const LAST_NAMES: [&str; 12] = [
    "Achieng", "Baraka", "Chege", "Kamau", "Kariuki", "Mutua", "Njoroge", "Odhiambo", "Omondi",
    "Wafula", "Wambui", "Ngugi",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCounts {
    pub cars: usize,
    pub customers: usize,
    pub employees: usize,
    pub sales: usize,
}

impl Default for SeedCounts {
    fn default() -> Self {
        SeedCounts {
            cars: 10,
            customers: 10,
            employees: 10,
            sales: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub cars: usize,
    pub sold_cars: usize,
    pub customers: usize,
    pub employees: usize,
    pub sales: usize,
}

/// How many of `cars` freshly generated cars start out sold: a third,
/// rounded down, but never fewer than one when there is a car at all.
pub fn sold_car_count(cars: usize) -> usize {
    (cars / 3).max(1).min(cars)
}

fn person_name<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, &'static str) {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Otieno");
    (first, last)
}

fn email(first: &str, last: &str, serial: usize, domain: &str) -> String {
    format!(
        "{}.{}{}@{}",
        first.to_lowercase(),
        last.to_lowercase(),
        serial,
        domain
    )
}

fn phone<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "+254 7{:02} {:03} {:03}",
        rng.gen_range(0..100),
        rng.gen_range(0..1000),
        rng.gen_range(0..1000)
    )
}

fn new_car<R: Rng + ?Sized>(rng: &mut R, status: CarStatus, at: NaiveDateTime) -> NewCar {
    let (make, models) = VEHICLES.choose(rng).copied().unwrap_or(VEHICLES[0]);
    let model = models.choose(rng).copied().unwrap_or(models[0]);
    NewCar {
        make: make.to_string(),
        model: model.to_string(),
        year: rng.gen_range(2005..=2024),
        price: f64::from(rng.gen_range(20_000..=150_000_i32)),
        status,
        created_at: at,
    }
}

fn new_customer<R: Rng + ?Sized>(rng: &mut R, serial: usize, at: NaiveDateTime) -> NewCustomer {
    let (first, last) = person_name(rng);
    NewCustomer {
        name: format!("{} {}", first, last),
        email: email(first, last, serial, "example.com"),
        phone: phone(rng),
        created_at: at,
    }
}

fn new_employee<R: Rng + ?Sized>(rng: &mut R, serial: usize, at: NaiveDateTime) -> NewEmployee {
    let (first, last) = person_name(rng);
    NewEmployee {
        name: format!("{} {}", first, last),
        position: POSITIONS.choose(rng).copied().unwrap_or(POSITIONS[1]).to_string(),
        email: email(first, last, serial, "safarimotors.example"),
        phone: Some(phone(rng)),
        created_at: at,
    }
}

/// Clear the store and fill it with generated records.
///
/// Each batch runs in its own nested transaction so its ids exist before the
/// next batch starts; the outer transaction makes the whole run atomic.
pub fn seed<R: Rng + ?Sized>(
    store: &mut Store,
    rng: &mut R,
    counts: &SeedCounts,
) -> Result<SeedReport> {
    store.transaction(|conn| {
        conn.transaction(|conn| -> Result<()> {
            diesel::delete(sales::table).execute(conn)?;
            diesel::delete(employees::table).execute(conn)?;
            diesel::delete(customers::table).execute(conn)?;
            diesel::delete(cars::table).execute(conn)?;
            Ok(())
        })?;
        info!("existing data cleared");

        let at = Utc::now().naive_utc();
        let sold = sold_car_count(counts.cars);

        let cars = conn.transaction(|conn| -> Result<Vec<Car>> {
            (0..counts.cars)
                .map(|i| -> Result<Car> {
                    let status = if i < sold {
                        CarStatus::Sold
                    } else {
                        CarStatus::Available
                    };
                    Ok(Car::insert(conn, &new_car(rng, status, at))?)
                })
                .collect()
        })?;
        info!(cars = cars.len(), sold = sold; "cars created");

        let customers = conn.transaction(|conn| -> Result<Vec<Customer>> {
            (0..counts.customers)
                .map(|i| -> Result<Customer> {
                    Ok(Customer::insert(conn, &new_customer(rng, i + 1, at))?)
                })
                .collect()
        })?;
        info!(customers = customers.len(); "customers created");

        let employees = conn.transaction(|conn| -> Result<Vec<Employee>> {
            (0..counts.employees)
                .map(|i| -> Result<Employee> {
                    Ok(Employee::insert(conn, &new_employee(rng, i + 1, at))?)
                })
                .collect()
        })?;
        info!(employees = employees.len(); "employees created");

        let sold_cars: Vec<&Car> = cars
            .iter()
            .filter(|car| car.status == CarStatus::Sold)
            .collect();
        let sale_count = counts
            .sales
            .min(sold_cars.len())
            .min(customers.len())
            .min(employees.len());

        let sales = conn.transaction(|conn| -> Result<Vec<Sale>> {
            (0..sale_count)
                .map(|i| -> Result<Sale> {
                    let sale = NewSale {
                        car_id: sold_cars[i].id,
                        customer_id: customers[i].id,
                        employee_id: employees[i].id,
                        date: at,
                        price: sold_cars[i].price,
                        created_at: at,
                    };
                    Ok(Sale::insert(conn, &sale)?)
                })
                .collect()
        })?;
        info!(sales = sales.len(); "sales created");

        Ok(SeedReport {
            cars: cars.len(),
            sold_cars: sold_cars.len(),
            customers: customers.len(),
            employees: employees.len(),
            sales: sales.len(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn a_third_of_the_cars_start_sold() {
        assert_eq!(sold_car_count(10), 3);
        assert_eq!(sold_car_count(9), 3);
        assert_eq!(sold_car_count(2), 1);
        assert_eq!(sold_car_count(1), 1);
        assert_eq!(sold_car_count(0), 0);
    }

    #[test]
    fn generated_car_fields_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let at = Utc::now().naive_utc();
        for _ in 0..50 {
            let car = new_car(&mut rng, CarStatus::Available, at);
            assert!((2005..=2024).contains(&car.year));
            assert!((20_000.0..=150_000.0).contains(&car.price));
            assert!(VEHICLES
                .iter()
                .any(|(make, models)| *make == car.make && models.contains(&car.model.as_str())));
        }
    }

    #[test]
    fn employee_positions_come_from_the_fixed_set() {
        let mut rng = StdRng::seed_from_u64(11);
        let at = Utc::now().naive_utc();
        for serial in 1..=20 {
            let employee = new_employee(&mut rng, serial, at);
            assert!(POSITIONS.contains(&employee.position.as_str()));
            assert!(employee.email.ends_with("@safarimotors.example"));
        }
    }

    #[test]
    fn emails_carry_the_serial() {
        assert_eq!(email("Grace", "Kamau", 3, "example.com"), "grace.kamau3@example.com");
    }
}
