use crate::{
    car::{Car, CarChanges, CarFilter, CarStatus, NewCar},
    customer::{Customer, CustomerChanges, NewCustomer},
    employee::{Employee, EmployeeChanges, NewEmployee},
    error::{Entity, Error, Result},
    sale::{IdSource, NewSale, Sale, SaleField, SaleSummary},
    seed::{self, SeedCounts, SeedReport},
    store::Store,
};
use chrono::{NaiveDateTime, Utc};
use log::{debug, info};
use rand::Rng;

/// A field given on an update counts only when it is "truthy": zero numbers
/// and blank strings are treated the same as an omitted flag.
pub trait Supplied: Sized {
    fn supplied(self) -> Option<Self>;
}

impl Supplied for String {
    fn supplied(self) -> Option<Self> {
        let trimmed = self.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl Supplied for i32 {
    fn supplied(self) -> Option<Self> {
        (self != 0).then_some(self)
    }
}

impl Supplied for f64 {
    fn supplied(self) -> Option<Self> {
        (self != 0.0).then_some(self)
    }
}

impl Supplied for CarStatus {
    fn supplied(self) -> Option<Self> {
        Some(self)
    }
}

fn supplied<T: Supplied>(value: Option<T>) -> Option<T> {
    value.and_then(Supplied::supplied)
}

fn required(field: &'static str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn valid_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::validation("price", format!("{} is not a usable price", price)));
    }
    Ok(price)
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Raw update input for a car, exactly as the caller supplied it.
#[derive(Debug, Clone, Default)]
pub struct CarUpdate {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub status: Option<CarStatus>,
}

impl CarUpdate {
    fn into_changes(self) -> Result<CarChanges> {
        Ok(CarChanges {
            make: supplied(self.make),
            model: supplied(self.model),
            year: supplied(self.year),
            price: supplied(self.price).map(valid_price).transpose()?,
            status: supplied(self.status),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerUpdate {
    fn into_changes(self) -> CustomerChanges {
        CustomerChanges {
            name: supplied(self.name),
            email: supplied(self.email),
            phone: supplied(self.phone),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl EmployeeUpdate {
    fn into_changes(self) -> EmployeeChanges {
        EmployeeChanges {
            name: supplied(self.name),
            position: supplied(self.position),
            email: supplied(self.email),
            phone: supplied(self.phone),
        }
    }
}

fn refuse_if_sold(entity: Entity, id: i32, sales: i64) -> Result<()> {
    if sales > 0 {
        return Err(Error::Integrity(format!(
            "{} {} is referenced by {} sale(s); delete those sales first",
            entity, id, sales
        )));
    }
    Ok(())
}

/// Command layer over the store: one transaction per operation.
pub struct Dealership {
    store: Store,
}

impl Dealership {
    pub fn new(store: Store) -> Self {
        Dealership { store }
    }

    pub fn open(database_url: &str) -> Result<Self> {
        Ok(Dealership::new(Store::open(database_url)?))
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn car(&mut self, id: i32) -> Result<Option<Car>> {
        self.store.transaction(|conn| Ok(Car::find(conn, id)?))
    }

    pub fn list_cars(&mut self, filter: &CarFilter) -> Result<Vec<Car>> {
        self.store.transaction(|conn| Ok(Car::list(conn, filter)?))
    }

    pub fn add_car(&mut self, make: String, model: String, year: i32, price: f64) -> Result<Car> {
        let new_car = NewCar {
            make: required("make", make)?,
            model: required("model", model)?,
            year,
            price: valid_price(price)?,
            status: CarStatus::Available,
            created_at: now(),
        };
        let car = self.store.transaction(|conn| Ok(Car::insert(conn, &new_car)?))?;
        info!(car_id = car.id; "car added");
        Ok(car)
    }

    pub fn update_car(&mut self, id: i32, update: CarUpdate) -> Result<Car> {
        let changes = update.into_changes()?;
        let car = self.store.transaction(|conn| {
            if Car::find(conn, id)?.is_none() {
                return Err(Error::not_found(Entity::Car, id));
            }
            Car::update(conn, id, &changes)?;
            Car::find(conn, id)?.ok_or(Error::not_found(Entity::Car, id))
        })?;
        info!(car_id = id; "car updated");
        Ok(car)
    }

    pub fn delete_car(&mut self, id: i32) -> Result<()> {
        self.store.transaction(|conn| {
            if Car::find(conn, id)?.is_none() {
                return Err(Error::not_found(Entity::Car, id));
            }
            refuse_if_sold(Entity::Car, id, Car::sale_count(conn, id)?)?;
            Car::delete(conn, id)?;
            Ok(())
        })?;
        info!(car_id = id; "car deleted");
        Ok(())
    }

    pub fn customer(&mut self, id: i32) -> Result<Option<Customer>> {
        self.store.transaction(|conn| Ok(Customer::find(conn, id)?))
    }

    pub fn list_customers(&mut self) -> Result<Vec<Customer>> {
        self.store.transaction(|conn| Ok(Customer::list(conn)?))
    }

    pub fn add_customer(&mut self, name: String, email: String, phone: String) -> Result<Customer> {
        let new_customer = NewCustomer {
            name: required("name", name)?,
            email: required("email", email)?,
            phone: required("phone", phone)?,
            created_at: now(),
        };
        let customer = self
            .store
            .transaction(|conn| Ok(Customer::insert(conn, &new_customer)?))?;
        info!(customer_id = customer.id; "customer added");
        Ok(customer)
    }

    pub fn update_customer(&mut self, id: i32, update: CustomerUpdate) -> Result<Customer> {
        let changes = update.into_changes();
        let customer = self.store.transaction(|conn| {
            if Customer::find(conn, id)?.is_none() {
                return Err(Error::not_found(Entity::Customer, id));
            }
            Customer::update(conn, id, &changes)?;
            Customer::find(conn, id)?.ok_or(Error::not_found(Entity::Customer, id))
        })?;
        info!(customer_id = id; "customer updated");
        Ok(customer)
    }

    pub fn delete_customer(&mut self, id: i32) -> Result<()> {
        self.store.transaction(|conn| {
            if Customer::find(conn, id)?.is_none() {
                return Err(Error::not_found(Entity::Customer, id));
            }
            refuse_if_sold(Entity::Customer, id, Customer::sale_count(conn, id)?)?;
            Customer::delete(conn, id)?;
            Ok(())
        })?;
        info!(customer_id = id; "customer deleted");
        Ok(())
    }

    pub fn employee(&mut self, id: i32) -> Result<Option<Employee>> {
        self.store.transaction(|conn| Ok(Employee::find(conn, id)?))
    }

    pub fn list_employees(&mut self) -> Result<Vec<Employee>> {
        self.store.transaction(|conn| Ok(Employee::list(conn)?))
    }

    pub fn add_employee(
        &mut self,
        name: String,
        position: String,
        email: String,
        phone: Option<String>,
    ) -> Result<Employee> {
        let new_employee = NewEmployee {
            name: required("name", name)?,
            position: required("position", position)?,
            email: required("email", email)?,
            phone: phone.and_then(Supplied::supplied),
            created_at: now(),
        };
        let employee = self
            .store
            .transaction(|conn| Ok(Employee::insert(conn, &new_employee)?))?;
        info!(employee_id = employee.id; "employee added");
        Ok(employee)
    }

    pub fn update_employee(&mut self, id: i32, update: EmployeeUpdate) -> Result<Employee> {
        let changes = update.into_changes();
        let employee = self.store.transaction(|conn| {
            if Employee::find(conn, id)?.is_none() {
                return Err(Error::not_found(Entity::Employee, id));
            }
            Employee::update(conn, id, &changes)?;
            Employee::find(conn, id)?.ok_or(Error::not_found(Entity::Employee, id))
        })?;
        info!(employee_id = id; "employee updated");
        Ok(employee)
    }

    pub fn delete_employee(&mut self, id: i32) -> Result<()> {
        self.store.transaction(|conn| {
            if Employee::find(conn, id)?.is_none() {
                return Err(Error::not_found(Entity::Employee, id));
            }
            refuse_if_sold(Entity::Employee, id, Employee::sale_count(conn, id)?)?;
            Employee::delete(conn, id)?;
            Ok(())
        })?;
        info!(employee_id = id; "employee deleted");
        Ok(())
    }

    pub fn list_sales(&mut self) -> Result<Vec<SaleSummary>> {
        self.store.transaction(|conn| Ok(Sale::summaries(conn)?))
    }

    /// Record a sale, asking `source` for each reference until one checks
    /// out. Everything, prompts included, happens inside one transaction.
    pub fn add_sale<S: IdSource>(&mut self, source: &mut S) -> Result<Sale> {
        let sale = self.store.transaction(|conn| {
            let car = loop {
                let id = source.next_id(SaleField::Car)?;
                match Car::find_sold(conn, id)? {
                    Some(car) => break car,
                    None => {
                        debug!(car_id = id; "car rejected for sale");
                        source.rejected(SaleField::Car)?;
                    }
                }
            };
            let customer = loop {
                let id = source.next_id(SaleField::Customer)?;
                match Customer::find(conn, id)? {
                    Some(customer) => break customer,
                    None => source.rejected(SaleField::Customer)?,
                }
            };
            let employee = loop {
                let id = source.next_id(SaleField::Employee)?;
                match Employee::find(conn, id)? {
                    Some(employee) => break employee,
                    None => source.rejected(SaleField::Employee)?,
                }
            };

            let recorded_at = now();
            let new_sale = NewSale {
                car_id: car.id,
                customer_id: customer.id,
                employee_id: employee.id,
                date: recorded_at,
                price: car.price,
                created_at: recorded_at,
            };
            Ok(Sale::insert(conn, &new_sale)?)
        })?;
        info!(sale_id = sale.id, car_id = sale.car_id; "sale recorded");
        Ok(sale)
    }

    /// Remove a sale and put its car back on the lot.
    pub fn delete_sale(&mut self, id: i32) -> Result<Sale> {
        let sale = self.store.transaction(|conn| {
            let sale = Sale::find(conn, id)?.ok_or(Error::not_found(Entity::Sale, id))?;
            Car::set_status(conn, sale.car_id, CarStatus::Available)?;
            Sale::delete(conn, id)?;
            Ok(sale)
        })?;
        info!(sale_id = id, car_id = sale.car_id; "sale deleted, car available again");
        Ok(sale)
    }

    pub fn seed<R: Rng + ?Sized>(&mut self, rng: &mut R, counts: &SeedCounts) -> Result<SeedReport> {
        seed::seed(&mut self.store, rng, counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_update_values_count_as_absent() {
        assert_eq!(supplied(Some(String::new())), None);
        assert_eq!(supplied(Some(0)), None);
        assert_eq!(supplied(Some(0.0)), None);
        assert_eq!(supplied(Some(2021)), Some(2021));
        assert_eq!(supplied(Some("Civic".to_string())), Some("Civic".to_string()));
        assert_eq!(supplied::<i32>(None), None);
    }

    #[test]
    fn supplied_text_is_trimmed_and_blank_is_absent() {
        assert_eq!(supplied(Some("   ".to_string())), None);
        assert_eq!(supplied(Some(" Mazda ".to_string())), Some("Mazda".to_string()));
    }

    #[test]
    fn car_update_rejects_negative_price() {
        let update = CarUpdate {
            price: Some(-5.0),
            ..CarUpdate::default()
        };
        assert!(matches!(
            update.into_changes(),
            Err(Error::Validation { field: "price", .. })
        ));
    }

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(required("make", "  Honda ".to_string()).unwrap(), "Honda");
        assert!(required("make", "   ".to_string()).is_err());
    }
}
