use {
    crate::{
        car::{CarFilter, CarStatus},
        dealership::{CarUpdate, CustomerUpdate, Dealership, EmployeeUpdate},
        error::{Error, Result},
        logger,
        sale::{IdSource, SaleField},
        seed::{SeedCounts, SeedReport},
        store::DEFAULT_DATABASE,
    },
    clap::{crate_name, ArgAction, Args, Parser, Subcommand},
    rand::{rngs::StdRng, SeedableRng},
    serde::Serialize,
    std::{
        fmt::{self, Display, Formatter},
        io::{self, BufRead, Write},
        str::FromStr,
    },
    Notice::*,
};

#[derive(Parser, Debug)]
#[command(version, about = "Safari Motors CLI - Manage your car dealership.")]
pub struct Cli {
    /// SQLite database file
    #[arg(long, env = "SAFARI_MOTORS_DB", default_value = DEFAULT_DATABASE, global = true)]
    database: String,
    /// Log progress to stderr (-vv for debug output)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Print list output as JSON
    #[arg(long, global = true)]
    json: bool,
    #[clap(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Parser, Debug)]
struct Repl {
    /// Print list output as JSON
    #[arg(long, global = true)]
    json: bool,
    #[clap(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage cars
    #[clap(subcommand)]
    Car(CarCommands),
    /// Manage customers
    #[clap(subcommand)]
    Customer(CustomerCommands),
    /// Manage employees
    #[clap(subcommand)]
    Employee(EmployeeCommands),
    /// Manage sales
    #[clap(subcommand)]
    Sale(SaleCommands),
    /// Replace all records with generated demo data
    Seed(SeedArgs),
    /// Leave the interactive shell
    Exit,
}

#[derive(Subcommand, Debug)]
enum CarCommands {
    /// List all cars, optionally filtered
    List {
        #[arg(long)]
        make: Option<String>,
        #[arg(long, value_enum)]
        status: Option<CarStatus>,
    },
    /// Add a new car to inventory
    Add {
        #[arg(long)]
        make: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        price: Option<f64>,
    },
    /// Update an existing car
    Update(CarUpdateArgs),
    /// Delete a car
    Delete { car_id: i32 },
}

#[derive(Debug, Args)]
struct CarUpdateArgs {
    car_id: i32,
    #[arg(long)]
    make: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long, value_enum)]
    status: Option<CarStatus>,
}

#[derive(Subcommand, Debug)]
enum CustomerCommands {
    List,
    Add {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Update {
        customer_id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Delete {
        customer_id: i32,
    },
}

#[derive(Subcommand, Debug)]
enum EmployeeCommands {
    List,
    Add {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Update {
        employee_id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Delete {
        employee_id: i32,
    },
}

#[derive(Subcommand, Debug)]
enum SaleCommands {
    List,
    /// Record a sale; asks for the car, customer and employee ids
    Add,
    /// Delete a sale and mark its car available again
    Delete { sale_id: i32 },
}

#[derive(Debug, Args)]
struct SeedArgs {
    #[arg(long, default_value_t = 10)]
    cars: usize,
    #[arg(long, default_value_t = 10)]
    customers: usize,
    #[arg(long, default_value_t = 10)]
    employees: usize,
    #[arg(long, default_value_t = 10)]
    sales: usize,
    /// Fixed seed for reproducible data
    #[arg(long)]
    rng_seed: Option<u64>,
}

#[derive(Debug)]
pub enum Notice {
    NoCars,
    NoCustomers,
    NoEmployees,
    NoSales,
    NoSoldCars,
    ClearingData,
    DataCleared,
    Seeded,
    InteractiveModeOnly,
}

impl Notice {
    pub(crate) fn as_str(&self) -> &'static str {
        match *self {
            NoCars => "No cars found with the given filters.",
            NoCustomers => "No customers found.",
            NoEmployees => "No employees found.",
            NoSales => "No sales found.",
            NoSoldCars => "No sold cars available to create sales.",
            ClearingData => "Clearing existing data...",
            DataCleared => "Existing data cleared.",
            Seeded => "Database seeded with fake data successfully!",
            InteractiveModeOnly => "this command can only be used in interactive mode",
        }
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Line-oriented console: command output goes to `output`, answers to
/// questions come from `input`.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompt { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    fn ask(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask until a non-empty answer arrives.
    pub fn text(&mut self, label: &'static str) -> Result<String> {
        loop {
            match self.ask(label)? {
                None => return Err(Error::InputClosed(label)),
                Some(answer) if answer.is_empty() => continue,
                Some(answer) => return Ok(answer),
            }
        }
    }

    /// Ask until the answer parses as `T`.
    pub fn number<T: FromStr>(&mut self, label: &'static str) -> Result<T> {
        loop {
            let answer = self.text(label)?;
            match answer.parse() {
                Ok(number) => return Ok(number),
                Err(_) => self.say(format_args!("Error: '{}' is not a valid number.", answer))?,
            }
        }
    }

    fn readline(&mut self) -> Result<Option<String>> {
        write!(self.output, "> ")?;
        self.output.flush()?;
        let mut buffer = String::new();
        if self.input.read_line(&mut buffer)? == 0 {
            return Ok(None);
        }
        Ok(Some(buffer.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> IdSource for Prompt<R, W> {
    fn next_id(&mut self, field: SaleField) -> Result<i32> {
        self.number(field.prompt())
    }

    fn rejected(&mut self, field: SaleField) -> Result<()> {
        self.say(field.rejection())
    }
}

fn print_list<T, R, W>(prompt: &mut Prompt<R, W>, json: bool, rows: &[T], empty: Notice) -> Result<()>
where
    T: Display + Serialize,
    R: BufRead,
    W: Write,
{
    if json {
        return prompt.say(serde_json::to_string_pretty(rows)?);
    }
    if rows.is_empty() {
        return prompt.say(empty);
    }
    for row in rows {
        prompt.say(row)?;
    }
    Ok(())
}

fn car_cmd<R: BufRead, W: Write>(
    cmd: CarCommands,
    dealership: &mut Dealership,
    prompt: &mut Prompt<R, W>,
    json: bool,
) -> Result<()> {
    match cmd {
        CarCommands::List { make, status } => {
            let cars = dealership.list_cars(&CarFilter { make, status })?;
            print_list(prompt, json, &cars, NoCars)
        }
        CarCommands::Add {
            make,
            model,
            year,
            price,
        } => {
            let make = match make {
                Some(make) => make,
                None => prompt.text("Make")?,
            };
            let model = match model {
                Some(model) => model,
                None => prompt.text("Model")?,
            };
            let year = match year {
                Some(year) => year,
                None => prompt.number("Year")?,
            };
            let price = match price {
                Some(price) => price,
                None => prompt.number("Price")?,
            };
            let car = dealership.add_car(make, model, year, price)?;
            prompt.say(format_args!(
                "Car {} {} added with ID {}.",
                car.make, car.model, car.id
            ))
        }
        CarCommands::Update(args) => {
            let update = CarUpdate {
                make: args.make,
                model: args.model,
                year: args.year,
                price: args.price,
                status: args.status,
            };
            let car = dealership.update_car(args.car_id, update)?;
            prompt.say(format_args!("Car {} updated.", car.id))
        }
        CarCommands::Delete { car_id } => {
            dealership.delete_car(car_id)?;
            prompt.say(format_args!("Car {} deleted.", car_id))
        }
    }
}

fn customer_cmd<R: BufRead, W: Write>(
    cmd: CustomerCommands,
    dealership: &mut Dealership,
    prompt: &mut Prompt<R, W>,
    json: bool,
) -> Result<()> {
    match cmd {
        CustomerCommands::List => {
            let customers = dealership.list_customers()?;
            print_list(prompt, json, &customers, NoCustomers)
        }
        CustomerCommands::Add { name, email, phone } => {
            let name = match name {
                Some(name) => name,
                None => prompt.text("Name")?,
            };
            let email = match email {
                Some(email) => email,
                None => prompt.text("Email")?,
            };
            let phone = match phone {
                Some(phone) => phone,
                None => prompt.text("Phone")?,
            };
            let customer = dealership.add_customer(name, email, phone)?;
            prompt.say(format_args!(
                "Customer {} added with ID {}.",
                customer.name, customer.id
            ))
        }
        CustomerCommands::Update {
            customer_id,
            name,
            email,
            phone,
        } => {
            let update = CustomerUpdate { name, email, phone };
            let customer = dealership.update_customer(customer_id, update)?;
            prompt.say(format_args!("Customer {} updated.", customer.id))
        }
        CustomerCommands::Delete { customer_id } => {
            dealership.delete_customer(customer_id)?;
            prompt.say(format_args!("Customer {} deleted.", customer_id))
        }
    }
}

fn employee_cmd<R: BufRead, W: Write>(
    cmd: EmployeeCommands,
    dealership: &mut Dealership,
    prompt: &mut Prompt<R, W>,
    json: bool,
) -> Result<()> {
    match cmd {
        EmployeeCommands::List => {
            let employees = dealership.list_employees()?;
            print_list(prompt, json, &employees, NoEmployees)
        }
        EmployeeCommands::Add {
            name,
            position,
            email,
            phone,
        } => {
            let name = match name {
                Some(name) => name,
                None => prompt.text("Name")?,
            };
            let position = match position {
                Some(position) => position,
                None => prompt.text("Position")?,
            };
            let email = match email {
                Some(email) => email,
                None => prompt.text("Email")?,
            };
            let employee = dealership.add_employee(name, position, email, phone)?;
            prompt.say(format_args!(
                "Employee {} added with ID {}.",
                employee.name, employee.id
            ))
        }
        EmployeeCommands::Update {
            employee_id,
            name,
            position,
            email,
            phone,
        } => {
            let update = EmployeeUpdate {
                name,
                position,
                email,
                phone,
            };
            let employee = dealership.update_employee(employee_id, update)?;
            prompt.say(format_args!("Employee {} updated.", employee.id))
        }
        EmployeeCommands::Delete { employee_id } => {
            dealership.delete_employee(employee_id)?;
            prompt.say(format_args!("Employee {} deleted.", employee_id))
        }
    }
}

fn sale_cmd<R: BufRead, W: Write>(
    cmd: SaleCommands,
    dealership: &mut Dealership,
    prompt: &mut Prompt<R, W>,
    json: bool,
) -> Result<()> {
    match cmd {
        SaleCommands::List => {
            let sales = dealership.list_sales()?;
            print_list(prompt, json, &sales, NoSales)
        }
        SaleCommands::Add => {
            let sale = dealership.add_sale(prompt)?;
            prompt.say(format_args!(
                "Sale recorded successfully! Sale ID: {}",
                sale.id
            ))
        }
        SaleCommands::Delete { sale_id } => {
            dealership.delete_sale(sale_id)?;
            prompt.say(format_args!(
                "Sale {} deleted and car status updated to available.",
                sale_id
            ))
        }
    }
}

fn print_seed_report<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    report: &SeedReport,
) -> Result<()> {
    prompt.say(DataCleared)?;
    prompt.say(format_args!(
        "Created {} cars ({} sold).",
        report.cars, report.sold_cars
    ))?;
    prompt.say(format_args!("Created {} customers.", report.customers))?;
    prompt.say(format_args!("Created {} employees.", report.employees))?;
    if report.sales == 0 {
        prompt.say(NoSoldCars)?;
    } else {
        prompt.say(format_args!("Created {} sales.", report.sales))?;
    }
    prompt.say(Seeded)
}

fn seed_cmd<R: BufRead, W: Write>(
    args: SeedArgs,
    dealership: &mut Dealership,
    prompt: &mut Prompt<R, W>,
) -> Result<()> {
    let counts = SeedCounts {
        cars: args.cars,
        customers: args.customers,
        employees: args.employees,
        sales: args.sales,
    };
    prompt.say(ClearingData)?;
    let report = match args.rng_seed {
        Some(seed) => dealership.seed(&mut StdRng::seed_from_u64(seed), &counts)?,
        None => dealership.seed(&mut rand::thread_rng(), &counts)?,
    };
    print_seed_report(prompt, &report)
}

fn failure_prefix(cmd: &Commands) -> &'static str {
    match cmd {
        Commands::Sale(SaleCommands::Add) => "Error adding sale: ",
        Commands::Seed(_) => "Error during seeding: ",
        _ => "",
    }
}

/// Run one command. Command failures are reported on the console and do
/// not end the session; the returned flag is `false` only for `exit`.
fn resolve_cmd<R: BufRead, W: Write>(
    cmd: Commands,
    dealership: &mut Dealership,
    prompt: &mut Prompt<R, W>,
    json: bool,
) -> Result<bool> {
    use Commands::*;
    let prefix = failure_prefix(&cmd);
    let outcome = match cmd {
        Car(cmd) => car_cmd(cmd, dealership, prompt, json),
        Customer(cmd) => customer_cmd(cmd, dealership, prompt, json),
        Employee(cmd) => employee_cmd(cmd, dealership, prompt, json),
        Sale(cmd) => sale_cmd(cmd, dealership, prompt, json),
        Seed(args) => seed_cmd(args, dealership, prompt),
        Exit => return Ok(false),
    };
    if let Err(e) = outcome {
        prompt.say(format_args!("{}{}", prefix, e))?;
    }
    Ok(true)
}

fn respond<R: BufRead, W: Write>(
    line: &str,
    dealership: &mut Dealership,
    prompt: &mut Prompt<R, W>,
    json: bool,
) -> Result<bool> {
    let args = std::iter::once(crate_name!()).chain(line.split_whitespace());
    match Repl::try_parse_from(args) {
        Ok(repl) => resolve_cmd(repl.cmd, dealership, prompt, json || repl.json),
        Err(e) => {
            prompt.say(e)?;
            Ok(true)
        }
    }
}

fn run_repl<R: BufRead, W: Write>(
    dealership: &mut Dealership,
    prompt: &mut Prompt<R, W>,
    json: bool,
) -> Result<()> {
    while let Some(line) = prompt.readline()? {
        if line.is_empty() {
            continue;
        }
        if !respond(&line, dealership, prompt, json)? {
            break;
        }
    }
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    logger::init(cli.verbose)?;
    let mut dealership = Dealership::open(&cli.database)?;
    let mut prompt = Prompt::new(io::stdin().lock(), io::stdout());

    match cli.cmd {
        Some(Commands::Exit) => Err(Error::validation("command", InteractiveModeOnly.as_str())),
        Some(cmd) => {
            resolve_cmd(cmd, &mut dealership, &mut prompt, cli.json)?;
            Ok(())
        }
        None => run_repl(&mut dealership, &mut prompt, cli.json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn dealership() -> Dealership {
        Dealership::new(Store::in_memory().unwrap())
    }

    fn console(input: &str) -> Prompt<&[u8], Vec<u8>> {
        Prompt::new(input.as_bytes(), Vec::new())
    }

    fn printed(prompt: Prompt<&[u8], Vec<u8>>) -> String {
        String::from_utf8(prompt.into_output()).unwrap()
    }

    #[test]
    fn added_car_is_listed_by_lowercase_make() {
        let mut dealership = dealership();
        let mut prompt = console("");
        respond(
            "car add --make Toyota --model Corolla --year 2020 --price 18000",
            &mut dealership,
            &mut prompt,
            false,
        )
        .unwrap();
        respond("car list --make toyota", &mut dealership, &mut prompt, false).unwrap();

        let out = printed(prompt);
        assert!(out.contains("Car Toyota Corolla added with ID 1."));
        assert!(out.contains("1: Toyota Corolla (2020) - $18000.00 [available]"));
    }

    #[test]
    fn missing_car_fields_are_prompted() {
        let mut dealership = dealership();
        let mut prompt = console("Honda\nCivic\nnext year\n2019\n15000\n");
        respond("car add", &mut dealership, &mut prompt, false).unwrap();

        let out = printed(prompt);
        assert!(out.contains("Error: 'next year' is not a valid number."));
        assert!(out.contains("Car Honda Civic added with ID 1."));
    }

    #[test]
    fn empty_lists_print_a_notice() {
        let mut dealership = dealership();
        let mut prompt = console("");
        for line in ["car list", "customer list", "employee list", "sale list"] {
            respond(line, &mut dealership, &mut prompt, false).unwrap();
        }

        let out = printed(prompt);
        assert!(out.contains(NoCars.as_str()));
        assert!(out.contains(NoCustomers.as_str()));
        assert!(out.contains(NoEmployees.as_str()));
        assert!(out.contains(NoSales.as_str()));
    }

    #[test]
    fn missing_ids_report_not_found_and_keep_going() {
        let mut dealership = dealership();
        let mut prompt = console("");
        let keep_going = respond("car delete 99", &mut dealership, &mut prompt, false).unwrap();
        respond("sale delete 4", &mut dealership, &mut prompt, false).unwrap();

        assert!(keep_going);
        let out = printed(prompt);
        assert!(out.contains("Car with ID 99 not found."));
        assert!(out.contains("Sale with ID 4 not found."));
    }

    #[test]
    fn sale_add_reprompts_until_car_is_sold() {
        let mut dealership = dealership();
        let mut setup = console("");
        for line in [
            "car add --make Ford --model Ranger --year 2018 --price 30000",
            "car add --make Mazda --model Demio --year 2016 --price 9000",
            "car update 2 --status sold",
            "customer add --name Grace --email grace@example.com --phone 0700",
            "employee add --name Otieno --position Salesperson --email otieno@example.com",
        ] {
            respond(line, &mut dealership, &mut setup, false).unwrap();
        }

        let mut prompt = console("1\n2\n1\n1\n");
        respond("sale add", &mut dealership, &mut prompt, false).unwrap();

        let out = printed(prompt);
        assert!(out.contains(SaleField::Car.rejection()));
        assert!(out.contains("Sale recorded successfully! Sale ID: 1"));
    }

    #[test]
    fn sale_add_reports_closed_input_with_context() {
        let mut dealership = dealership();
        let mut prompt = console("");
        respond("sale add", &mut dealership, &mut prompt, false).unwrap();

        let out = printed(prompt);
        assert!(out.contains("Error adding sale: input closed while waiting for"));
    }

    #[test]
    fn json_flag_prints_an_array() {
        let mut dealership = dealership();
        let mut prompt = console("");
        respond(
            "customer add --name Amina --email amina@example.com --phone 0711",
            &mut dealership,
            &mut prompt,
            false,
        )
        .unwrap();
        let mut listing = console("");
        respond("customer list", &mut dealership, &mut listing, true).unwrap();

        let rows: serde_json::Value = serde_json::from_str(&printed(listing)).unwrap();
        assert_eq!(rows.as_array().map(Vec::len), Some(1));
        assert_eq!(rows[0]["email"], "amina@example.com");
    }

    #[test]
    fn json_flag_works_inside_the_shell() {
        let mut dealership = dealership();
        let mut setup = console("");
        respond(
            "employee add --name Felix --position Manager --email felix@example.com",
            &mut dealership,
            &mut setup,
            false,
        )
        .unwrap();
        let mut listing = console("");
        respond("employee list --json", &mut dealership, &mut listing, false).unwrap();

        let rows: serde_json::Value = serde_json::from_str(&printed(listing)).unwrap();
        assert_eq!(rows[0]["position"], "Manager");
        assert_eq!(rows[0]["phone"], serde_json::Value::Null);
    }

    #[test]
    fn parse_errors_do_not_end_the_shell() {
        let mut dealership = dealership();
        let mut prompt = console("");
        assert!(respond("car fly", &mut dealership, &mut prompt, false).unwrap());
        assert!(!respond("exit", &mut dealership, &mut prompt, false).unwrap());
    }

    #[test]
    fn shell_stops_at_exit() {
        let mut dealership = dealership();
        let mut prompt = console(
            "car add --make Subaru --model Forester --year 2015 --price 12000\n\nexit\ncar delete 1\n",
        );
        run_repl(&mut dealership, &mut prompt, false).unwrap();

        assert!(dealership.car(1).unwrap().is_some());
    }

    #[test]
    fn seed_prints_a_summary() {
        let mut dealership = dealership();
        let mut prompt = console("");
        respond("seed --cars 10 --rng-seed 3", &mut dealership, &mut prompt, false).unwrap();

        let out = printed(prompt);
        assert!(out.contains("Created 10 cars (3 sold)."));
        assert!(out.contains("Created 3 sales."));
        assert!(out.contains(Seeded.as_str()));
    }
}
