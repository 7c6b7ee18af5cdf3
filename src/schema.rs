diesel::table! {
    cars (id) {
        id -> Integer,
        make -> Text,
        model -> Text,
        year -> Integer,
        price -> Double,
        status -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    customers (id) {
        id -> Integer,
        name -> Text,
        email -> Text,
        phone -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    employees (id) {
        id -> Integer,
        name -> Text,
        position -> Text,
        email -> Text,
        phone -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    sales (id) {
        id -> Integer,
        car_id -> Integer,
        customer_id -> Integer,
        employee_id -> Integer,
        date -> Timestamp,
        price -> Double,
        created_at -> Timestamp,
    }
}

diesel::joinable!(sales -> cars (car_id));
diesel::joinable!(sales -> customers (customer_id));
diesel::joinable!(sales -> employees (employee_id));

diesel::allow_tables_to_appear_in_same_query!(cars, customers, employees, sales);
