use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Record kinds kept by the dealership store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Car,
    Customer,
    Employee,
    Sale,
}

impl Entity {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Entity::Car => "Car",
            Entity::Customer => "Customer",
            Entity::Employee => "Employee",
            Entity::Sale => "Sale",
        }
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} with ID {id} not found.")]
    NotFound { entity: Entity, id: i32 },

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("input closed while waiting for {0}")]
    InputClosed(&'static str),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("database error: {0}")]
    Database(DieselError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("logger error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(entity: Entity, id: i32) -> Self {
        Error::NotFound { entity, id }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<DieselError> for Error {
    fn from(error: DieselError) -> Self {
        match error {
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation,
                info,
            ) => Error::Integrity(info.message().to_string()),
            other => Error::Database(other),
        }
    }
}
