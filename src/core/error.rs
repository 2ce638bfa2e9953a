use super::types::{BeanId, OperationKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PassivationError {
    #[error("Capture error on {type_name}.{field}: {reason}")]
    Capture {
        type_name: String,
        field: String,
        reason: String,
    },

    #[error("Class identity mismatch: expected '{expected}', record holds '{found}'")]
    ClassIdentityMismatch { expected: String, found: String },

    #[error("Schema mismatch: field '{field}' of class '{class_name}' is not part of '{type_name}'")]
    SchemaMismatch {
        type_name: String,
        class_name: String,
        field: String,
    },

    #[error("Interceptor count mismatch: bean expects {expected}, frame holds {found}")]
    InterceptorCountMismatch { expected: usize, found: usize },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Bean {0} is mid-replication inside a sticky unit of work")]
    StickyFailoverUnsupported(BeanId),

    #[error("No passivated frame for bean {0}")]
    NotFound(BeanId),

    #[error("Corrupt frame: {0}")]
    CorruptFrame(String),

    #[error("Invalid type registration: {0}")]
    Registration(String),

    #[error("Type '{0}' is not registered")]
    UnknownType(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{operation} failed for bean {bean_id}: {source}")]
    Operation {
        operation: OperationKind,
        bean_id: BeanId,
        #[source]
        source: Box<PassivationError>,
    },
}

impl PassivationError {
    /// Attaches operation context. Already-wrapped errors are returned as is.
    pub fn in_operation(self, operation: OperationKind, bean_id: &BeanId) -> Self {
        match self {
            wrapped @ Self::Operation { .. } => wrapped,
            other => Self::Operation {
                operation,
                bean_id: bean_id.clone(),
                source: Box::new(other),
            },
        }
    }

    /// Innermost cause, skipping operation context.
    pub fn root(&self) -> &PassivationError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn operation(&self) -> Option<OperationKind> {
        match self {
            Self::Operation { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub(crate) fn store(context: &str, err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(format!("{context}: {err}"))
    }

    pub(crate) fn corrupt(context: &str, err: impl std::fmt::Display) -> Self {
        Self::CorruptFrame(format!("{context}: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, PassivationError>;

impl<T> From<std::sync::PoisonError<T>> for PassivationError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for PassivationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
