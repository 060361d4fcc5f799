use crate::catalog::PeripheralKind;
use crate::source::Origin;
use crate::validator::Claimant;
use crate::value::{ParamType, PinId, Value};
use std::fmt;
use thiserror::Error;

/// A single resolution or validation finding. Every one of these stops the
/// build for the board target it was found in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("Mandatory parameter '{name}' is not defined by any source and has no default")]
    MissingMandatoryParameter { name: String },

    #[error("Parameter '{name}' defined by {origin} is not in the catalog")]
    UnknownParameterName { name: String, origin: Origin },

    #[error("Parameter '{name}' from {origin} must be a {expected}, found {} {found}", .found.kind())]
    TypeMismatch {
        name: String,
        expected: ParamType,
        found: Value,
        origin: Origin,
    },

    #[error("Parameter '{name}' from {origin} is {value}, outside {min}..={max}")]
    OutOfRange {
        name: String,
        value: i64,
        min: i64,
        max: i64,
        origin: Origin,
    },

    #[error("Pin {pin} is claimed by both {first} and {second}")]
    PinConflict {
        pin: PinId,
        first: Claimant,
        second: Claimant,
    },

    #[error("'{feature}' is enabled but its dependency '{dependency}' is not configured")]
    UnsatisfiedDependency { feature: String, dependency: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    MissingMandatoryParameter,
    UnknownParameterName,
    TypeMismatch,
    OutOfRange,
    PinConflict,
    UnsatisfiedDependency,
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::MissingMandatoryParameter { .. } => ViolationKind::MissingMandatoryParameter,
            Violation::UnknownParameterName { .. } => ViolationKind::UnknownParameterName,
            Violation::TypeMismatch { .. } => ViolationKind::TypeMismatch,
            Violation::OutOfRange { .. } => ViolationKind::OutOfRange,
            Violation::PinConflict { .. } => ViolationKind::PinConflict,
            Violation::UnsatisfiedDependency { .. } => ViolationKind::UnsatisfiedDependency,
        }
    }
}

/// Non-empty, ordered list of violations reported together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// `None` when there is nothing to report
    pub fn from_vec(violations: Vec<Violation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self(violations))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> Vec<ViolationKind> {
        self.0.iter().map(Violation::kind).collect()
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration violation(s):", self.0.len())?;
        for v in &self.0 {
            write!(f, "\n  - {}", v)?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

/// Inconsistencies inside the catalog itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Parameter '{name}' is declared more than once")]
    DuplicateParameter { name: String },

    #[error("Peripheral '{id}' is declared more than once")]
    DuplicatePeripheral { id: String },

    #[error("Invalid catalog entry '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("'{from}' refers to '{to}', which is not declared")]
    DanglingReference { from: String, to: String },

    #[error("'{from}' refers to '{to}', which must be a {expected} parameter")]
    WrongReferenceType {
        from: String,
        to: String,
        expected: ParamType,
    },

    #[error("Pin parameter '{param}' belongs to both '{first}' and '{second}'")]
    SharedPinParameter {
        param: String,
        first: String,
        second: String,
    },

    #[error("Device '{peripheral}' does not name the bus it is attached to")]
    MissingBus { peripheral: String },
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format in '{path}': {source}")]
    FormatError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("{path}:{line}: {reason}")]
    HeaderError {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Board '{board}' not found")]
    UnknownBoard { board: String },

    #[error("Board '{board}' is built on port '{port}', which is not defined")]
    UnknownPort { board: String, port: String },

    #[error("Source '{name}' requires catalog version {required}, but the catalog is version {available}")]
    CatalogTooOld {
        name: String,
        required: u32,
        available: u32,
    },
}

/// Failure of a single board target: it could not be assembled, or it did not validate
#[derive(Error, Debug)]
pub enum TargetError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Invalid(#[from] Violations),

    #[error("Check of board '{board}' aborted: {reason}")]
    Aborted { board: String, reason: String },
}

/// Errors reported by the board hardware layer during initialization
#[derive(Error, Debug)]
pub enum HalError {
    #[error("Peripheral '{peripheral}' failed: {reason}")]
    PeripheralFailed { peripheral: String, reason: String },

    #[error("Root filesystem mount failed: {reason}")]
    MountFailed { reason: String },

    #[error("Peripheral kind '{kind}' of '{peripheral}' is not supported by this board layer")]
    Unsupported {
        peripheral: String,
        kind: PeripheralKind,
    },
}

/// Consumer initialization errors
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Initialization step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: HalError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    #[error("Configuration for '{installed}' is already installed; refusing '{rejected}'")]
    AlreadyInstalled { installed: String, rejected: String },
}

/// Result type aliases for convenience
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type HalResult<T> = Result<T, HalError>;
pub type TargetResult<T> = Result<T, TargetError>;
