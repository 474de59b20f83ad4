//! Formation error types.

use std::fmt;

use scenegrid_state::StateError;
use thiserror::Error;

/// Kinds of objects named in `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Tenant,
    Runtime,
    Application,
    Label,
    LabelDefinition,
    Assignment,
    Formation,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Tenant => "tenant",
            Resource::Runtime => "runtime",
            Resource::Application => "application",
            Resource::Label => "label",
            Resource::LabelDefinition => "label definition",
            Resource::Assignment => "assignment",
            Resource::Formation => "formation",
        };
        f.write_str(name)
    }
}

/// Class of an error, independent of the context it was wrapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotUnique,
    InvalidData,
    InvalidOperation,
    Internal,
    TenantRequired,
    Conflict,
}

/// Errors that can occur during formation operations.
#[derive(Debug, Error)]
pub enum FormationError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: String },

    #[error("not unique: {0}")]
    NotUnique(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("tenant is required")]
    TenantRequired,

    /// The formation schema changed between read and write.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("while processing scenario {scenario}: {source}")]
    Scenario {
        scenario: String,
        #[source]
        source: Box<FormationError>,
    },

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

pub type FormationResult<T> = Result<T, FormationError>;

impl FormationError {
    pub fn not_found(resource: Resource, id: impl Into<String>) -> Self {
        FormationError::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Wrap with the name of the scenario being reconciled.
    pub fn in_scenario(self, scenario: &str) -> Self {
        FormationError::Scenario {
            scenario: scenario.to_string(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FormationError::NotFound { .. } => ErrorKind::NotFound,
            FormationError::NotUnique(_) => ErrorKind::NotUnique,
            FormationError::InvalidData(_) => ErrorKind::InvalidData,
            FormationError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            FormationError::Internal(_) => ErrorKind::Internal,
            FormationError::TenantRequired => ErrorKind::TenantRequired,
            FormationError::Conflict(_) => ErrorKind::Conflict,
            FormationError::Scenario { source, .. } => source.kind(),
            FormationError::State(e) => match e {
                StateError::NotFound(_) => ErrorKind::NotFound,
                StateError::NotUnique(_) => ErrorKind::NotUnique,
                StateError::VersionConflict { .. } => ErrorKind::Conflict,
                _ => ErrorKind::Internal,
            },
        }
    }

    /// Only optimistic-concurrency conflicts are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}
