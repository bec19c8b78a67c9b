//! Actions derived by `plan` and carried out by `apply`.

use std::fmt;

use crate::model::{Changes, CustomerRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Directory person without barcode; reported only.
    PersonWithoutBarcode { name: String, email: String },

    /// Barcode unknown to the backend.
    Create { record: CustomerRecord },

    /// Matched customer whose fields differ; `changes` holds only those.
    Update {
        id: i64,
        name: String,
        changes: Changes,
    },

    /// Backend customer without barcode; reported only.
    CustomerWithoutBarcode {
        id: i64,
        name: String,
        email: String,
    },

    /// Active backend customer whose barcode left the directory.
    Deactivate {
        id: i64,
        name: String,
        email: String,
    },
}

impl Action {
    /// Whether applying this action calls the backend.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Action::Create { .. } | Action::Update { .. } | Action::Deactivate { .. }
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PersonWithoutBarcode { name, email } => {
                write!(f, "# directory person without barcode: {name} {email}")
            }
            Action::Create { record } => {
                write!(f, "+ create customer {} {}", record.name, record.email)
            }
            Action::Update { id, name, changes } => {
                write!(f, "! update customer {id} {name} set {changes}")
            }
            Action::CustomerWithoutBarcode { id, name, email } => {
                write!(f, "# backend customer without barcode: {id} {name} {email}")
            }
            Action::Deactivate { id, name, email } => {
                write!(f, "- deactivate customer {id} {name} {email}")
            }
        }
    }
}

/// Counts of planned actions, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub deactivated: usize,
    pub without_barcode: usize,
}

impl SyncSummary {
    pub fn record(&mut self, action: &Action) {
        match action {
            Action::Create { .. } => self.created += 1,
            Action::Update { .. } => self.updated += 1,
            Action::Deactivate { .. } => self.deactivated += 1,
            Action::PersonWithoutBarcode { .. } | Action::CustomerWithoutBarcode { .. } => {
                self.without_barcode += 1
            }
        }
    }

    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.deactivated
    }
}
