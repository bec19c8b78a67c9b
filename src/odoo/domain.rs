use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::Value;

/// One element of a backend search domain, in prefix (Polish) notation.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainItem {
    Term {
        field: String,
        op: String,
        value: Value,
    },
    And,
    Or,
    Not,
}

impl Serialize for DomainItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DomainItem::Term { field, op, value } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(field)?;
                seq.serialize_element(op)?;
                seq.serialize_element(value)?;
                seq.end()
            }
            DomainItem::And => serializer.serialize_str("&"),
            DomainItem::Or => serializer.serialize_str("|"),
            DomainItem::Not => serializer.serialize_str("!"),
        }
    }
}

/// A search filter. Consecutive terms are implicitly AND-ed by the backend;
/// `push_or`, `push_and` and `push_not` add prefix operators that apply to
/// what follows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Domain(Vec<DomainItem>);

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, field: &str, op: &str, value: impl Into<Value>) -> Self {
        self.0.push(DomainItem::Term {
            field: field.to_string(),
            op: op.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn field_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.term(field, "=", value)
    }

    pub fn push_and(mut self) -> Self {
        self.0.push(DomainItem::And);
        self
    }

    pub fn push_or(mut self) -> Self {
        self.0.push(DomainItem::Or);
        self
    }

    pub fn push_not(mut self) -> Self {
        self.0.push(DomainItem::Not);
        self
    }

    pub fn items(&self) -> &[DomainItem] {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
