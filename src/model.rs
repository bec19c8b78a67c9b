use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A single directory attribute value. Values that are not valid UTF-8 are
/// handed over by the directory library as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Bytes(Vec<u8>),
}

/// A directory person: its DN plus the multi-valued attribute bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRecord {
    pub dn: String,
    pub attrs: HashMap<String, Vec<AttributeValue>>,
}

impl PersonRecord {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// Builder-style helper, mostly for tests and fakes.
    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.attrs
            .entry(name.to_string())
            .or_default()
            .push(AttributeValue::Text(value.to_string()));
        self
    }

    pub fn first(&self, name: &str) -> Option<&AttributeValue> {
        self.attrs.get(name).and_then(|values| values.first())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CustomerField {
    Name,
    Barcode,
    Email,
    Active,
    Customer,
    IsCompany,
}

impl CustomerField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerField::Name => "name",
            CustomerField::Barcode => "barcode",
            CustomerField::Email => "email",
            CustomerField::Active => "active",
            CustomerField::Customer => "customer",
            CustomerField::IsCompany => "is_company",
        }
    }
}

impl fmt::Display for CustomerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// Customer shape shared by mapped directory persons and backend partners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    #[serde(deserialize_with = "text_or_false")]
    pub name: String,
    #[serde(deserialize_with = "text_or_false")]
    pub barcode: String,
    #[serde(deserialize_with = "text_or_false")]
    pub email: String,
    pub active: bool,
    pub customer: bool,
    pub is_company: bool,
}

impl CustomerRecord {
    /// Fields compared, read and written during reconciliation.
    pub const FIELDS: [CustomerField; 6] = [
        CustomerField::Name,
        CustomerField::Barcode,
        CustomerField::Email,
        CustomerField::Active,
        CustomerField::Customer,
        CustomerField::IsCompany,
    ];

    pub fn field_names() -> Vec<&'static str> {
        Self::FIELDS.iter().map(CustomerField::as_str).collect()
    }

    pub fn get(&self, field: CustomerField) -> FieldValue {
        match field {
            CustomerField::Name => FieldValue::Text(self.name.clone()),
            CustomerField::Barcode => FieldValue::Text(self.barcode.clone()),
            CustomerField::Email => FieldValue::Text(self.email.clone()),
            CustomerField::Active => FieldValue::Flag(self.active),
            CustomerField::Customer => FieldValue::Flag(self.customer),
            CustomerField::IsCompany => FieldValue::Flag(self.is_company),
        }
    }

    /// Fields of `self` whose value differs from `old`, with `self`'s values.
    pub fn changes_from(&self, old: &CustomerRecord) -> Changes {
        Changes(
            Self::FIELDS
                .iter()
                .filter_map(|&field| {
                    let value = self.get(field);
                    (value != old.get(field)).then_some((field, value))
                })
                .collect(),
        )
    }

    /// Every field as a backend value map, used for creation.
    pub fn to_values(&self) -> Map<String, Value> {
        Changes(Self::FIELDS.iter().map(|&f| (f, self.get(f))).collect()).to_values()
    }
}

/// A customer as stored in the backend, with its backend-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCustomer {
    pub id: i64,
    #[serde(flatten)]
    pub record: CustomerRecord,
}

/// A minimal set of field updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes(pub BTreeMap<CustomerField, FieldValue>);

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: CustomerField) -> Option<&FieldValue> {
        self.0.get(&field)
    }

    pub fn to_values(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(field, value)| {
                let json = match value {
                    FieldValue::Text(s) => Value::String(s.clone()),
                    FieldValue::Flag(b) => Value::Bool(*b),
                };
                (field.as_str().to_string(), json)
            })
            .collect()
    }
}

impl fmt::Display for Changes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (field, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {value}")?;
        }
        f.write_str("}")
    }
}

/// The backend reports unset text fields as `false`.
fn text_or_false<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrFlag {
        Text(String),
        Flag(bool),
    }

    match TextOrFlag::deserialize(deserializer)? {
        TextOrFlag::Text(s) => Ok(s),
        TextOrFlag::Flag(false) => Ok(String::new()),
        TextOrFlag::Flag(true) => Err(de::Error::invalid_value(
            Unexpected::Bool(true),
            &"a string or false",
        )),
    }
}
