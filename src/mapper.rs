//! Directory person → backend customer mapping.
use thiserror::Error;

use crate::model::{AttributeValue, CustomerRecord, PersonRecord};

/// First name attribute (the directory stores it in `description`).
pub const ATTR_FIRST_NAME: &str = "description";
pub const ATTR_SURNAME: &str = "sn";
/// The barcode is kept in `homeDirectory`.
pub const ATTR_BARCODE: &str = "homeDirectory";
pub const ATTR_MAIL: &str = "mail";

#[derive(Debug, Error)]
pub enum MapError {
    #[error("person {dn}: missing attribute {attribute}")]
    MissingAttribute { dn: String, attribute: &'static str },
    #[error("person {dn}: attribute {attribute} is not valid UTF-8")]
    InvalidUtf8 {
        dn: String,
        attribute: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

pub fn person_to_customer(person: &PersonRecord) -> Result<CustomerRecord, MapError> {
    let first_name = first_text(person, ATTR_FIRST_NAME)?;
    let surname = first_text(person, ATTR_SURNAME)?;
    Ok(CustomerRecord {
        name: format!("{first_name} {surname}"),
        barcode: first_text(person, ATTR_BARCODE)?,
        email: first_text(person, ATTR_MAIL)?,
        active: true,
        customer: true,
        is_company: false,
    })
}

/// First value of `attribute`, decoded as UTF-8 text.
fn first_text(person: &PersonRecord, attribute: &'static str) -> Result<String, MapError> {
    match person.first(attribute) {
        Some(AttributeValue::Text(s)) => Ok(s.clone()),
        Some(AttributeValue::Bytes(bytes)) => {
            String::from_utf8(bytes.clone()).map_err(|source| MapError::InvalidUtf8 {
                dn: person.dn.clone(),
                attribute,
                source,
            })
        }
        None => Err(MapError::MissingAttribute {
            dn: person.dn.clone(),
            attribute,
        }),
    }
}
