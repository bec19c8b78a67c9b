use std::collections::BTreeMap;
use tracing::warn;

use crate::model::{BackendCustomer, CustomerRecord};

/// Anything carrying the barcode join key.
pub trait Keyed {
    fn barcode(&self) -> &str;
}

impl Keyed for CustomerRecord {
    fn barcode(&self) -> &str {
        &self.barcode
    }
}

impl Keyed for BackendCustomer {
    fn barcode(&self) -> &str {
        &self.record.barcode
    }
}

/// Barcode → record. Records without a barcode cannot be matched and are
/// kept aside so each one can be reported.
#[derive(Debug, Clone)]
pub struct CustomerIndex<T> {
    keyed: BTreeMap<String, T>,
    unkeyed: Vec<T>,
}

impl<T> Default for CustomerIndex<T> {
    fn default() -> Self {
        Self {
            keyed: BTreeMap::new(),
            unkeyed: Vec::new(),
        }
    }
}

impl<T: Keyed> CustomerIndex<T> {
    /// On duplicate barcodes the last record wins.
    pub fn build(records: impl IntoIterator<Item = T>) -> Self {
        let mut index = Self::default();
        for record in records {
            if record.barcode().is_empty() {
                index.unkeyed.push(record);
                continue;
            }
            let barcode = record.barcode().to_string();
            if index.keyed.insert(barcode.clone(), record).is_some() {
                warn!(%barcode, "duplicate barcode; keeping the last record");
            }
        }
        index
    }
}

impl<T> CustomerIndex<T> {
    pub fn get(&self, barcode: &str) -> Option<&T> {
        self.keyed.get(barcode)
    }

    pub fn contains(&self, barcode: &str) -> bool {
        self.keyed.contains_key(barcode)
    }

    /// Keyed records in barcode order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.keyed.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn unkeyed(&self) -> &[T] {
        &self.unkeyed
    }

    pub fn len(&self) -> usize {
        self.keyed.len() + self.unkeyed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, barcode: &str) -> CustomerRecord {
        CustomerRecord {
            name: name.into(),
            barcode: barcode.into(),
            email: String::new(),
            active: true,
            customer: true,
            is_company: false,
        }
    }

    #[test]
    fn empty_barcodes_are_kept_apart() {
        let index = CustomerIndex::build(vec![
            record("a", "B1"),
            record("b", ""),
            record("c", ""),
        ]);
        assert_eq!(index.len(), 3);
        assert!(index.contains("B1"));
        assert!(!index.contains(""));
        assert_eq!(index.unkeyed().len(), 2);
    }

    #[test]
    fn duplicate_barcode_keeps_last() {
        let index = CustomerIndex::build(vec![record("first", "B1"), record("second", "B1")]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("B1").unwrap().name, "second");
    }

    #[test]
    fn iterates_in_barcode_order() {
        let index = CustomerIndex::build(vec![record("z", "B9"), record("a", "B1")]);
        let barcodes: Vec<&str> = index.iter().map(|(b, _)| b).collect();
        assert_eq!(barcodes, vec!["B1", "B9"]);
    }
}
