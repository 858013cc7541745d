use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One data line of an uploaded file, keyed by the header cells as written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportRow {
    pub line_number: u64,
    pub fields: BTreeMap<String, String>,
}

impl ImportRow {
    pub fn new(line_number: u64) -> Self {
        Self { line_number, fields: BTreeMap::new() }
    }

    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// Customer-creation payload as the bulk endpoint expects it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl NormalizedCustomer {
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedCustomer {
    pub line_number: u64,
    pub customer: NormalizedCustomer,
}
