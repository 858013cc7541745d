use serde::Serialize;

use crate::domain::customer::{NormalizedCustomer, StagedCustomer};
use crate::errors::ImportError;
use crate::import::report::ImportWarning;

/// Non-empty set of customers that all carry a name. Built only by
/// [`filter_valid`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidatedBatch {
    customers: Vec<NormalizedCustomer>,
}

impl ValidatedBatch {
    pub fn customers(&self) -> &[NormalizedCustomer] {
        &self.customers
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilteredBatch {
    pub batch: ValidatedBatch,
    pub excluded: Vec<ImportWarning>,
}

pub fn filter_valid(staged: Vec<StagedCustomer>) -> Result<FilteredBatch, ImportError> {
    let rows_examined = staged.len();
    let mut customers = Vec::with_capacity(rows_examined);
    let mut excluded = Vec::new();

    for StagedCustomer { line_number, customer } in staged {
        if customer.has_name() {
            customers.push(customer);
        } else {
            excluded.push(ImportWarning::MissingName { line_number });
        }
    }

    if customers.is_empty() {
        return Err(ImportError::NoValidRows { rows_examined });
    }

    Ok(FilteredBatch { batch: ValidatedBatch { customers }, excluded })
}
