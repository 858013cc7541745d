use crate::domain::customer::{ImportRow, NormalizedCustomer};

pub const FIRST_NAME: &str = "First Name";
pub const LAST_NAME: &str = "Last Name";
pub const EMAIL_ADDRESS: &str = "Email Address";
pub const PHONE: &str = "Phone 1";
pub const BILLING_ADDRESS: &str = "Billing Address";
pub const CITY: &str = "City";

pub const RECOGNIZED_COLUMNS: [&str; 6] =
    [FIRST_NAME, LAST_NAME, EMAIL_ADDRESS, PHONE, BILLING_ADDRESS, CITY];

/// Derives the customer payload from a raw row. Never fails; missing columns
/// produce empty fields.
pub fn normalize(row: &ImportRow) -> NormalizedCustomer {
    let field = |column: &str| row.get(column).unwrap_or_default();

    NormalizedCustomer {
        name: format!("{} {}", field(FIRST_NAME), field(LAST_NAME)).trim().to_string(),
        email: field(EMAIL_ADDRESS).to_string(),
        phone: digits_only(field(PHONE)),
        address: join_address(field(BILLING_ADDRESS), field(CITY)),
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn join_address(street: &str, city: &str) -> String {
    let joined = format!("{street}, {city}");
    let trimmed = joined.trim();
    let trimmed = trimmed.strip_prefix(',').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    trimmed.trim().to_string()
}
