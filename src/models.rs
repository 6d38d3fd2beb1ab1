//! Domain and wire types shared by the API client and the provider.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role value that marks a user as a car owner
pub const OWNER_ROLE: &str = "owner";

/// Authenticated user as returned by `/api/user/data`.
///
/// Known fields are picked out only when they have the expected type; anything
/// else, including a mistyped known field, stays in `extra` as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Fields the client does not model, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn is_owner(&self) -> bool {
        self.role.as_deref() == Some(OWNER_ROLE)
    }
}

impl From<Map<String, Value>> for User {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take(&mut fields, "_id"),
            name: take(&mut fields, "name"),
            email: take(&mut fields, "email"),
            role: take(&mut fields, "role"),
            image: take(&mut fields, "image"),
            extra: fields,
        }
    }
}

/// A vehicle listing, read as leniently as [`User`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct Car {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for Car {
    fn from(mut fields: Map<String, Value>) -> Self {
        Self {
            id: take(&mut fields, "_id"),
            brand: take(&mut fields, "brand"),
            model: take(&mut fields, "model"),
            image: take(&mut fields, "image"),
            year: take(&mut fields, "year"),
            category: take(&mut fields, "category"),
            price_per_day: take(&mut fields, "pricePerDay"),
            location: take(&mut fields, "location"),
            extra: fields,
        }
    }
}

/// Move `key` out of `fields` if it parses as `T`, otherwise leave it there
fn take<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let parsed = serde_json::from_value(fields.get(key)?.clone()).ok()?;
    fields.remove(key);
    Some(parsed)
}

/// Pickup/return date range picked in the search form.
///
/// The strings are whatever the UI last wrote; nothing here validates them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub pickup_date: String,
    pub return_date: String,
}

impl SearchFilters {
    /// Days between pickup and return, if both parse as `YYYY-MM-DD` and
    /// the range is not inverted.
    pub fn rental_days(&self) -> Option<i64> {
        let pickup = parse_date(&self.pickup_date)?;
        let ret = parse_date(&self.return_date)?;
        let days = (ret - pickup).num_days();
        (days >= 0).then_some(days)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

// Response types

/// Body of `GET /api/user/data`
#[derive(Debug, Default, Deserialize)]
pub struct UserDataResponse {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /api/user/cars`
#[derive(Debug, Default, Deserialize)]
pub struct CarsResponse {
    #[serde(default)]
    pub cars: Option<Vec<Car>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body the API sends alongside non-2xx statuses
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}
