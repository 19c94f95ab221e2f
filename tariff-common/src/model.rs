//! Canonical offer schema handed to the persistence collaborator.
//!
//! Field names and nullability mirror the warehouse tables, so the serde
//! representation of these types is the contract with downstream loading.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire value standing for an unbounded allowance.
pub const UNLIMITED_SENTINEL: f64 = 999_999.0;
/// Wire value standing for a quantity that could not be read from free text.
pub const UNKNOWN_SENTINEL: f64 = -1.0;
/// `error_details` of a run that completed without error.
pub const NO_ERROR: &str = "no error";

/// An allowance dimension (data, minutes, SMS) of an offer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    /// A measured amount in the dimension's unit (GB, minutes, messages).
    Measured(f64),
    /// The offer advertises no limit.
    Unlimited,
    /// The dimension applies but its amount could not be parsed.
    Unknown,
    /// The dimension does not exist for this product category.
    NotApplicable,
}

impl Quantity {
    /// Encode for the warehouse: `null`, `-1`, the unlimited sentinel, or the amount.
    pub fn to_wire(self) -> Option<f64> {
        match self {
            Self::Measured(x) => Some(x),
            Self::Unlimited => Some(UNLIMITED_SENTINEL),
            Self::Unknown => Some(UNKNOWN_SENTINEL),
            Self::NotApplicable => None,
        }
    }

    pub fn from_wire(value: Option<f64>) -> Self {
        match value {
            None => Self::NotApplicable,
            Some(x) if x == UNKNOWN_SENTINEL => Self::Unknown,
            Some(x) if x == UNLIMITED_SENTINEL => Self::Unlimited,
            Some(x) => Self::Measured(x),
        }
    }

    pub fn is_applicable(self) -> bool {
        !matches!(self, Self::NotApplicable)
    }

    pub fn measured(self) -> Option<f64> {
        match self {
            Self::Measured(x) => Some(x),
            _ => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured(x) => write!(f, "{x}"),
            Self::Unlimited => write!(f, "unlimited"),
            Self::Unknown => write!(f, "unknown"),
            Self::NotApplicable => write!(f, "n/a"),
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_wire() {
            Some(x) => serializer.serialize_f64(x),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<f64>::deserialize(deserializer).map(Quantity::from_wire)
    }
}

/// The warehouse stores SMS counts as integers. A fractional count is an
/// error, never rounded.
mod integer_quantity {
    use super::Quantity;
    use serde::ser::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(q: &Quantity, serializer: S) -> Result<S::Ok, S::Error> {
        match q.to_wire() {
            Some(x) if x.fract() == 0.0 => serializer.serialize_i64(x as i64),
            Some(x) => Err(S::Error::custom(format!("sms count {x} is not a whole number"))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Quantity, D::Error> {
        Option::<f64>::deserialize(deserializer).map(Quantity::from_wire)
    }
}

/// Closed set of product categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    MobilePrepaid,
    MobileSubscription,
    InternetSubscription,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 3] = [
        Self::MobilePrepaid,
        Self::MobileSubscription,
        Self::InternetSubscription,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MobilePrepaid => "mobile_prepaid",
            Self::MobileSubscription => "mobile_subscription",
            Self::InternetSubscription => "internet_subscription",
        }
    }

    pub fn is_mobile(self) -> bool {
        self.as_str().contains("mobile")
    }

    pub fn is_internet(self) -> bool {
        self.as_str().contains("internet")
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One competitor offer, normalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_name: String,
    pub competitor_name: String,
    pub product_category: ProductCategory,
    pub product_url: String,
    pub price: f64,
    pub scraped_at: NaiveDate,
    pub data: Quantity,
    pub minutes: Quantity,
    #[serde(with = "integer_quantity")]
    pub sms: Quantity,
    pub upload_speed: Option<String>,
    pub download_speed: Option<String>,
}

/// A synthesized mobile + internet bundle. Never scraped directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackRecord {
    pub competitor_name: String,
    pub pack_name: String,
    pub pack_url: String,
    pub pack_description: Option<String>,
    pub price: f64,
    pub scraped_at: NaiveDate,
    pub mobile_product_name: Option<String>,
    pub internet_product_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Outcome of one competitor run, as consumed by the `logs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub competitor_name: String,
    pub scraped_at: NaiveDate,
    pub error_details: String,
    pub status: RunStatus,
}

impl LogRecord {
    pub fn success(competitor: impl Into<String>, scraped_at: NaiveDate) -> Self {
        Self {
            competitor_name: competitor.into(),
            scraped_at,
            error_details: NO_ERROR.to_string(),
            status: RunStatus::Success,
        }
    }

    pub fn failed(
        competitor: impl Into<String>,
        scraped_at: NaiveDate,
        details: impl Into<String>,
    ) -> Self {
        Self {
            competitor_name: competitor.into(),
            scraped_at,
            error_details: details.into(),
            status: RunStatus::Failed,
        }
    }
}

/// Kind of payload handed to the persistence collaborator; doubles as the
/// single top-level key of that payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Products,
    Packs,
    Logs,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Packs => "packs",
            Self::Logs => "logs",
        }
    }

    /// Wrap `records` as `{"<kind>": [...]}`.
    pub fn payload<T: Serialize>(self, records: &[T]) -> serde_json::Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert(self.as_str().to_string(), serde_json::to_value(records)?);
        Ok(serde_json::Value::Object(map))
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
