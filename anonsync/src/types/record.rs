use mongodb::bson::DateTime;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Primary key of a customer record.
///
/// Object ids are opaque but totally ordered and assigned monotonically, which
/// is what makes them usable as a reindex cursor position.
pub type CustomerId = ObjectId;

/// A customer record as stored in the source collection.
///
/// The same shape is used for the anonymized output record: the personal
/// fields are replaced with digests while `_id` is preserved unchanged as the
/// join key between the two collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: Address,
    pub created_at: DateTime,
}

/// Structured postal address embedded in a [`Customer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: String,
    pub postcode: String,
    pub city: String,
    pub state: String,
    pub country: String,
}
