//! Types used throughout.
//!
//! > Schema defines the plain old data types that views operate on. Notably, the schema module has
//! > no knowledge of the database, nor any dependencies on any of the rest of the system.
//!
//! (The `QueryableByName` derives only describe how a row is shaped; the SQL lives in the query
//! catalog.)

use diesel::sql_types::{Integer, Text};
use serde_derive::Serialize;

/// A member of the site, i.e. somebody who travels.
#[derive(Clone, Debug, Eq, PartialEq, QueryableByName, Serialize)]
pub struct User {
    /// The user's database ID.
    #[sql_type = "Integer"]
    pub id: i32,

    /// The user's name.
    #[sql_type = "Text"]
    pub name: String,

    /// The colour the user's countries are drawn in. Any CSS colour.
    #[sql_type = "Text"]
    pub colour: String,
}

/// A country that matched a name lookup.
#[derive(Clone, Debug, Eq, PartialEq, QueryableByName, Serialize)]
pub struct CountryMatch {
    /// The two-letter country code.
    #[sql_type = "Text"]
    pub country_code: String,

    /// The country's English name.
    #[sql_type = "Text"]
    pub country_name: String,
}
