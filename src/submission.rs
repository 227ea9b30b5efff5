use secrecy::SecretString;
use serde_json::{Map, Value};

use crate::errors::BackendError;

/// The keys every submission must carry, as they appear in the JSON body.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "name",
    "dob",
    "aadhaar_number",
    "voter_id",
    "phone_number",
    "photo",
];

/// A registration request that has been parsed and checked for the
/// required fields.
pub struct Submission {
    pub name: String,
    pub date_of_birth: String,

    /// The national ID number. Only ever hashed.
    pub id_number: SecretString,

    /// As submitted; normalized on insertion.
    pub voter_id: String,

    pub phone_number: String,

    /// Base64 image data, optionally with a data-URI header.
    pub photo: String,
}

impl Submission {
    /// Parses a request body.
    ///
    /// Fails with `MalformedRequest` if the body isn't a non-empty JSON
    /// object, and with `MissingFields` listing every required key that
    /// is absent, empty, or not a string.
    pub fn parse(body: &[u8]) -> Result<Self, BackendError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| BackendError::MalformedRequest)?;

        let mut object = match value {
            Value::Object(object) if !object.is_empty() => object,
            _ => return Err(BackendError::MalformedRequest),
        };

        let mut missing = Vec::new();
        let [name, date_of_birth, id_number, voter_id, phone_number, photo] =
            REQUIRED_FIELDS.map(|key| take_field(&mut object, key, &mut missing));

        if !missing.is_empty() {
            return Err(BackendError::MissingFields(missing));
        }

        Ok(Submission {
            name,
            date_of_birth,
            id_number: SecretString::new(id_number),
            voter_id,
            phone_number,
            photo,
        })
    }
}

fn take_field(
    object: &mut Map<String, Value>,
    key: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match object.remove(key) {
        Some(Value::String(value)) if !value.is_empty() => value,
        _ => {
            missing.push(key);
            String::new()
        }
    }
}
