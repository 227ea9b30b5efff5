use serde::Serialize;

pub const REGISTRATION_MESSAGE: &str =
    "Registration request sent successfully! An officer will review your application.";

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Healthz {
        name: &'a str,
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Registration {
        message: &'a str,
    },
}
