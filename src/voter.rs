use std::fmt;
use std::str::FromStr;

use time::OffsetDateTime;

use crate::fingerprint::Fingerprint;
use crate::normalization::normalize_voter_id;
use crate::photo::PhotoReference;

/// The review state of a registration. Only `Pending` is ever written
/// here; the others belong to whoever reviews applications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoterStatus {
    Pending,
    Approved,
    Rejected,
}

impl VoterStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VoterStatus::Pending => "pending",
            VoterStatus::Approved => "approved",
            VoterStatus::Rejected => "rejected",
        }
    }
}

impl Default for VoterStatus {
    fn default() -> Self {
        VoterStatus::Pending
    }
}

impl fmt::Display for VoterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown voter status {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for VoterStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VoterStatus::Pending),
            "approved" => Ok(VoterStatus::Approved),
            "rejected" => Ok(VoterStatus::Rejected),
            _ => Err(UnknownStatus(s.to_owned())),
        }
    }
}

/// A registration that has passed validation and whose photo has been
/// stored, ready to be inserted.
#[derive(Clone, Debug)]
pub struct NewVoter {
    pub(crate) name: String,
    pub(crate) date_of_birth: String,
    pub(crate) fingerprint: Fingerprint,

    /// Always uppercase.
    pub(crate) voter_id: String,

    pub(crate) phone_number: String,
    pub(crate) photo: PhotoReference,
}

impl NewVoter {
    pub fn new(
        name: String,
        date_of_birth: String,
        fingerprint: Fingerprint,
        voter_id: &str,
        phone_number: String,
        photo: PhotoReference,
    ) -> Self {
        NewVoter {
            name,
            date_of_birth,
            fingerprint,
            voter_id: normalize_voter_id(voter_id),
            phone_number,
            photo,
        }
    }
}

/// A single row of the `voters` table.
#[derive(Clone, Debug)]
pub struct VoterRecord {
    pub id: i64,
    pub name: String,
    pub date_of_birth: String,
    pub id_fingerprint: String,
    pub voter_id: String,
    pub phone_number: String,
    pub photo_reference: String,
    pub status: VoterStatus,
    pub registered_at: OffsetDateTime,
}

impl VoterRecord {
    pub fn new(id: i64, registered_at: OffsetDateTime, voter: NewVoter) -> Self {
        VoterRecord {
            id,
            name: voter.name,
            date_of_birth: voter.date_of_birth,
            id_fingerprint: voter.fingerprint.as_str().to_owned(),
            voter_id: voter.voter_id,
            phone_number: voter.phone_number,
            photo_reference: voter.photo.to_db_string(),
            status: VoterStatus::default(),
            registered_at,
        }
    }
}
