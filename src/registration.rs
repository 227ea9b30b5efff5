use log::{debug, o};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::fingerprint::Fingerprint;
use crate::submission::Submission;
use crate::voter::{NewVoter, VoterRecord};

/// Runs the whole write path for one request body: parse and validate,
/// fingerprint the ID number, store the photo, insert the row.
///
/// Each step runs at most once. A failure before the insert leaves no
/// row behind; a failed insert may leave the photo file orphaned.
/// Duplicates are detected only by the insert itself, never by looking
/// the voter up first.
pub async fn register(environment: &Environment, body: &[u8]) -> Result<VoterRecord, BackendError> {
    let logger = &environment.logger;

    debug!(logger, "Parsing submission...");
    let Submission {
        name,
        date_of_birth,
        id_number,
        voter_id,
        phone_number,
        photo,
    } = Submission::parse(body)?;

    let fingerprint = Fingerprint::of(&id_number);
    drop(id_number);

    let logger = logger.new(o!("fingerprint" => fingerprint.abbreviated().to_owned()));

    debug!(logger, "Saving photo...");
    let photo = environment
        .store
        .save(&photo, fingerprint.as_str())
        .await
        .map_err(|source| BackendError::PhotoProcessing { source })?;
    debug!(logger, "Saved photo"; "path" => %photo);

    debug!(logger, "Writing registration to database...");
    let voter = NewVoter::new(
        name,
        date_of_birth,
        fingerprint,
        &voter_id,
        phone_number,
        photo,
    );
    let record = environment.db.insert(voter).await?;
    debug!(logger, "Stored registration"; "id" => record.id, "voter_id" => &record.voter_id);

    Ok(record)
}
