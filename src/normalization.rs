/// Normalizes a voter ID by converting it to uppercase.
///
/// ```
/// use voter_registry::normalization::normalize_voter_id;
/// assert_eq!(normalize_voter_id("ab123"), "AB123");
/// ```
pub fn normalize_voter_id(voter_id: impl AsRef<str>) -> String {
    voter_id.as_ref().to_uppercase()
}
