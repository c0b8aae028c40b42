//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted NFC tag identifier.
const MAX_TAG_LEN: usize = 64;

/// Validates that a song title is not blank once trimmed.
pub fn validate_song_title(song: &str) -> Result<(), ValidationError> {
    if song.trim().is_empty() {
        let mut err = ValidationError::new("song_blank");
        err.message = Some("Song must not be blank".into());
        return Err(err);
    }

    Ok(())
}

/// Validates an NFC tag id: 1 to 64 ASCII letters, digits, `-` or `_`.
///
/// ```ignore
/// validate_nfc_tag_id("1234567")    // Ok
/// validate_nfc_tag_id("direct-url") // Ok
/// validate_nfc_tag_id("12 34")      // Err - whitespace
/// ```
pub fn validate_nfc_tag_id(tag: &str) -> Result<(), ValidationError> {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        let mut err = ValidationError::new("nfctagid_length");
        err.message = Some(
            format!(
                "NFC tag id must be 1 to {MAX_TAG_LEN} characters (got {})",
                tag.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("nfctagid_format");
        err.message = Some("NFC tag id may only contain letters, digits, '-' and '_'".into());
        return Err(err);
    }

    Ok(())
}
