//! Channel and group name validation.
//!
//! The contract is fixed: names are 1 to [`MAX_NAME_LENGTH`] characters of
//! ASCII alphanumerics plus `-`, `_` and `.`. Channel names may additionally
//! carry a single `!` marking a process-specific channel; everything after it
//! follows the same character set and may be empty.

/// Longest accepted channel or group name, in bytes.
pub const MAX_NAME_LENGTH: usize = 100;

fn valid_chars(part: &str) -> bool {
    part.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Whether `name` is a well-formed channel name.
#[must_use]
pub fn valid_channel_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return false;
    }
    match name.split_once('!') {
        Some((base, specific)) => !base.is_empty() && valid_chars(base) && valid_chars(specific),
        None => valid_chars(name),
    }
}

/// Whether `name` is a well-formed group name.
#[must_use]
pub fn valid_group_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_NAME_LENGTH && valid_chars(name)
}
