use super::types::{REGEX_MISMATCH, ValidationLayer, ValidatorResult};
use crate::config::Config;

pub(super) fn check(result: &mut ValidatorResult, config: &Config) {
    if config.email_pattern().is_match(&result.email) {
        result.success = true;
    } else {
        result.fail(ValidationLayer::Regex, REGEX_MISMATCH);
    }
}
