use regex::Regex;
use tracing::debug;

use super::types::{SMTP_ERROR, ValidationLayer, ValidatorResult};
use crate::cancel::Cancellation;
use crate::config::Config;
use crate::smtp::SmtpRequest;

/// Probes the mail servers in order until one accepts the recipient.
///
/// With safe check enabled, a call where every server refused is still a
/// success when none of the refusals looks like "unknown mailbox" according to
/// the configured body pattern. The probes are then kept in `smtp_debug`.
pub(super) fn check(result: &mut ValidatorResult, config: &Config) {
    let mut requests = Vec::new();
    let mut accepted = false;

    for host in &result.mail_servers {
        if config.cancellation().is_some_and(Cancellation::is_cancelled) {
            debug!("smtp probing cancelled");
            break;
        }
        let mut request = SmtpRequest::new(config, host.as_str(), result.punycode_email.as_str());
        accepted = request.run();
        requests.push(request);
        if accepted {
            break;
        }
        if config.smtp_fail_fast() {
            debug!(host = host.as_str(), "stopping after first failed host");
            break;
        }
    }

    if accepted {
        result.success = true;
    } else if config.smtp_safe_check()
        && !requests.is_empty()
        && !mailbox_rejected(&requests, config.smtp_error_body_pattern())
    {
        debug!(probes = requests.len(), "no mailbox rejection among smtp errors");
        result.success = true;
    } else {
        result.fail(ValidationLayer::Smtp, SMTP_ERROR);
    }

    if config.smtp_safe_check() {
        result.smtp_debug = Some(requests);
    }
}

fn mailbox_rejected(requests: &[SmtpRequest], pattern: &Regex) -> bool {
    requests
        .iter()
        .flat_map(SmtpRequest::error_messages)
        .any(|message| pattern.is_match(message))
}
