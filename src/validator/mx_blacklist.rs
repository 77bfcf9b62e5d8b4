use tracing::debug;

use super::types::{BLACKLISTED_MX_IP, ValidationLayer, ValidatorResult};
use crate::config::Config;

pub(super) fn check(result: &mut ValidatorResult, config: &Config) {
    let blacklisted = config.blacklisted_mx_ip_addresses();
    match result
        .mail_servers
        .iter()
        .find(|server| blacklisted.contains(server))
        .cloned()
    {
        Some(server) => {
            debug!(server = %server, "mail server is blacklisted");
            result.fail(ValidationLayer::MxBlacklist, BLACKLISTED_MX_IP);
        }
        None => result.success = true,
    }
}
