use anyhow::{Context, Result};

use crate::args::OutputFormat;
use mailprobe_lib::{SmtpRequest, ValidatorResult};

const DETAIL_INDENT: &str = "        ";

pub fn write_reports(
    rows: &[ValidatorResult],
    format: OutputFormat,
    out: Option<&str>,
) -> Result<()> {
    match format {
        OutputFormat::Human => write_human(rows, out),
        OutputFormat::Json => write_json(rows, out),
        OutputFormat::Ndjson => write_ndjson(rows, out),
        OutputFormat::Csv => write_csv(rows, out),
    }
}

pub fn any_invalid(rows: &[ValidatorResult]) -> bool {
    rows.iter().any(|row| !row.success)
}

/// Human readable report of one address: a status line, then indented
/// details (mail servers, SMTP probes).
pub fn human_lines(row: &ValidatorResult) -> Vec<String> {
    let mut lines = Vec::new();
    if row.success {
        lines.push(format!("[OK]    {} ({})", row.email, row.validation_type));
    } else {
        let reasons = row
            .errors
            .iter()
            .map(|(layer, message)| format!("{layer}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        lines.push(format!(
            "[INVALID] {} ({}) :: {reasons}",
            row.email, row.validation_type
        ));
    }

    if !row.mail_servers.is_empty() {
        lines.push(format!(
            "{DETAIL_INDENT}mail servers: {}",
            row.mail_servers.join(", ")
        ));
    }
    for request in row.smtp_debug.iter().flatten() {
        lines.push(format!("{DETAIL_INDENT}smtp {}", probe_summary(request)));
    }
    lines
}

fn probe_summary(request: &SmtpRequest) -> String {
    let outcome = if request.response.rcptto {
        "accepted".to_string()
    } else {
        request
            .response
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    };
    format!("{} [{}]: {outcome}", request.host, request.response.state)
}

fn write_human(rows: &[ValidatorResult], out: Option<&str>) -> Result<()> {
    let mut text = String::new();
    for row in rows {
        for line in human_lines(row) {
            text.push_str(&line);
            text.push('\n');
        }
    }
    match out {
        Some(path) => write_all_atomically(path, text.as_bytes()),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[ValidatorResult], out: Option<&str>) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    if let Some(path) = out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[ValidatorResult], _: Option<&str>) -> Result<()> {
    anyhow::bail!("format=json nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(rows: &[ValidatorResult], out: Option<&str>) -> Result<()> {
    let mut buf = Vec::new();
    for row in rows {
        let line = serde_json::to_string(row)?;
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
    }
    match out {
        Some(path) => write_all_atomically(path, &buf),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&buf)?;
            Ok(())
        }
    }
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[ValidatorResult], _: Option<&str>) -> Result<()> {
    anyhow::bail!("format=ndjson nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-csv")]
fn write_csv(rows: &[ValidatorResult], out: Option<&str>) -> Result<()> {
    if let Some(path) = out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[ValidatorResult], _: Option<&str>) -> Result<()> {
    anyhow::bail!("format=csv nécessite la feature 'with-csv'")
}

/// email, domain, punycode domain, depth, success, errors, mail servers,
/// layers run.
#[cfg(feature = "with-csv")]
fn csv_record(row: &ValidatorResult) -> Vec<String> {
    let errors = row
        .errors
        .iter()
        .map(|(layer, message)| format!("{layer}: {message}"))
        .collect::<Vec<_>>()
        .join("|");
    let used = row
        .used_validations
        .iter()
        .map(|layer| layer.as_str())
        .collect::<Vec<_>>()
        .join("|");
    vec![
        row.email.clone(),
        row.domain.clone(),
        row.punycode_domain.clone(),
        row.validation_type.to_string(),
        row.success.to_string(),
        errors,
        row.mail_servers.join("|"),
        used,
    ]
}

fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mailprobe_lib::{
        SessionState, SmtpClientError, SmtpConnectionConfig, SmtpErrorStage, SmtpResponse,
        ValidationLayer, ValidationType,
    };

    use super::*;

    fn probe(host: &str, response: SmtpResponse) -> SmtpRequest {
        SmtpRequest {
            attempts: 2,
            email: "user@example.com".to_string(),
            host: host.to_string(),
            configuration: SmtpConnectionConfig {
                verifier_domain: "verifier.test".to_string(),
                verifier_email: "probe@verifier.test".to_string(),
                target_port: 25,
                connection_timeout: Duration::from_secs(2),
                response_timeout: Duration::from_secs(2),
            },
            response,
        }
    }

    #[test]
    fn accepted_address_lists_mail_servers() {
        let mut row = ValidatorResult::new("user@example.com", ValidationType::Mx);
        row.success = true;
        row.mail_servers = vec!["192.0.2.1".to_string(), "192.0.2.2".to_string()];

        insta::assert_snapshot!(human_lines(&row).join("\n"), @r"
        [OK]    user@example.com (mx)
                mail servers: 192.0.2.1, 192.0.2.2
        ");
    }

    #[test]
    fn rejected_address_shows_layer_error() {
        let mut row = ValidatorResult::new("x@bad.tld", ValidationType::Regex);
        row.errors.insert(
            ValidationLayer::DomainListMatch,
            "blacklisted email".to_string(),
        );

        insta::assert_snapshot!(
            human_lines(&row).join("\n"),
            @"[INVALID] x@bad.tld (regex) :: domain_list_match: blacklisted email"
        );
    }

    #[test]
    fn smtp_probes_are_listed() {
        let mut row = ValidatorResult::new("user@example.com", ValidationType::Smtp);
        row.mail_servers = vec!["192.0.2.1".to_string(), "192.0.2.2".to_string()];
        row.errors
            .insert(ValidationLayer::Smtp, "smtp error".to_string());
        row.smtp_debug = Some(vec![
            probe(
                "192.0.2.1",
                SmtpResponse {
                    rcptto: false,
                    state: SessionState::Connected,
                    errors: vec![SmtpClientError::new(
                        SmtpErrorStage::Connection,
                        "421 4.7.0 greylisted",
                    )],
                },
            ),
            probe(
                "192.0.2.2",
                SmtpResponse {
                    rcptto: false,
                    state: SessionState::RcptToSent,
                    errors: vec![SmtpClientError::new(
                        SmtpErrorStage::RcptTo,
                        "550 5.1.1 user unknown",
                    )],
                },
            ),
        ]);

        insta::assert_snapshot!(human_lines(&row).join("\n"), @r"
        [INVALID] user@example.com (smtp) :: smtp: smtp error
                mail servers: 192.0.2.1, 192.0.2.2
                smtp 192.0.2.1 [connected]: connection: 421 4.7.0 greylisted
                smtp 192.0.2.2 [rcpt_to_sent]: rcpt_to: 550 5.1.1 user unknown
        ");
    }

    #[test]
    fn whitelisted_address_reports_whitelist_depth() {
        let mut row = ValidatorResult::new("a@example.com", ValidationType::Smtp);
        row.success = true;
        row.validation_type = ValidationType::Whitelist;
        assert_eq!(human_lines(&row), vec!["[OK]    a@example.com (whitelist)"]);
        assert!(!any_invalid(&[row]));
    }

    #[test]
    fn atomic_write_replaces_target() {
        let dir = std::env::temp_dir().join(format!("mailprobe-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.txt");
        let path = path.to_str().unwrap();

        write_all_atomically(path, b"first").unwrap();
        write_all_atomically(path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
        assert!(!std::path::Path::new(&format!("{path}.tmp")).exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
