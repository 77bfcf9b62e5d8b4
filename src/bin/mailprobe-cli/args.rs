use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mailprobe_lib::config::{
    DEFAULT_CONNECTION_ATTEMPTS, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT,
    DEFAULT_SMTP_PORT,
};
use mailprobe_lib::{Config, ValidationType};

#[derive(Parser)]
#[command(name = "mailprobe-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// écrit le rapport dans un fichier (écriture atomique)
    #[arg(long)]
    pub out: Option<String>,

    /// format de sortie
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// profondeur: regex|mx|mx_blacklist|smtp (défaut: --default-type)
    #[arg(long = "type")]
    pub validation_type: Option<ValidationType>,

    /// verbosité des logs sur stderr (-v info, -vv debug, -vvv trace); RUST_LOG a priorité
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// adresse utilisée pour MAIL FROM
    #[arg(long)]
    pub verifier_email: Option<String>,

    /// domaine annoncé en EHLO/HELO (défaut: domaine de --verifier-email)
    #[arg(long)]
    pub verifier_domain: Option<String>,

    /// profondeur par défaut
    #[arg(long)]
    pub default_type: Option<ValidationType>,

    /// timeout de connexion (secondes)
    #[arg(long, default_value_t = DEFAULT_CONNECTION_TIMEOUT)]
    pub connection_timeout: u64,

    /// timeout par réponse SMTP (secondes)
    #[arg(long, default_value_t = DEFAULT_RESPONSE_TIMEOUT)]
    pub response_timeout: u64,

    /// nombre de tentatives par requête DNS
    #[arg(long, default_value_t = DEFAULT_CONNECTION_ATTEMPTS)]
    pub connection_attempts: u32,

    /// domaine accepté sans sonde (répétable)
    #[arg(long = "whitelist")]
    pub whitelist: Vec<String>,

    /// n'accepte que les domaines de la whitelist, puis sonde
    #[arg(long)]
    pub whitelist_validation: bool,

    /// domaine refusé (répétable)
    #[arg(long = "blacklist")]
    pub blacklist: Vec<String>,

    /// IPv4 de serveur MX refusée (répétable)
    #[arg(long = "blacklisted-mx-ip")]
    pub blacklisted_mx_ips: Vec<String>,

    /// serveur DNS: A.B.C.D ou A.B.C.D:port (défaut: configuration système)
    #[arg(long)]
    pub dns: Option<String>,

    /// profondeur imposée pour un domaine: DOMAINE=TYPE (répétable)
    #[arg(long = "type-by-domain", value_parser = parse_type_by_domain)]
    pub type_by_domain: Vec<(String, ValidationType)>,

    /// pas de repli CNAME/A quand le domaine n'a pas de MX
    #[arg(long)]
    pub not_rfc_mx_lookup_flow: bool,

    /// port SMTP des serveurs cibles
    #[arg(long, default_value_t = DEFAULT_SMTP_PORT)]
    pub smtp_port: u16,

    /// s'arrête au premier serveur SMTP en échec
    #[arg(long)]
    pub smtp_fail_fast: bool,

    /// accepte les refus SMTP sans rapport avec la boîte aux lettres
    #[arg(long)]
    pub smtp_safe_check: bool,

    /// regex de validation des adresses
    #[arg(long)]
    pub email_pattern: Option<String>,

    /// regex des réponses SMTP signalant une boîte inexistante
    #[arg(long)]
    pub smtp_error_body_pattern: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// valide une adresse
    Validate { email: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Ndjson,
    Csv,
}

impl Cli {
    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn build_config(&self) -> Result<Config> {
        let verifier_email = self
            .verifier_email
            .as_deref()
            .context("--verifier-email is required")?;

        let mut builder = Config::builder(verifier_email)
            .connection_timeout(self.connection_timeout)
            .response_timeout(self.response_timeout)
            .connection_attempts(self.connection_attempts)
            .whitelisted_domains(self.whitelist.iter().cloned())
            .whitelist_validation(self.whitelist_validation)
            .blacklisted_domains(self.blacklist.iter().cloned())
            .blacklisted_mx_ip_addresses(self.blacklisted_mx_ips.iter().cloned())
            .not_rfc_mx_lookup_flow(self.not_rfc_mx_lookup_flow)
            .smtp_port(self.smtp_port)
            .smtp_fail_fast(self.smtp_fail_fast)
            .smtp_safe_check(self.smtp_safe_check);

        if let Some(domain) = &self.verifier_domain {
            builder = builder.verifier_domain(domain);
        }
        if let Some(default_type) = self.default_type {
            builder = builder.validation_type_default(default_type);
        }
        if let Some(dns) = &self.dns {
            builder = builder.dns(dns);
        }
        for (domain, validation_type) in &self.type_by_domain {
            builder = builder.validation_type_for_domain(domain, *validation_type);
        }
        if let Some(pattern) = &self.email_pattern {
            builder = builder.email_pattern(pattern);
        }
        if let Some(pattern) = &self.smtp_error_body_pattern {
            builder = builder.smtp_error_body_pattern(pattern);
        }

        builder.build().context("invalid configuration")
    }

    /// Default log directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn parse_type_by_domain(value: &str) -> Result<(String, ValidationType), String> {
    let (domain, validation_type) = value
        .split_once('=')
        .ok_or_else(|| format!("expected DOMAIN=TYPE, got '{value}'"))?;
    let validation_type = validation_type
        .parse::<ValidationType>()
        .map_err(|err| err.to_string())?;
    Ok((domain.to_string(), validation_type))
}
