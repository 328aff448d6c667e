use clap::{Args, Parser};
use std::path::PathBuf;

/// Service configuration, parsed from the command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "availability-server")]
#[command(about = "Item availability and course reserves service")]
pub struct ServiceConfig {
    /// Service port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// ILS Connector API URL
    #[arg(long = "ils", default_value = "https://ils-connector.lib.virginia.edu")]
    pub ils_api: String,
    /// JWT signature key
    #[arg(long = "jwtkey")]
    pub jwt_key: String,
    /// Solr URL
    #[arg(long = "solr")]
    pub solr_url: String,
    /// Solr core
    #[arg(long = "core", default_value = "test_core")]
    pub solr_core: String,
    /// Virgo base URL used for patron-facing item links
    #[arg(long = "virgo", default_value = "https://search.lib.virginia.edu")]
    pub virgo_url: String,
    /// Health sciences ILLiad URL for scan requests
    #[arg(long = "hsilliad")]
    pub hsl_illiad_url: String,
    /// Course reserves mailbox
    #[arg(long = "cremail")]
    pub course_reserve_email: String,
    /// Law reserves mailbox
    #[arg(long = "lawemail")]
    pub law_reserve_email: String,
    /// Directory holding maps.csv and map_lookups.csv
    #[arg(long = "mapdata", default_value = "./data")]
    pub map_data: PathBuf,
    #[command(flatten)]
    pub smtp: SmtpConfig,
}

#[derive(Args, Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP host
    #[arg(long = "smtphost", default_value = "localhost")]
    pub host: String,
    /// SMTP port
    #[arg(long = "smtpport", default_value_t = 25)]
    pub port: u16,
    /// SMTP user
    #[arg(long = "smtpuser", default_value = "")]
    pub user: String,
    /// SMTP password; when empty the connection is unauthenticated
    #[arg(long = "smtppass", default_value = "")]
    pub pass: String,
    /// From address for service-sent mail
    #[arg(long = "smtpsender", default_value = "no-reply@virginia.edu")]
    pub sender: String,
    /// Log rendered messages instead of delivering them
    #[arg(long = "stubsmtp", default_value_t = false)]
    pub dev_mode: bool,
}
