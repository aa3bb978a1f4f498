use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Upper bound on the recent attendance listing, whatever `RECENT_LIMIT` says.
pub const MAX_RECENT: u32 = 10;

/// How the attendee name is chosen for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum IdentityPolicy {
    /// Every submission is recorded under the placeholder name.
    FixedLabel,
    /// Ask the recognizer; unrecognized faces fall back to the placeholder name.
    Recognized,
}

/// What to do when no liveness checker is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LivenessFallback {
    /// Treat every image as live. Weakens spoof protection.
    FailOpen,
    /// Refuse to start.
    FailClosed,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,
    pub image_dir: PathBuf,
    pub dashboard_path: Option<PathBuf>,

    // Attendance policy
    pub placeholder_name: String,
    pub identity_policy: IdentityPolicy,
    pub liveness_fallback: LivenessFallback,
    pub recent_limit: u32,

    // External collaborators
    pub face_detector_cmd: Option<String>,
    pub liveness_cmd: Option<String>,
    pub recognizer_cmd: Option<String>,

    // Limits
    pub json_limit_bytes: usize,
    pub rate_submit_per_min: u32,

    /// Browser origins allowed to call the API. Empty means any origin.
    pub cors_origins: Vec<String>,

    // Logging
    pub log_dir: PathBuf,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let recent_limit: u32 = parse(&get_or("RECENT_LIMIT", "10"), "RECENT_LIMIT")?;

        Ok(Self {
            server_addr: get_or("SERVER_ADDR", "0.0.0.0:5000"),
            database_url: get_or("DATABASE_URL", "sqlite://attendance.db"),
            image_dir: PathBuf::from(get_or("IMAGE_DIR", "attendance_images")),
            dashboard_path: get("DASHBOARD_PATH").map(PathBuf::from),

            placeholder_name: get_or("PLACEHOLDER_NAME", "Unknown Person"),
            identity_policy: parse(&get_or("IDENTITY_POLICY", "fixed_label"), "IDENTITY_POLICY")?,
            liveness_fallback: parse(
                &get_or("LIVENESS_FALLBACK", "fail_closed"),
                "LIVENESS_FALLBACK",
            )?,
            recent_limit: recent_limit.clamp(1, MAX_RECENT),

            face_detector_cmd: get("FACE_DETECTOR_CMD"),
            liveness_cmd: get("LIVENESS_CMD"),
            recognizer_cmd: get("RECOGNIZER_CMD"),

            json_limit_bytes: parse(&get_or("JSON_LIMIT_BYTES", "10485760"), "JSON_LIMIT_BYTES")?,
            rate_submit_per_min: parse(&get_or("RATE_SUBMIT_PER_MIN", "60"), "RATE_SUBMIT_PER_MIN")?,
            cors_origins: get_or("CORS_ORIGINS", "*")
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty() && *o != "*")
                .map(str::to_string)
                .collect(),

            log_dir: PathBuf::from(get_or("LOG_DIR", "logs")),
            log_level: parse(&get_or("LOG_LEVEL", "info"), "LOG_LEVEL")?,
        })
    }
}

fn parse<T>(raw: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("invalid value {:?} for {}", raw, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:5000");
        assert_eq!(config.database_url, "sqlite://attendance.db");
        assert_eq!(config.image_dir, PathBuf::from("attendance_images"));
        assert_eq!(config.placeholder_name, "Unknown Person");
        assert_eq!(config.identity_policy, IdentityPolicy::FixedLabel);
        assert_eq!(config.liveness_fallback, LivenessFallback::FailClosed);
        assert_eq!(config.recent_limit, 10);
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert!(config.face_detector_cmd.is_none());
        assert!(config.dashboard_path.is_none());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn policies_parse_from_snake_case() {
        let config = config_with(&[
            ("IDENTITY_POLICY", "recognized"),
            ("LIVENESS_FALLBACK", "fail_open"),
        ])
        .unwrap();
        assert_eq!(config.identity_policy, IdentityPolicy::Recognized);
        assert_eq!(config.liveness_fallback, LivenessFallback::FailOpen);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = config_with(&[("LIVENESS_FALLBACK", "maybe")]).unwrap_err();
        assert!(format!("{:#}", err).contains("LIVENESS_FALLBACK"));
    }

    #[test]
    fn recent_limit_is_capped() {
        let config = config_with(&[("RECENT_LIMIT", "50")]).unwrap();
        assert_eq!(config.recent_limit, MAX_RECENT);

        let config = config_with(&[("RECENT_LIMIT", "3")]).unwrap();
        assert_eq!(config.recent_limit, 3);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_with(&[("FACE_DETECTOR_CMD", "   "), ("SERVER_ADDR", "")]).unwrap();
        assert!(config.face_detector_cmd.is_none());
        assert_eq!(config.server_addr, "0.0.0.0:5000");
    }

    #[test]
    fn cors_origins_are_comma_separated() {
        let config = config_with(&[(
            "CORS_ORIGINS",
            "http://kiosk.local:8080, https://hr.example.com,",
        )])
        .unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["http://kiosk.local:8080", "https://hr.example.com"]
        );

        let config = config_with(&[("CORS_ORIGINS", "*")]).unwrap();
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn env_example_parses_and_names_no_collaborator_programs() {
        let vars: HashMap<String, String> =
            dotenvy::from_read_iter(include_str!("../.env.example").as_bytes())
                .collect::<Result<_, _>>()
                .unwrap();
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        // Copying the example as-is must fail at startup, not on every submit.
        assert!(config.face_detector_cmd.is_none());
        assert!(config.liveness_cmd.is_none());
        assert!(config.recognizer_cmd.is_none());
        assert!(crate::detection::Collaborators::from_config(&config).is_err());
    }
}
