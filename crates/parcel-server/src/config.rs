use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Cancellation windows are capped at thirty days.
const MAX_CANCELLATION_WINDOW_HOURS: i64 = 720;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub fallback_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// `None` selects the built-in simulated carrier.
    pub carrier_api_url: Option<String>,
    pub compliance_surcharge_cents: i64,
    pub cancellation_window_hours: i64,
    pub sync_interval_secs: u64,
    /// Browser origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("PARCEL_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PARCEL_JWT_SECRET is unset or still a placeholder; it must match the identity provider's signing secret");
        }

        let value = |key: &str, default: &str| -> String {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let cancellation_window_hours: i64 = value("PARCEL_CANCELLATION_WINDOW_HOURS", "24")
            .parse()
            .context("PARCEL_CANCELLATION_WINDOW_HOURS")?;
        if !(1..=MAX_CANCELLATION_WINDOW_HOURS).contains(&cancellation_window_hours) {
            bail!(
                "PARCEL_CANCELLATION_WINDOW_HOURS must be between 1 and {}, got {}",
                MAX_CANCELLATION_WINDOW_HOURS,
                cancellation_window_hours
            );
        }

        let sync_interval_secs: u64 = value("PARCEL_SYNC_INTERVAL_SECS", "300")
            .parse()
            .context("PARCEL_SYNC_INTERVAL_SECS")?;
        if sync_interval_secs == 0 {
            bail!("PARCEL_SYNC_INTERVAL_SECS must be at least 1");
        }

        let cors_origins: Vec<String> = get("PARCEL_CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            jwt_secret,
            db_path: value("PARCEL_DB_PATH", "parcelport.db").into(),
            fallback_dir: value("PARCEL_FALLBACK_DIR", "./fallback-bookings").into(),
            host: value("PARCEL_HOST", "0.0.0.0"),
            port: value("PARCEL_PORT", "3000").parse().context("PARCEL_PORT")?,
            carrier_api_url: get("PARCEL_CARRIER_API_URL").filter(|v| !v.trim().is_empty()),
            compliance_surcharge_cents: value("PARCEL_COMPLIANCE_SURCHARGE_CENTS", "200")
                .parse()
                .context("PARCEL_COMPLIANCE_SURCHARGE_CENTS")?,
            cancellation_window_hours,
            sync_interval_secs,
            cors_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("PARCEL_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("parcelport.db"));
        assert_eq!(config.port, 3000);
        assert_eq!(config.carrier_api_url, None);
        assert_eq!(config.compliance_surcharge_cents, 200);
        assert_eq!(config.cancellation_window_hours, 24);
        assert_eq!(config.sync_interval_secs, 300);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("PARCEL_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let custom = config(&[
            ("PARCEL_JWT_SECRET", "s3cret"),
            ("PARCEL_PORT", "8080"),
            ("PARCEL_CARRIER_API_URL", "https://carrier.example/api"),
            ("PARCEL_CANCELLATION_WINDOW_HOURS", "48"),
        ])
        .unwrap();
        assert_eq!(custom.port, 8080);
        assert_eq!(custom.carrier_api_url.as_deref(), Some("https://carrier.example/api"));
        assert_eq!(custom.cancellation_window_hours, 48);

        assert!(config(&[("PARCEL_JWT_SECRET", "s3cret"), ("PARCEL_PORT", "http")]).is_err());
    }

    #[test]
    fn cancellation_window_must_be_bounded() {
        for hours in ["0", "-5", "10000000000", "721"] {
            let result = config(&[
                ("PARCEL_JWT_SECRET", "s3cret"),
                ("PARCEL_CANCELLATION_WINDOW_HOURS", hours),
            ]);
            assert!(result.is_err(), "{hours} hours was accepted");
        }

        let month = config(&[
            ("PARCEL_JWT_SECRET", "s3cret"),
            ("PARCEL_CANCELLATION_WINDOW_HOURS", "720"),
        ])
        .unwrap();
        assert_eq!(month.cancellation_window_hours, 720);
    }

    #[test]
    fn zero_sync_interval_is_rejected() {
        let result = config(&[
            ("PARCEL_JWT_SECRET", "s3cret"),
            ("PARCEL_SYNC_INTERVAL_SECS", "0"),
        ]);
        assert!(result.is_err());

        let fast = config(&[
            ("PARCEL_JWT_SECRET", "s3cret"),
            ("PARCEL_SYNC_INTERVAL_SECS", "1"),
        ])
        .unwrap();
        assert_eq!(fast.sync_interval_secs, 1);
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = config(&[
            ("PARCEL_JWT_SECRET", "s3cret"),
            ("PARCEL_CORS_ORIGINS", " https://portal.example , ,http://localhost:5173"),
        ])
        .unwrap();
        assert_eq!(
            config.cors_origins,
            ["https://portal.example", "http://localhost:5173"]
        );
    }
}
