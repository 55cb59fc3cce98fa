use std::env;
use std::net::SocketAddr;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Look-around, in hours, when scanning a professor's calendar for overlaps.
    pub professor_scan_window_hours: i64,
    pub report_default_days: i64,
    pub report_page_size: usize,
    pub agendamento_page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://escola.db?mode=rwc".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            professor_scan_window_hours: 4,
            report_default_days: 30,
            report_page_size: 25,
            agendamento_page_size: 20,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);
        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::BadRequest(format!("BIND_ADDR is invalid: {}", raw)))?,
            None => defaults.bind_addr,
        };

        let config = Self {
            database_url,
            bind_addr,
            professor_scan_window_hours: parse_positive(
                &lookup,
                "PROFESSOR_SCAN_WINDOW_HOURS",
                defaults.professor_scan_window_hours,
            )?,
            report_default_days: parse_positive(
                &lookup,
                "REPORT_DEFAULT_DAYS",
                defaults.report_default_days,
            )?,
            report_page_size: parse_positive(&lookup, "REPORT_PAGE_SIZE", defaults.report_page_size)?,
            agendamento_page_size: parse_positive(
                &lookup,
                "AGENDAMENTO_PAGE_SIZE",
                defaults.agendamento_page_size,
            )?,
        };

        Ok(config)
    }
}

fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(AppError::BadRequest(format!(
            "{} must be a positive integer, got {:?}",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).expect("defaults");
        assert_eq!(config.professor_scan_window_hours, 4);
        assert_eq!(config.report_default_days, 30);
        assert_eq!(config.report_page_size, 25);
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("PROFESSOR_SCAN_WINDOW_HOURS", "6"),
        ]))
        .expect("overrides");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.professor_scan_window_hours, 6);
    }

    #[test]
    fn test_rejects_non_positive_window() {
        let err = AppConfig::from_lookup(lookup_from(&[("PROFESSOR_SCAN_WINDOW_HOURS", "0")]))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = AppConfig::from_lookup(lookup_from(&[("REPORT_PAGE_SIZE", "abc")])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
