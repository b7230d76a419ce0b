use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use log::{info, warn};

use crate::optimizer::EstimatorConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub estimator: EstimatorSettings,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            estimator: EstimatorSettings::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "FIT_IT_NOW_API_HOST";
    const PORT_VAR: &'static str = "FIT_IT_NOW_API_PORT";
    /// Generic fallback honoured by most hosting platforms.
    const FALLBACK_PORT_VAR: &'static str = "PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = env_string(Self::PORT_VAR)
            .map(|raw| (Self::PORT_VAR, raw))
            .or_else(|| env_string(Self::FALLBACK_PORT_VAR).map(|raw| (Self::FALLBACK_PORT_VAR, raw)))
            .map(|(var_name, raw)| parse_port(var_name, &raw).unwrap_or(Self::DEFAULT_PORT))
            .unwrap_or(Self::DEFAULT_PORT);

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the load estimator.
#[derive(Clone, Debug)]
pub struct EstimatorSettings {
    estimator: EstimatorConfig,
}

impl EstimatorSettings {
    const DEFAULT_GAP_VAR: &'static str = "FIT_IT_NOW_DEFAULT_GAP";
    const ENFORCE_WEIGHT_VAR: &'static str = "FIT_IT_NOW_SINGLE_ENFORCE_WEIGHT";

    fn from_env() -> Self {
        let default_gap = load_f64_with_warning(
            Self::DEFAULT_GAP_VAR,
            EstimatorConfig::DEFAULT_GAP,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted default gap changes every estimate without an explicit gap",
        );

        let enforce_weight_in_single = env_string(Self::ENFORCE_WEIGHT_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ENFORCE_WEIGHT_VAR))
            .unwrap_or(EstimatorConfig::DEFAULT_ENFORCE_WEIGHT_IN_SINGLE);
        if !enforce_weight_in_single {
            warn!(
                "⚠️ Single-type estimates may exceed the container weight limit ({} = false).",
                Self::ENFORCE_WEIGHT_VAR
            );
        }

        let estimator = EstimatorConfig::builder()
            .default_gap(default_gap)
            .enforce_weight_in_single(enforce_weight_in_single)
            .build();

        Self { estimator }
    }

    /// Returns the configured EstimatorConfig.
    pub fn estimator_config(&self) -> EstimatorConfig {
        self.estimator
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_port(var_name: &str, raw: &str) -> Option<u16> {
    match raw.parse::<u16>() {
        Ok(0) => {
            warn!("⚠️ {} must not be 0. Using default port.", var_name);
            None
        }
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}'): {}. Using default port.",
                var_name, raw, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_f64_value(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => value,
        Ok(_) => {
            warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => {
            let value = parse_f64_value(var_name, &raw, default, validator, invalid_hint);
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                info!("ℹ️ {} ({} = {}).", notice, var_name, value);
            }
            value
        }
        None => default,
    }
}
