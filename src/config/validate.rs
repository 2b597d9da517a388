// src/config/validate.rs

use reqwest::Url;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ApiConfig, ConfigFile, GateConfig, NotifyConfig, RawApiSection, RawConfigFile,
    RawNotifySection, RawScheduleSection, RetryConfig, ScheduleConfig,
};
use crate::errors::{Result, RetraindagError};
use crate::types::NotifyChannel;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RetraindagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ConfigFile::resolve(raw, |name| std::env::var(name).ok())
    }
}

impl ConfigFile {
    /// Validate `raw`, looking up `password_env` through `env`.
    pub fn resolve<F>(raw: RawConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(ConfigFile {
            api: validate_api(&raw.api, env)?,
            gate: GateConfig {
                accuracy_threshold: validate_threshold(raw.gate.accuracy_threshold)?,
            },
            retry: RetryConfig {
                max_attempts: validate_max_attempts(raw.retry.max_attempts)?,
                delay: duration_field("[retry].delay", &raw.retry.delay)?,
            },
            schedule: validate_schedule(&raw.schedule)?,
            notify: validate_notify(&raw.notify)?,
        })
    }
}

fn config_err(msg: impl Into<String>) -> RetraindagError {
    RetraindagError::ConfigError(msg.into())
}

fn duration_field(field: &str, value: &str) -> Result<std::time::Duration> {
    parse_duration(value).map_err(|e| config_err(format!("{field}: {e}")))
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| config_err(format!("{field}: invalid URL '{value}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(config_err(format!(
            "{field}: unsupported scheme '{}' (expected http or https)",
            url.scheme()
        )));
    }
    Ok(url)
}

fn validate_api<F>(api: &RawApiSection, env: F) -> Result<ApiConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut base_url = parse_url("[api].base_url", &api.base_url)?;
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    if api.username.trim().is_empty() {
        return Err(config_err("[api].username must not be empty"));
    }

    let password = match (&api.password, &api.password_env) {
        (Some(_), Some(_)) => {
            return Err(config_err(
                "[api]: set either `password` or `password_env`, not both",
            ));
        }
        (Some(p), None) => p.clone(),
        (None, Some(var)) => env(var).ok_or_else(|| {
            config_err(format!(
                "[api].password_env: environment variable '{var}' is not set"
            ))
        })?,
        (None, None) => {
            return Err(config_err(
                "[api]: one of `password` or `password_env` is required",
            ));
        }
    };

    let request_timeout = duration_field("[api].request_timeout", &api.request_timeout)?;
    if request_timeout.is_zero() {
        return Err(config_err("[api].request_timeout must be greater than zero"));
    }

    Ok(ApiConfig {
        base_url,
        username: api.username.clone(),
        password,
        request_timeout,
        endpoints: api.endpoints.clone(),
    })
}

fn validate_threshold(threshold: f64) -> Result<f64> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        let hint = if threshold > 1.0 && threshold <= 100.0 {
            format!(" (did you mean {}?)", threshold / 100.0)
        } else {
            String::new()
        };
        return Err(config_err(format!(
            "[gate].accuracy_threshold must be a fraction between 0 and 1 (got {threshold}){hint}"
        )));
    }
    Ok(threshold)
}

fn validate_max_attempts(max_attempts: u32) -> Result<u32> {
    if max_attempts == 0 {
        return Err(config_err("[retry].max_attempts must be >= 1 (got 0)"));
    }
    Ok(max_attempts)
}

fn validate_schedule(schedule: &RawScheduleSection) -> Result<ScheduleConfig> {
    let interval = duration_field("[schedule].interval", &schedule.interval)?;
    if interval.is_zero() {
        return Err(config_err("[schedule].interval must be greater than zero"));
    }

    if schedule.queue_length == 0 {
        return Err(config_err("[schedule].queue_length must be >= 1 (got 0)"));
    }

    if schedule.history_length == 0 {
        return Err(config_err("[schedule].history_length must be >= 1 (got 0)"));
    }

    Ok(ScheduleConfig {
        interval,
        run_on_startup: schedule.run_on_startup,
        overlap: schedule.overlap,
        queue_length: schedule.queue_length,
        history_length: schedule.history_length,
    })
}

fn validate_notify(notify: &RawNotifySection) -> Result<NotifyConfig> {
    let webhook_url = notify
        .webhook_url
        .as_deref()
        .map(|u| parse_url("[notify].webhook_url", u))
        .transpose()?;

    if notify.channel == NotifyChannel::Webhook && webhook_url.is_none() {
        return Err(config_err(
            "[notify].webhook_url is required when channel = \"webhook\"",
        ));
    }

    if let Some(bad) = notify.recipients.iter().find(|r| r.trim().is_empty()) {
        return Err(config_err(format!(
            "[notify].recipients contains an empty entry: {bad:?}"
        )));
    }

    Ok(NotifyConfig {
        channel: notify.channel,
        webhook_url,
        recipients: notify.recipients.clone(),
    })
}
