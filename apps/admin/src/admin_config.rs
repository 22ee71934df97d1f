use std::env;
use std::time::Duration;

use keystock_core::{AppError, RequestId};
use keystock_domain::UserId;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout: Duration,
    pub operation_timeout: Duration,
    pub actor_user_id: Option<UserId>,
    pub request_id: Option<RequestId>,
}

impl AdminConfig {
    pub fn load() -> Result<Self, AppError> {
        let database_url = required_non_empty_env("DATABASE_URL")?;
        let database_max_connections = parse_positive(
            "DATABASE_MAX_CONNECTIONS",
            env::var("DATABASE_MAX_CONNECTIONS").ok(),
            5,
        )?;
        let database_acquire_timeout_ms = parse_positive(
            "DATABASE_ACQUIRE_TIMEOUT_MS",
            env::var("DATABASE_ACQUIRE_TIMEOUT_MS").ok(),
            5_000,
        )?;
        let operation_timeout_ms = parse_positive(
            "ADMIN_OPERATION_TIMEOUT_MS",
            env::var("ADMIN_OPERATION_TIMEOUT_MS").ok(),
            10_000,
        )?;
        let actor_user_id = parse_actor(env::var("ADMIN_ACTOR_USER_ID").ok())?;
        let request_id = parse_request_id(env::var("ADMIN_REQUEST_ID").ok())?;

        Ok(Self {
            database_url,
            database_max_connections,
            database_acquire_timeout: Duration::from_millis(database_acquire_timeout_ms),
            operation_timeout: Duration::from_millis(operation_timeout_ms),
            actor_user_id,
            request_id,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_positive<T>(name: &str, raw: Option<String>, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(AppError::Validation(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
    }
}

fn parse_actor(raw: Option<String>) -> Result<Option<UserId>, AppError> {
    match raw {
        Some(value) if !value.trim().is_empty() => UserId::parse(value.trim()).map(Some),
        _ => Ok(None),
    }
}

/// Lets a calling pipeline correlate the command's audit entries with its own run.
fn parse_request_id(raw: Option<String>) -> Result<Option<RequestId>, AppError> {
    match raw {
        Some(value) if !value.trim().is_empty() => RequestId::parse(value.trim()).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use keystock_core::{AppError, RequestId};
    use keystock_domain::UserId;

    use super::{parse_actor, parse_positive, parse_request_id};

    #[test]
    fn missing_values_fall_back_to_defaults() {
        assert_eq!(parse_positive::<u32>("POOL", None, 5).ok(), Some(5));
        assert_eq!(parse_actor(None).ok(), Some(None));
        assert_eq!(parse_actor(Some("  ".to_owned())).ok(), Some(None));
    }

    #[test]
    fn positive_values_are_parsed() {
        assert_eq!(
            parse_positive::<u64>("TIMEOUT", Some(" 250 ".to_owned()), 10_000).ok(),
            Some(250)
        );
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        for raw in ["0", "-3", "soon"] {
            let parsed = parse_positive::<u64>("TIMEOUT", Some(raw.to_owned()), 10_000);
            assert!(matches!(parsed, Err(AppError::Validation(_))), "{raw}");
        }
    }

    #[test]
    fn actor_must_be_a_user_id() {
        let user_id = UserId::new();
        assert_eq!(
            parse_actor(Some(user_id.to_string())).ok(),
            Some(Some(user_id))
        );
        assert!(matches!(
            parse_actor(Some("operator".to_owned())),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn forwarded_request_id_is_optional_but_must_be_a_uuid() {
        let request_id = RequestId::new();
        assert_eq!(
            parse_request_id(Some(format!(" {request_id} "))).ok(),
            Some(Some(request_id))
        );
        assert_eq!(parse_request_id(Some(String::new())).ok(), Some(None));
        assert!(matches!(
            parse_request_id(Some("run-42".to_owned())),
            Err(AppError::Validation(_))
        ));
    }
}
