// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, SessionConfig};
use crate::errors::{BridgeError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BridgeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_launcher(&raw)?;
        let session = validate_session(&raw)?;
        Ok(ConfigFile {
            launcher: raw.launcher.into(),
            session,
        })
    }
}

fn validate_launcher(cfg: &RawConfigFile) -> Result<()> {
    if cfg.launcher.command.trim().is_empty() {
        return Err(BridgeError::ConfigError(
            "[launcher].command must not be empty".to_string(),
        ));
    }

    match cfg.launcher.env_query.first() {
        Some(program) if !program.trim().is_empty() => {}
        _ => {
            return Err(BridgeError::ConfigError(
                "[launcher].env_query must name a program".to_string(),
            ));
        }
    }

    if cfg.launcher.interpreter.trim().is_empty() {
        return Err(BridgeError::ConfigError(
            "[launcher].interpreter must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_session(cfg: &RawConfigFile) -> Result<SessionConfig> {
    let timeout = match &cfg.session.timeout {
        Some(s) => Some(parse_duration(s).map_err(|e| {
            BridgeError::ConfigError(format!("[session].timeout: {e}"))
        })?),
        None => None,
    };

    let termination_grace = parse_duration(&cfg.session.termination_grace)
        .map_err(|e| BridgeError::ConfigError(format!("[session].termination_grace: {e}")))?;
    if termination_grace.is_zero() {
        return Err(BridgeError::ConfigError(
            "[session].termination_grace must be > 0".to_string(),
        ));
    }

    Ok(SessionConfig {
        timeout,
        termination_grace,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::DeploymentMode;

    #[test]
    fn defaults_are_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.launcher.mode, DeploymentMode::Dev);
        assert_eq!(cfg.launcher.command, "plot_courses");
        assert_eq!(cfg.session.timeout, None);
        assert_eq!(cfg.session.termination_grace, Duration::from_secs(2));
    }

    #[test]
    fn parses_session_durations() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[session]
timeout = "10m"
termination_grace = "500ms"
"#,
        )
        .unwrap();
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.session.timeout, Some(Duration::from_secs(600)));
        assert_eq!(cfg.session.termination_grace, Duration::from_millis(500));
    }

    #[test]
    fn empty_env_query_is_rejected() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[launcher]
env_query = []
"#,
        )
        .unwrap();
        match ConfigFile::try_from(raw) {
            Err(BridgeError::ConfigError(msg)) => assert!(msg.contains("env_query")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn zero_grace_is_rejected() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[session]
termination_grace = "0s"
"#,
        )
        .unwrap();
        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(BridgeError::ConfigError(_))
        ));
    }

    #[test]
    fn unknown_mode_fails_deserialization() {
        let res: std::result::Result<RawConfigFile, _> = toml::from_str(
            r#"
[launcher]
mode = "release"
"#,
        );
        assert!(res.is_err());
    }
}
