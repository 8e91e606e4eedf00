// src/decode.rs

//! Turning a finished worker's exit code and output into outcomes.
//!
//! Terminal payload contract: log and progress lines come first, then a
//! single JSON array starting at the beginning of a line and running to the
//! end of stdout. The whole buffer is tried first; after that every line that
//! starts with `[` is tried as the payload start, earliest first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{BridgeError, Result};

/// Reason used when the worker fails without writing to stderr.
pub const GENERIC_FAILURE: &str = "Process failed";

/// One unit of work reported by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OutcomeRecord", into = "OutcomeRecord")]
pub enum Outcome {
    Success { output_path: String },
    Failure { error: String },
}

impl Outcome {
    pub fn success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Wire form: `{"success": true, "output_path": ...}` or
/// `{"success": false, "error": ...}`.
#[derive(Debug, Serialize, Deserialize)]
struct OutcomeRecord {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TryFrom<OutcomeRecord> for Outcome {
    type Error = String;

    fn try_from(rec: OutcomeRecord) -> std::result::Result<Self, Self::Error> {
        match (rec.success, rec.output_path, rec.error) {
            (true, Some(output_path), _) => Ok(Outcome::Success { output_path }),
            (true, None, _) => Err("successful outcome without output_path".to_string()),
            (false, _, Some(error)) => Ok(Outcome::Failure { error }),
            (false, _, None) => Err("failed outcome without error".to_string()),
        }
    }
}

impl From<Outcome> for OutcomeRecord {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success { output_path } => OutcomeRecord {
                success: true,
                output_path: Some(output_path),
                error: None,
            },
            Outcome::Failure { error } => OutcomeRecord {
                success: false,
                output_path: None,
                error: Some(error),
            },
        }
    }
}

/// Decode a finished worker run.
///
/// - non-zero exit: `Runtime` with stderr, or [`GENERIC_FAILURE`] if stderr is blank
/// - zero exit: the outcome list, or `Parse` carrying the raw stdout
pub fn decode(exit_code: i32, stdout: &str, stderr: &str) -> Result<Vec<Outcome>> {
    if exit_code != 0 {
        let reason = stderr.trim();
        let reason = if reason.is_empty() {
            GENERIC_FAILURE
        } else {
            reason
        };
        return Err(BridgeError::Runtime(reason.to_string()));
    }

    parse_payload(stdout)
}

fn parse_payload(stdout: &str) -> Result<Vec<Outcome>> {
    let whole_err = match serde_json::from_str::<Vec<Outcome>>(stdout) {
        Ok(outcomes) => return Ok(outcomes),
        Err(e) => e,
    };

    for start in payload_starts(stdout) {
        if let Ok(outcomes) = serde_json::from_str::<Vec<Outcome>>(&stdout[start..]) {
            debug!(offset = start, "decoded payload after leading log output");
            return Ok(outcomes);
        }
    }

    Err(BridgeError::Parse {
        raw: stdout.to_string(),
        reason: whole_err.to_string(),
    })
}

/// Byte offsets of lines (other than the first) whose first non-blank
/// character is `[`.
fn payload_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.match_indices('\n').filter_map(move |(nl, _)| {
        let start = nl + 1;
        let line = &text[start..];
        let trimmed = line.trim_start_matches([' ', '\t']);
        trimmed
            .starts_with('[')
            .then(|| start + (line.len() - trimmed.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_exit_with_empty_stderr_is_generic() {
        match decode(1, "", "") {
            Err(BridgeError::Runtime(msg)) => assert_eq!(msg, "Process failed"),
            other => panic!("expected Runtime, got {other:?}"),
        }
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        match decode(2, "[]", "boom") {
            Err(BridgeError::Runtime(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected Runtime, got {other:?}"),
        }
    }

    #[test]
    fn zero_exit_decodes_single_outcome() {
        let out = decode(0, r#"[{"success":true,"output_path":"/out/1"}]"#, "").unwrap();
        assert_eq!(
            out,
            vec![Outcome::Success {
                output_path: "/out/1".to_string()
            }]
        );
    }

    #[test]
    fn zero_exit_with_garbage_is_parse_error_with_raw_text() {
        match decode(0, "not json", "") {
            Err(BridgeError::Parse { raw, .. }) => assert_eq!(raw, "not json"),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn leading_log_lines_are_skipped_and_order_kept() {
        let stdout = "Generated image: /tmp/a.png\n[INFO] plotting\n[\n  {\"success\":true,\"output_path\":\"/a\"},\n  {\"success\":false,\"error\":\"bad hole\"},\n  {\"success\":true,\"output_path\":\"/c\"}\n]\n";
        let out = decode(0, stdout, "").unwrap();
        assert_eq!(
            out,
            vec![
                Outcome::Success {
                    output_path: "/a".into()
                },
                Outcome::Failure {
                    error: "bad hole".into()
                },
                Outcome::Success {
                    output_path: "/c".into()
                },
            ]
        );
        assert!(out[0].success());
        assert!(!out[1].success());
    }

    #[test]
    fn trailing_log_text_is_a_parse_error() {
        let stdout = "[{\"success\":true,\"output_path\":\"/a\"}]\ndone\n";
        match decode(0, stdout, "") {
            Err(BridgeError::Parse { raw, .. }) => assert_eq!(raw, stdout),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn success_without_path_is_rejected() {
        assert!(matches!(
            decode(0, r#"[{"success":true}]"#, ""),
            Err(BridgeError::Parse { .. })
        ));
    }

    #[test]
    fn outcome_serializes_to_wire_form() {
        let json = serde_json::to_string(&Outcome::Failure {
            error: "x".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"success":false,"error":"x"}"#);
    }
}
