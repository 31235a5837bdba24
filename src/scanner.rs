//! Text producers: where the raw BSSID report comes from.

use std::process::Command;

use crate::error::IngestError;

/// Anything that can hand back one raw network report per call.
pub trait ScanSource {
    /// Produce the report text for one capture cycle. May block.
    fn scan(&mut self) -> Result<String, IngestError>;
}

/// Runs an external command and returns its stdout.
///
/// There is no timeout: a hung command stalls the caller.
pub struct CommandScanner {
    program: String,
    args: Vec<String>,
}

impl CommandScanner {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `netsh wlan show networks mode=bssid`.
    pub fn netsh() -> Self {
        Self::new("netsh", ["wlan", "show", "networks", "mode=bssid"])
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ScanSource for CommandScanner {
    fn scan(&mut self) -> Result<String, IngestError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| IngestError::Producer {
                command: self.command_line(),
                detail: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !output.status.success() {
            return Err(IngestError::Producer {
                command: self.command_line(),
                detail: format!("exited with {}: {stderr}", output.status),
            });
        }
        if !stderr.is_empty() {
            log::warn!("`{}` wrote to stderr: {stderr}", self.command_line());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netsh_command_line() {
        assert_eq!(
            CommandScanner::netsh().command_line(),
            "netsh wlan show networks mode=bssid"
        );
    }

    #[test]
    fn test_missing_program_is_producer_fault() {
        let mut scanner = CommandScanner::new("wifi-dwell-no-such-binary", ["--scan"]);
        match scanner.scan() {
            Err(IngestError::Producer { command, .. }) => {
                assert_eq!(command, "wifi-dwell-no-such-binary --scan");
            }
            other => panic!("expected producer fault, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_returned() {
        let mut scanner = CommandScanner::new("sh", ["-c", "printf 'SSID 1 : Net\\n'"]);
        assert_eq!(scanner.scan().unwrap(), "SSID 1 : Net\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_stderr_with_success_still_returns_stdout() {
        let mut scanner =
            CommandScanner::new("sh", ["-c", "echo noise >&2; printf 'SSID 1 : N\\n'"]);
        assert_eq!(scanner.scan().unwrap(), "SSID 1 : N\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_producer_fault() {
        let mut scanner = CommandScanner::new("sh", ["-c", "echo 'radio off' >&2; exit 3"]);
        match scanner.scan() {
            Err(IngestError::Producer { detail, .. }) => assert!(detail.contains("radio off")),
            other => panic!("expected producer fault, got {other:?}"),
        }
    }
}
