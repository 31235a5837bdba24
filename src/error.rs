//! Error taxonomy for a collection run.
//!
//! Every fault is fatal to the run: it is wrapped once with the context it
//! occurred in and propagated to `main`, which reports it and exits.

use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;

/// Where in the report structure a parse fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// Access-point attribute lines before the load marker.
    AccessPoint,
    /// Lines inside the load sub-block.
    LoadSection,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseStage::AccessPoint => "access-point block",
            ParseStage::LoadSection => "load sub-block",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("parse fault in {stage} (field `{field}`): {source}")]
    Parse {
        stage: ParseStage,
        field: &'static str,
        #[source]
        source: ParseIntError,
    },

    #[error("sink fault on {}: {source}", .path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: SinkCause,
    },

    #[error("producer fault running `{command}`: {detail}")]
    Producer { command: String, detail: String },
}

/// Underlying cause of a sink fault.
#[derive(Debug, thiserror::Error)]
pub enum SinkCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl IngestError {
    pub(crate) fn sink(path: impl Into<PathBuf>, cause: impl Into<SinkCause>) -> Self {
        IngestError::Sink {
            path: path.into(),
            source: cause.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_parse_fault_names_stage_and_keeps_cause() {
        let cause = "99999999999".parse::<u8>().unwrap_err();
        let err = IngestError::Parse {
            stage: ParseStage::LoadSection,
            field: "connected_stations",
            source: cause,
        };
        let msg = err.to_string();
        assert!(msg.contains("load sub-block"));
        assert!(msg.contains("connected_stations"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_sink_fault_reports_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = IngestError::sink("/tmp/out.csv", io);
        assert!(err.to_string().contains("/tmp/out.csv"));
        assert!(matches!(
            err,
            IngestError::Sink {
                source: SinkCause::Io(_),
                ..
            }
        ));
    }
}
