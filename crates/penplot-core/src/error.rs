//! Error handling for penplot
//!
//! Provides typed failures for every layer of the plotting pipeline:
//! - Raster errors (header search, payload length, frame validity)
//! - Parameter errors (numeric tuning values out of range)
//! - Artifact errors (intermediate files missing or malformed)
//! - Link errors (serial transport to the FPGA and the controller)
//!
//! The umbrella [`Error`] can be annotated with the pipeline [`Stage`]
//! that produced it without losing the underlying typed failure.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Raster decoding error type
///
/// Fatal to one pipeline pass. The caller may re-acquire and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// Header marker byte does not occur in the input
    #[error("Header byte 0x{marker:02X} not found in {searched} bytes")]
    HeaderNotFound {
        /// The marker that was searched for.
        marker: u8,
        /// Number of bytes searched.
        searched: usize,
    },

    /// Fewer payload bytes follow the header than the frame needs
    #[error("Truncated payload: need {needed} bytes after header, have {available}")]
    TruncatedPayload {
        /// Bytes required by the frame geometry and mode.
        needed: usize,
        /// Bytes actually available after the header.
        available: usize,
    },

    /// Frame is not strictly binary or has unusable dimensions
    #[error("Invalid frame: {reason}")]
    InvalidFrame {
        /// Why the frame was rejected.
        reason: String,
    },
}

/// Parameter validation error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A numeric parameter is outside its valid range
    #[error("Parameter '{name}' out of range: {value} (expected {expected})")]
    OutOfRange {
        /// The parameter name.
        name: String,
        /// The rejected value.
        value: f64,
        /// Human readable description of the valid range.
        expected: String,
    },

    /// A parameter value could not be interpreted
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue {
        /// The parameter name.
        name: String,
        /// Why the value is invalid.
        reason: String,
    },
}

impl ParameterError {
    /// Shorthand for [`ParameterError::OutOfRange`]
    pub fn out_of_range(name: &str, value: f64, expected: &str) -> Self {
        Self::OutOfRange {
            name: name.to_string(),
            value,
            expected: expected.to_string(),
        }
    }
}

/// Artifact error type
///
/// Raised when an intermediate file (received raster dump, command file)
/// is missing, unreadable or carries no usable content. Reading failures
/// are precondition failures and are checked before any channel is opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    /// The artifact does not exist
    #[error("Artifact not found: {}", path.display())]
    Missing {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// The artifact exists but could not be read
    #[error("Failed to read {}: {reason}", path.display())]
    Unreadable {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The artifact holds no usable records
    #[error("Artifact {} is empty: {reason}", path.display())]
    Empty {
        /// Path of the artifact.
        path: PathBuf,
        /// What was missing.
        reason: String,
    },

    /// Writing the artifact failed
    #[error("Failed to write {}: {reason}", path.display())]
    WriteFailed {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },
}

/// Serial link error type
///
/// Transport-time failures. Each is fatal to one transfer attempt; the
/// channel is always closed before the error is returned and no automatic
/// retry is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Failed to open the serial channel
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// Port identifier.
        port: String,
        /// Reason reported by the driver.
        reason: String,
    },

    /// Peer did not answer within the allowed time
    #[error("No response while {waiting_for} after {timeout_ms}ms")]
    NoResponse {
        /// What the link was waiting for.
        waiting_for: String,
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Operation was cancelled through the shared cancel flag
    #[error("Cancelled by user")]
    Cancelled,

    /// Receive finished short of the expected byte count
    #[error("Incomplete transfer: received {received} of {expected} bytes")]
    IncompleteTransfer {
        /// Bytes received before the transfer stopped.
        received: usize,
        /// Bytes the peer was expected to send.
        expected: usize,
    },

    /// Channel I/O failure
    #[error("Serial I/O error: {reason}")]
    Io {
        /// The underlying I/O error text.
        reason: String,
    },
}

impl LinkError {
    /// Wrap an I/O error raised by the channel
    pub fn io(err: &std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

/// Pipeline stage used to annotate failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// FPGA round trip (trigger, image upload, edge raster download)
    Acquire,
    /// Raster decoding from the received bytes
    Decode,
    /// Contour extraction
    Extract,
    /// Travel-minimizing ordering
    Order,
    /// Unit conversion, simplification and densification
    Transform,
    /// Command generation
    Encode,
    /// Writing the command file
    Persist,
    /// Streaming commands to the controller
    Plot,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Acquire => "acquire",
            Self::Decode => "decode",
            Self::Extract => "extract",
            Self::Order => "order",
            Self::Transform => "transform",
            Self::Encode => "encode",
            Self::Persist => "persist",
            Self::Plot => "plot",
        };
        f.write_str(name)
    }
}

/// Main error type for penplot
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Raster error
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// Parameter error
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// Artifact error
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Link error
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure annotated with the pipeline stage that produced it
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// The stage that failed.
        stage: Stage,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Annotate with a stage. An error already carrying a stage keeps it.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage annotation, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage annotation stripped
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this is a transport timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Error::Link(LinkError::NoResponse { .. }))
    }

    /// Check if the operation was cancelled by the user
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Link(LinkError::Cancelled))
    }

    /// Check if a required artifact was missing or unusable
    pub fn is_precondition_failed(&self) -> bool {
        matches!(
            self.root(),
            Error::Artifact(
                ArtifactError::Missing { .. }
                    | ArtifactError::Unreadable { .. }
                    | ArtifactError::Empty { .. }
            )
        )
    }

    /// Check if this is a raster decoding error
    pub fn is_raster_error(&self) -> bool {
        matches!(self.root(), Error::Raster(_))
    }

    /// Check if this is a link error
    pub fn is_link_error(&self) -> bool {
        matches!(self.root(), Error::Link(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

/// Attach a pipeline stage to the error side of a result
pub trait StageContext<T> {
    /// Annotate a failure with `stage`
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T, E> StageContext<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.into().in_stage(stage))
    }
}
