use thiserror::Error;

use crate::graph::ObjectId;

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Invariant {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Invariant {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Almost nothing on the hot path of the layout engine is fallible: unknown commit ids and
/// rows beyond the cached range are reported as `None`, lost races are retried and heuristic
/// passes silently skip moves they cannot make. What remains are input validation errors and
/// the results of the brute-force checks used to verify the graph under test.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::InvalidObjectId`] - A commit id could not be parsed
/// - [`Error::InvalidConfig`] - A [`crate::GraphConfig`] was rejected
///
/// ## Verification Errors
/// - [`Error::TopologyViolation`] - A parent is not ordered after its child
/// - [`Error::LayoutViolation`] - A cached row breaks continuity or lane uniqueness
/// - [`Error::Invariant`] - Inconsistent internal state
///
/// # Examples
///
/// ```rust
/// use revgraph::{Error, ObjectId};
///
/// match "not-a-hash".parse::<ObjectId>() {
///     Ok(id) => println!("parsed {id}"),
///     Err(Error::InvalidObjectId(text)) => eprintln!("bad id: {text}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A commit id was not a 40 character hexadecimal string.
    ///
    /// The associated value holds the rejected input.
    #[error("Invalid object id - {0}")]
    InvalidObjectId(String),

    /// The layout configuration cannot be used.
    ///
    /// Raised by [`crate::GraphConfig::validate`], e.g. for a color palette too small to keep
    /// neighbouring lanes apart.
    #[error("Invalid graph configuration - {0}")]
    InvalidConfig(String),

    /// A parent revision is not scored strictly above its child.
    ///
    /// Only produced by the brute-force check [`crate::RevisionGraph::validate_topo_order`].
    #[error("Topological order violated - parent {parent} is not ordered after child {child}")]
    TopologyViolation {
        /// The child revision of the offending edge
        child: ObjectId,
        /// The parent revision of the offending edge
        parent: ObjectId,
    },

    /// A cached row breaks segment continuity or lane uniqueness.
    ///
    /// Only produced by [`crate::RevisionGraph::validate_rows`].
    #[error("Layout violated in row {row}: {message}")]
    LayoutViolation {
        /// The index of the offending row
        row: usize,
        /// What exactly is wrong with the row
        message: String,
    },

    /// Internal state is inconsistent.
    ///
    /// This indicates a defect in the library, never a problem with the input. The error
    /// includes the source location where the inconsistency was detected.
    #[error("Invariant - {file}:{line}: {message}")]
    Invariant {
        /// The message describing the broken invariant
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_error_records_location() {
        let err = invariant_error!("row {} lost segment {}", 3, 7);
        match err {
            Error::Invariant {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "row 3 lost segment 7");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let err = Error::LayoutViolation {
            row: 4,
            message: "lane 2 used twice".to_string(),
        };
        assert_eq!(err.to_string(), "Layout violated in row 4: lane 2 used twice");
    }
}
