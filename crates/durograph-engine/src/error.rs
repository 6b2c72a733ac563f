use durograph_temporal::PatternNodeId;

/// Errors detected before the matching engine starts.
///
/// Everything that can happen *during* a search (infeasible candidate sets,
/// deadlines, result caps) is an ordinary value, see
/// [`SearchOutcome`](crate::search::SearchOutcome) and
/// [`QueryStatus`](crate::report::QueryStatus).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("conflicting configuration: {0}")]
    ConfigurationConflict(String),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("query interval reaches instant {end} but the graph horizon is {horizon}")]
    IntervalOutsideHorizon { end: u32, horizon: u32 },

    #[error("pattern graph has no nodes")]
    EmptyPattern,

    #[error("pattern is {pattern} but the graph is {graph}")]
    DirectionMismatch {
        pattern: &'static str,
        graph: &'static str,
    },

    #[error("candidate index covers {index} pattern nodes, pattern has {pattern}")]
    IndexMismatch { index: usize, pattern: usize },

    #[error("no ranking for pattern node {0}")]
    MissingRanking(PatternNodeId),

    #[error("unknown ranking policy `{0}` (expected max|adaptive|min|halfway)")]
    UnknownPolicy(String),
}

impl QueryError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        QueryError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
