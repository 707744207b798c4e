//! Repository error kinds and the operation tags attached to them.

use crate::codec::CodecError;
use crate::context::{Interruption, OpContext};
use crate::model::note::NoteId;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Single store-facing step of a repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOp {
    PutNote,
    GetNote,
    DeleteNote,
    ReadIndex,
    WriteIndex,
    ListKeys,
}

impl RepoOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PutNote => "put_note",
            Self::GetNote => "get_note",
            Self::DeleteNote => "delete_note",
            Self::ReadIndex => "read_index",
            Self::WriteIndex => "write_index",
            Self::ListKeys => "list_keys",
        }
    }
}

impl Display for RepoOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by note repository operations.
///
/// Every variant except `NotFound` names the step that failed, so callers can
/// tell a failed blob write from a failed index write after a partial save.
#[derive(Debug)]
pub enum RepoError {
    /// The requested note blob does not exist.
    NotFound(NoteId),
    /// Backing store failure other than not-found.
    Store { op: RepoOp, source: StoreError },
    /// A document could not be encoded or decoded.
    Encoding { op: RepoOp, source: CodecError },
    /// The caller cancelled before `op` was issued.
    Cancelled { op: RepoOp },
    /// The caller's deadline expired before `op` was issued.
    DeadlineExceeded { op: RepoOp },
}

impl RepoError {
    pub(crate) fn store(op: RepoOp) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { op, source }
    }

    pub(crate) fn encoding(op: RepoOp) -> impl FnOnce(CodecError) -> Self {
        move |source| Self::Encoding { op, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Step that produced this error, when there is one.
    pub fn op(&self) -> Option<RepoOp> {
        match self {
            Self::NotFound(_) => None,
            Self::Store { op, .. }
            | Self::Encoding { op, .. }
            | Self::Cancelled { op }
            | Self::DeadlineExceeded { op } => Some(*op),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Store { op, source } => write!(f, "{op} failed: {source}"),
            Self::Encoding { op, source } => write!(f, "{op} failed: {source}"),
            Self::Cancelled { op } => write!(f, "cancelled before {op}"),
            Self::DeadlineExceeded { op } => write!(f, "deadline exceeded before {op}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            Self::Encoding { source, .. } => Some(source),
            Self::NotFound(_) | Self::Cancelled { .. } | Self::DeadlineExceeded { .. } => None,
        }
    }
}

/// Fails when `ctx` is no longer live, so `op` is never issued.
pub(crate) fn checkpoint(ctx: &OpContext, op: RepoOp) -> RepoResult<()> {
    match ctx.interruption() {
        None => Ok(()),
        Some(Interruption::Cancelled) => Err(RepoError::Cancelled { op }),
        Some(Interruption::DeadlineExceeded) => Err(RepoError::DeadlineExceeded { op }),
    }
}
