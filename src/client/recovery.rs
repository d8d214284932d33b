//! Decision table for the 401 → refresh → retry-once flow.
//!
//! The client feeds every response (or transport failure) of an [`Attempt`]
//! through [`on_response`] / [`on_transport_error`] and every refresh result
//! through [`on_refresh`]; the returned [`Verdict`] / [`Next`] says what to do
//! and which [`RecoveryState`] the request is now in.

use super::request::Attempt;

pub const UNAUTHORIZED: u16 = 401;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NetworkFailure,
    AuthUnrecoverable,
    RequestError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Initial,
    AwaitingResponse,
    Refreshing,
    Retrying,
    Failed(FailureKind),
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Hand the response to the caller.
    Succeed,
    /// Exchange the refresh token, then retry once.
    Refresh,
    /// Dispatch the retry record.
    Retry,
    Fail(FailureKind),
}

impl Next {
    pub fn state(self) -> RecoveryState {
        match self {
            Self::Succeed => RecoveryState::Succeeded,
            Self::Refresh => RecoveryState::Refreshing,
            Self::Retry => RecoveryState::Retrying,
            Self::Fail(kind) => RecoveryState::Failed(kind),
        }
    }
}

/// State of an attempt that has been sent and not yet answered.
pub fn dispatched(attempt: &Attempt) -> RecoveryState {
    if attempt.is_retry() {
        RecoveryState::Retrying
    } else {
        RecoveryState::AwaitingResponse
    }
}

/// What a received response means for the request. Narrower than [`Next`]:
/// a response is never a network failure and never itself a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Succeed,
    Refresh,
    RequestError,
    AuthUnrecoverable,
}

impl Verdict {
    pub fn next(self) -> Next {
        match self {
            Self::Succeed => Next::Succeed,
            Self::Refresh => Next::Refresh,
            Self::RequestError => Next::Fail(FailureKind::RequestError),
            Self::AuthUnrecoverable => Next::Fail(FailureKind::AuthUnrecoverable),
        }
    }
}

pub fn on_response(attempt: &Attempt, status: u16, has_refresh_token: bool) -> Verdict {
    if (200..300).contains(&status) {
        return Verdict::Succeed;
    }
    if status != UNAUTHORIZED {
        return Verdict::RequestError;
    }
    if attempt.is_retry() || !has_refresh_token {
        return Verdict::AuthUnrecoverable;
    }
    Verdict::Refresh
}

/// Transport failures are never retried here, including on the retry
/// attempt: the credentials were not rejected, so the session is kept.
pub fn on_transport_error(_attempt: &Attempt) -> Next {
    Next::Fail(FailureKind::NetworkFailure)
}

pub fn on_refresh(refreshed: bool) -> Next {
    if refreshed {
        Next::Retry
    } else {
        Next::Fail(FailureKind::AuthUnrecoverable)
    }
}
