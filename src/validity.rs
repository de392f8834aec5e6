//! Validity window policy.
//!
//! Certificates start [`NOT_BEFORE_SKEW`] in the past to absorb clock skew
//! between issuer and relying party. A zero requested duration means the
//! maximum for the certificate kind. The end of the window never extends past
//! the expiry of any authority in the issuing chain.

use std::time::SystemTime;

use der::DateTime;
use der::asn1::{GeneralizedTime, UtcTime};
use time::{Duration, OffsetDateTime};
use x509_cert::time::Time;

use crate::cert::Certificate;
use crate::error::CertIssueError;

pub const NOT_BEFORE_SKEW: Duration = Duration::hours(2);

/// Longest leaf lifetime browsers accept (398 days), less the backdating skew.
pub const CERTIFICATE_MAX_DURATION: Duration = Duration::hours(398 * 24 - 2);

/// 25 years of 8760 hours, less the backdating skew.
pub const CA_CERTIFICATE_MAX_DURATION: Duration = Duration::hours(25 * 8760 - 2);

pub fn not_before() -> OffsetDateTime {
    not_before_at(OffsetDateTime::now_utc())
}

pub fn not_before_at(now: OffsetDateTime) -> OffsetDateTime {
    now - NOT_BEFORE_SKEW
}

/// End of the validity window for a leaf certificate issued now.
///
/// `authorities` is the issuing chain; the result is clamped to the earliest
/// of their expiries.
pub fn not_after(duration: Duration, authorities: &[&Certificate]) -> OffsetDateTime {
    not_after_at(
        OffsetDateTime::now_utc(),
        duration,
        authorities.iter().map(|cert| cert.not_after()),
    )
}

pub fn not_after_at(
    now: OffsetDateTime,
    duration: Duration,
    authority_expiries: impl IntoIterator<Item = OffsetDateTime>,
) -> OffsetDateTime {
    window_end(now, duration, CERTIFICATE_MAX_DURATION, authority_expiries)
}

/// End of the validity window for a CA certificate issued now.
///
/// Root CAs pass no authorities. Intermediates are clamped like leaves.
pub fn ca_not_after(duration: Duration, authorities: &[&Certificate]) -> OffsetDateTime {
    ca_not_after_at(
        OffsetDateTime::now_utc(),
        duration,
        authorities.iter().map(|cert| cert.not_after()),
    )
}

pub fn ca_not_after_at(
    now: OffsetDateTime,
    duration: Duration,
    authority_expiries: impl IntoIterator<Item = OffsetDateTime>,
) -> OffsetDateTime {
    window_end(now, duration, CA_CERTIFICATE_MAX_DURATION, authority_expiries)
}

fn window_end(
    now: OffsetDateTime,
    duration: Duration,
    default_duration: Duration,
    authority_expiries: impl IntoIterator<Item = OffsetDateTime>,
) -> OffsetDateTime {
    let duration = if duration.is_zero() {
        default_duration
    } else {
        duration
    };
    let requested = now + duration;
    match authority_expiries.into_iter().min() {
        Some(limit) if limit < requested => {
            tracing::debug!(%requested, %limit, "validity clamped to authority expiry");
            limit
        }
        _ => requested,
    }
}

/// Encodes a timestamp the way RFC 5280 wants it: UTCTime through 2049,
/// GeneralizedTime from 2050 on.
pub(crate) fn to_x509_time(t: OffsetDateTime) -> Result<Time, CertIssueError> {
    let dt = DateTime::from_system_time(SystemTime::from(t))
        .map_err(|e| CertIssueError::EncodingError(format!("time {t}: {e}")))?;
    if dt.year() < 2050 {
        let utc = UtcTime::from_date_time(dt)
            .map_err(|e| CertIssueError::EncodingError(format!("time {t}: {e}")))?;
        Ok(Time::UtcTime(utc))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(dt)))
    }
}

pub(crate) fn from_x509_time(t: &Time) -> OffsetDateTime {
    match t {
        Time::UtcTime(utc) => OffsetDateTime::from(utc.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
