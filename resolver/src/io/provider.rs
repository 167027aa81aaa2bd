//! Provider and candidate boundary.
//!
//! A [`LicenseProvider`] is the session that knows how to talk to license
//! sources. The resolver registers callbacks with it, asks it for a lazy stream of
//! [`LicenseCandidate`]s, and acquires at most one of them. Implementations own
//! all network I/O, timeouts, and retries; the resolver adds none.

use std::iter::FusedIterator;

use crate::core::source::LicenseOptions;
use crate::core::summary::LicenseDetails;
use crate::core::types::{AcquireParams, CandidateFacts};
use crate::error::LicenseError;
use crate::io::callbacks::{CredentialsCallback, TrustCallback};

/// A license offer returned by a provider. Read-only except for `acquire`.
pub trait LicenseCandidate {
    fn short_name(&self) -> &str;

    /// Declared worker count, or `None` when the offer does not say.
    fn worker_count(&self) -> Option<u32>;

    /// `true` when the worker count is negotiable at acquisition (shared pool).
    fn can_choose_workers(&self) -> bool;

    fn enabled_features(&self) -> Vec<String> {
        Vec::new()
    }

    fn has_feature(&self, feature: &str) -> bool {
        self.enabled_features().iter().any(|f| f == feature)
    }

    /// Descriptive properties for logging. Providers with richer metadata
    /// (location, type, description, seat count) should override this.
    fn details(&self) -> LicenseDetails {
        LicenseDetails {
            short_name: self.short_name().to_string(),
            workers: self.worker_count(),
            features: self.enabled_features(),
            ..LicenseDetails::default()
        }
    }

    /// Reserve this license. `None` takes the whole fixed allotment.
    fn acquire(&self, params: Option<AcquireParams>) -> Result<(), LicenseError>;

    /// The properties the filter pipeline looks at.
    fn facts(&self) -> CandidateFacts<'_> {
        CandidateFacts {
            short_name: self.short_name(),
            worker_count: self.worker_count(),
            can_choose_workers: self.can_choose_workers(),
        }
    }
}

pub type BoxedCandidate = Box<dyn LicenseCandidate>;

/// One element of a provider stream. Errors may arrive mid-stream (e.g. a
/// source dropping off the network while results are being read).
pub type CandidateItem = Result<BoxedCandidate, LicenseError>;

/// Lazy, single-pass candidate stream borrowed from its provider.
pub type CandidateStream<'a> = Box<dyn Iterator<Item = CandidateItem> + 'a>;

/// A license provider session.
///
/// Methods take `&mut self`: a resolution holds exclusive access to the provider
/// from callback registration until the stream is dropped, so two resolutions
/// cannot interleave on the same connection.
pub trait LicenseProvider {
    /// Register the callback used when a source asks for credentials.
    fn when_asked_for_credentials(&mut self, callback: CredentialsCallback);

    /// Register the callback used when a source presents a certificate.
    fn when_asked_for_certificate_trust(&mut self, callback: TrustCallback);

    /// Start enumerating candidates matching `options`.
    fn find_available_licences(
        &mut self,
        options: &LicenseOptions,
    ) -> Result<CandidateStream<'_>, LicenseError>;
}

/// Single-pass cursor over a provider stream.
///
/// Yields candidates until the stream ends or reports an error. The first error
/// is parked and the cursor is fused; the caller collects it with
/// [`CandidateCursor::take_failure`] once the consumer is done. There is no way
/// to rewind: consuming the cursor is destructive.
pub struct CandidateCursor<'a> {
    inner: CandidateStream<'a>,
    failure: Option<LicenseError>,
    exhausted: bool,
    yielded: usize,
}

impl<'a> CandidateCursor<'a> {
    pub fn new(inner: CandidateStream<'a>) -> Self {
        Self {
            inner,
            failure: None,
            exhausted: false,
            yielded: 0,
        }
    }

    /// Error reported by the provider mid-stream, if any.
    pub fn take_failure(&mut self) -> Option<LicenseError> {
        self.failure.take()
    }

    /// Number of candidates handed out so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl Iterator for CandidateCursor<'_> {
    type Item = BoxedCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.inner.next() {
            Some(Ok(candidate)) => {
                self.yielded += 1;
                Some(candidate)
            }
            Some(Err(err)) => {
                self.failure = Some(err);
                self.exhausted = true;
                None
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}

impl FusedIterator for CandidateCursor<'_> {}
