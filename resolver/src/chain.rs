//! Ordered fallback across several resolvers.

use tracing::{info, instrument, warn};

use crate::error::LicenseError;
use crate::io::provider::LicenseProvider;
use crate::policy::LicenseResolver;
use crate::resolve::ResolveLicense;

/// Resolvers tried in order until one acquires a license.
///
/// Every resolver runs against the same provider. An error from any resolver
/// stops the chain and is returned as-is; later resolvers are not tried.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ResolveLicense>>,
}

impl ResolverChain {
    pub fn using_first_available(resolvers: Vec<Box<dyn ResolveLicense>>) -> Self {
        Self { resolvers }
    }

    /// Chain holding a single resolver that takes a license from any source.
    pub fn using_any_available() -> Result<Self, LicenseError> {
        let any = LicenseResolver::from_any_source().build()?;
        Ok(Self::using_first_available(vec![Box::new(any)]))
    }

    pub fn push(&mut self, resolver: impl ResolveLicense + 'static) {
        self.resolvers.push(Box::new(resolver));
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Returns `Ok(true)` as soon as one resolver acquires a license.
    #[instrument(skip_all, fields(resolvers = self.resolvers.len()))]
    pub fn obtain(&self, provider: &mut dyn LicenseProvider) -> Result<bool, LicenseError> {
        if self.resolvers.is_empty() {
            warn!("no license resolvers configured");
            return Ok(false);
        }
        for (attempt, resolver) in self.resolvers.iter().enumerate() {
            info!(attempt = attempt + 1, resolver = %resolver, "attempting to obtain license");
            if resolver.resolve_license(provider)? {
                info!(resolver = %resolver, "license obtained");
                return Ok(true);
            }
        }
        warn!("no resolver was able to obtain a license");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCandidate, ScriptedProvider};

    fn boxed(resolver: LicenseResolver) -> Box<dyn ResolveLicense> {
        Box::new(resolver)
    }

    #[test]
    fn falls_through_to_next_resolver() {
        let chain = ResolverChain::using_first_available(vec![
            boxed(
                LicenseResolver::from_dongle()
                    .with_target_short_name("missing")
                    .build()
                    .expect("build"),
            ),
            boxed(LicenseResolver::from_dongle().build().expect("build")),
        ]);
        let mut provider = ScriptedProvider::new(vec![ScriptedCandidate::fixed("workstation", 2)]);

        assert!(chain.obtain(&mut provider).expect("obtain"));
        assert_eq!(provider.enumerations.len(), 2);
        assert_eq!(provider.acquire_calls().len(), 1);
    }

    #[test]
    fn stops_after_first_success() {
        let chain = ResolverChain::using_first_available(vec![
            boxed(LicenseResolver::from_dongle().build().expect("build")),
            boxed(LicenseResolver::from_cloud().build().expect("build")),
        ]);
        let mut provider = ScriptedProvider::new(vec![ScriptedCandidate::fixed("workstation", 2)]);

        assert!(chain.obtain(&mut provider).expect("obtain"));
        assert_eq!(provider.enumerations.len(), 1);
    }

    #[test]
    fn error_stops_the_chain() {
        let chain = ResolverChain::using_first_available(vec![
            boxed(LicenseResolver::from_dongle().build().expect("build")),
            boxed(LicenseResolver::from_dongle().build().expect("build")),
        ]);
        let mut provider = ScriptedProvider::unreachable("offline");

        assert!(chain.obtain(&mut provider).is_err());
        assert_eq!(provider.enumerations.len(), 1);
    }

    #[test]
    fn empty_chain_obtains_nothing() {
        let chain = ResolverChain::using_first_available(Vec::new());
        let mut provider = ScriptedProvider::new(vec![ScriptedCandidate::fixed("a", 2)]);
        assert!(chain.is_empty());
        assert!(!chain.obtain(&mut provider).expect("obtain"));
    }

    #[test]
    fn any_available_sends_no_sources() {
        let chain = ResolverChain::using_any_available().expect("chain");
        let mut provider = ScriptedProvider::new(vec![ScriptedCandidate::fixed("a", 2)]);
        assert!(chain.obtain(&mut provider).expect("obtain"));
        assert_eq!(provider.enumerations[0].sources, None);
    }
}
