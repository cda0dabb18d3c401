use std::time::Duration;

use crate::providers::{fetch_or_empty, ContentProvider, FetchHint, StaticBackupList};
use crate::types::{Challenge, ContentKind};

/// Walk `providers` in rank order and return the first non-empty batch.
///
/// Lower-ranked providers are not called once one has produced something.
pub async fn first_non_empty(
    providers: &mut [Box<dyn ContentProvider>],
    hint: FetchHint,
    timeout: Duration,
) -> Option<(String, Vec<Challenge>)> {
    for provider in providers.iter_mut() {
        let items = fetch_or_empty(provider.as_mut(), hint, timeout).await;
        if !items.is_empty() {
            return Some((provider.name().to_string(), items));
        }
    }
    None
}

/// Ranked providers for one content class, terminated by a static backup list
pub struct SourceCascade {
    kind: ContentKind,
    providers: Vec<Box<dyn ContentProvider>>,
    backup: StaticBackupList,
    timeout: Duration,
}

impl SourceCascade {
    pub fn builder(kind: ContentKind, backup_limit: usize) -> CascadeBuilder {
        CascadeBuilder {
            kind,
            providers: Vec::new(),
            backup_limit,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn providers(&self) -> &[Box<dyn ContentProvider>] {
        &self.providers
    }

    /// Resolve candidates for this class. Never returns an empty list as long
    /// as the backup catalog is non-empty.
    pub async fn resolve(&mut self, hint: FetchHint) -> Vec<Challenge> {
        if let Some((name, items)) = first_non_empty(&mut self.providers, hint, self.timeout).await {
            tracing::info!("{}: {} items from {} ({:?})", self.kind, items.len(), name, hint);
            return items;
        }

        tracing::warn!(
            "CascadeExhausted: every {} provider came back empty, using backup list",
            self.kind
        );
        self.backup.get(hint)
    }

    pub fn reset_hints(&mut self) {
        for provider in &mut self.providers {
            provider.reset_hints();
        }
    }
}

pub struct CascadeBuilder {
    kind: ContentKind,
    providers: Vec<Box<dyn ContentProvider>>,
    backup_limit: usize,
    timeout: Duration,
}

impl CascadeBuilder {
    /// Append a provider at the next lower rank. Providers of another
    /// content class are dropped.
    pub fn provider(mut self, provider: Box<dyn ContentProvider>) -> Self {
        if provider.kind() == self.kind {
            self.providers.push(provider);
        } else {
            tracing::warn!(
                "Ignoring provider {} ({}) for the {} cascade",
                provider.name(),
                provider.kind(),
                self.kind
            );
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> SourceCascade {
        SourceCascade {
            kind: self.kind,
            providers: self.providers,
            backup: StaticBackupList::new(self.kind, self.backup_limit),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::*;
    use crate::providers::ProviderError;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_first_provider_short_circuits() {
        let p1 = StubProvider::new("p1", ContentKind::Film).returning(films(&["Alien"]));
        let p2 = StubProvider::new("p2", ContentKind::Film).returning(films(&["Heat"]));
        let p2_calls = p2.call_counter();

        let mut cascade = SourceCascade::builder(ContentKind::Film, 50)
            .provider(Box::new(p1))
            .provider(Box::new(p2))
            .build();

        let items = cascade.resolve(FetchHint::Primary).await;
        assert_eq!(items, films(&["Alien"]));
        assert_eq!(p2_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_through_empty_and_failing_providers() {
        let p1 = StubProvider::new("p1", ContentKind::Film).returning(vec![]);
        let p2 = StubProvider::new("p2", ContentKind::Film).failing(ProviderError::Status(500));
        let p3 = StubProvider::new("p3", ContentKind::Film).returning(films(&["Heat"]));

        let mut cascade = SourceCascade::builder(ContentKind::Film, 50)
            .provider(Box::new(p1))
            .provider(Box::new(p2))
            .provider(Box::new(p3))
            .build();

        let items = cascade.resolve(FetchHint::Primary).await;
        assert_eq!(items, films(&["Heat"]));
    }

    #[tokio::test]
    async fn test_backup_when_all_remote_fail() {
        let p1 = StubProvider::new("p1", ContentKind::TvShow).failing(ProviderError::Status(503));
        let p2 = StubProvider::new("p2", ContentKind::TvShow).returning(vec![]);

        let mut cascade = SourceCascade::builder(ContentKind::TvShow, 50)
            .provider(Box::new(p1))
            .provider(Box::new(p2))
            .build();

        for hint in [FetchHint::Primary, FetchHint::Supplemental] {
            let items = cascade.resolve(hint).await;
            assert_eq!(items.len(), 50);
            assert!(items.iter().all(|c| c.kind == ContentKind::TvShow));
        }
    }

    #[tokio::test]
    async fn test_backup_not_used_when_remote_succeeds() {
        let p1 = StubProvider::new("p1", ContentKind::Film).returning(films(&["Alien"]));
        let mut cascade = SourceCascade::builder(ContentKind::Film, 50)
            .provider(Box::new(p1))
            .build();

        let items = cascade.resolve(FetchHint::Primary).await;
        assert!(items.iter().all(|c| c.provenance.is_none()));
    }

    #[tokio::test]
    async fn test_builder_rejects_other_kinds() {
        let tv = StubProvider::new("tv", ContentKind::TvShow).returning(vec![]);
        let cascade = SourceCascade::builder(ContentKind::Film, 50)
            .provider(Box::new(tv))
            .build();
        assert!(cascade.provider_names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_provider_falls_through() {
        let mut slow = StubProvider::new("slow", ContentKind::Film).returning(films(&["Alien"]));
        slow.delay = Some(Duration::from_secs(60));
        let fast = StubProvider::new("fast", ContentKind::Film).returning(films(&["Heat"]));

        let mut cascade = SourceCascade::builder(ContentKind::Film, 50)
            .provider(Box::new(slow))
            .provider(Box::new(fast))
            .timeout(Duration::from_secs(2))
            .build();

        let items = cascade.resolve(FetchHint::Primary).await;
        assert_eq!(items, films(&["Heat"]));
    }
}
