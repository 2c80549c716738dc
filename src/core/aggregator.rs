use crate::domain::{AdapterResult, Permit, PermitAdapter, PermitQuery, SearchOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Ordered fallback over jurisdiction adapters.
///
/// Adapters run one at a time in priority order. The first adapter that
/// yields at least one permit ends the search; manual-check links seen before
/// that point are kept. Errors and timeouts count as an empty result.
pub struct PermitAggregator {
    adapters: Vec<Arc<dyn PermitAdapter>>,
    adapter_timeout: Duration,
    adapter_delay: Duration,
}

impl PermitAggregator {
    pub fn new(adapters: Vec<Arc<dyn PermitAdapter>>, adapter_timeout: Duration) -> Self {
        Self {
            adapters,
            adapter_timeout,
            adapter_delay: Duration::ZERO,
        }
    }

    /// Pause between a networked adapter that came back empty and the next one.
    pub fn with_adapter_delay(mut self, delay: Duration) -> Self {
        self.adapter_delay = delay;
        self
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Declared order, except that adapters whose `promote_for_county` matches
    /// the resolved county move directly behind the primary adapter.
    pub fn ordered_for(&self, county: Option<&str>) -> Vec<Arc<dyn PermitAdapter>> {
        let Some((primary, rest)) = self.adapters.split_first() else {
            return Vec::new();
        };

        let county = county.map(str::to_lowercase);
        let matches_county = |adapter: &Arc<dyn PermitAdapter>| match (&county, adapter.promote_for_county()) {
            (Some(county), Some(fragment)) => county.contains(&fragment.to_lowercase()),
            _ => false,
        };

        let (promoted, others): (Vec<_>, Vec<_>) = rest.iter().cloned().partition(matches_county);

        std::iter::once(primary.clone())
            .chain(promoted)
            .chain(others)
            .collect()
    }

    pub async fn find_permits(&self, query: &PermitQuery) -> SearchOutcome {
        let order = self.ordered_for(query.location.county.as_deref());
        let mut outcome = SearchOutcome::default();

        for (position, adapter) in order.iter().enumerate() {
            outcome.checked.push(adapter.name().to_string());

            match self.call_adapter(adapter.as_ref(), query).await {
                AdapterResult::Permits(permits) if !permits.is_empty() => {
                    let permits = dedup_permits(permits);
                    tracing::info!(
                        "✅ {} returned {} permits after checking {} jurisdictions",
                        adapter.name(),
                        permits.len(),
                        outcome.checked.len()
                    );
                    outcome.permits = permits;
                    return outcome;
                }
                AdapterResult::ManualCheck { url } => {
                    tracing::debug!("{}: manual check at {}", adapter.name(), url);
                    outcome.manual_check_urls.push(url);
                }
                AdapterResult::Permits(_) | AdapterResult::Empty => {
                    tracing::debug!("{}: no permits", adapter.name());
                }
            }

            let is_last = position + 1 == order.len();
            if adapter.requires_network() && !self.adapter_delay.is_zero() && !is_last {
                tokio::time::sleep(self.adapter_delay).await;
            }
        }

        tracing::info!(
            "No permits found in {} jurisdictions; {} manual-check links",
            outcome.checked.len(),
            outcome.manual_check_urls.len()
        );
        outcome
    }

    async fn call_adapter(&self, adapter: &dyn PermitAdapter, query: &PermitQuery) -> AdapterResult {
        match tokio::time::timeout(self.adapter_timeout, adapter.search(query)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(
                    "⚠️ {} failed, treating as no results: {} (Category: {:?})",
                    adapter.name(),
                    e,
                    e.category()
                );
                AdapterResult::Empty
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️ {} timed out after {:?}, treating as no results",
                    adapter.name(),
                    self.adapter_timeout
                );
                AdapterResult::Empty
            }
        }
    }
}

/// Keeps the first permit for each (jurisdiction, permit number); permits
/// without a number are always kept.
fn dedup_permits(permits: Vec<Permit>) -> Vec<Permit> {
    let mut seen = HashSet::new();
    permits
        .into_iter()
        .filter(|permit| match &permit.permit_number {
            Some(number) => seen.insert((permit.jurisdiction.clone(), number.clone())),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{PermitError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Permits(Vec<Permit>),
        Empty,
        Manual(&'static str),
        Fail,
        Hang,
    }

    struct StubAdapter {
        name: &'static str,
        promote: Option<&'static str>,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl StubAdapter {
        fn new(name: &'static str, behavior: Behavior) -> (Arc<dyn PermitAdapter>, Arc<AtomicUsize>) {
            Self::promoted(name, None, behavior)
        }

        fn promoted(
            name: &'static str,
            promote: Option<&'static str>,
            behavior: Behavior,
        ) -> (Arc<dyn PermitAdapter>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let adapter = Arc::new(Self {
                name,
                promote,
                behavior,
                calls: calls.clone(),
            });
            (adapter, calls)
        }
    }

    #[async_trait]
    impl PermitAdapter for StubAdapter {
        fn name(&self) -> &str {
            self.name
        }

        fn portal(&self) -> &str {
            "stub"
        }

        fn promote_for_county(&self) -> Option<&str> {
            self.promote
        }

        async fn search(&self, _query: &PermitQuery) -> Result<AdapterResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Permits(p) => Ok(AdapterResult::Permits(p.clone())),
                Behavior::Empty => Ok(AdapterResult::Empty),
                Behavior::Manual(url) => Ok(AdapterResult::ManualCheck {
                    url: url.to_string(),
                }),
                Behavior::Fail => Err(PermitError::UpstreamStatus {
                    adapter: self.name.to_string(),
                    status: 500,
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(AdapterResult::Empty)
                }
            }
        }
    }

    fn permit(jurisdiction: &str, number: &str) -> Permit {
        Permit::new(jurisdiction, "stub").with_number(number).with_status("issued")
    }

    fn aggregator(adapters: Vec<Arc<dyn PermitAdapter>>) -> PermitAggregator {
        PermitAggregator::new(adapters, Duration::from_secs(5))
    }

    fn calls(counter: &Arc<AtomicUsize>) -> usize {
        counter.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_primary_hit_short_circuits() {
        let austin_permit = permit("Austin", "2024-00123");
        let (austin, austin_calls) = StubAdapter::new("Austin", Behavior::Permits(vec![austin_permit.clone()]));
        let (travis, travis_calls) = StubAdapter::new("Travis", Behavior::Permits(vec![permit("Travis", "T-1")]));
        let (hays, hays_calls) = StubAdapter::new("Hays", Behavior::Manual("https://hays.example.gov"));

        let outcome = aggregator(vec![austin, travis, hays])
            .find_permits(&PermitQuery::for_address("100 Congress Ave, Austin, TX"))
            .await;

        assert_eq!(outcome.permits, vec![austin_permit]);
        assert!(outcome.manual_check_urls.is_empty());
        assert_eq!(outcome.checked, vec!["Austin"]);
        assert_eq!(calls(&austin_calls), 1);
        assert_eq!(calls(&travis_calls), 0);
        assert_eq!(calls(&hays_calls), 0);
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_non_empty() {
        let (austin, austin_calls) = StubAdapter::new("Austin", Behavior::Empty);
        let (travis, travis_calls) = StubAdapter::new("Travis", Behavior::Empty);
        let (williamson, williamson_calls) =
            StubAdapter::new("Williamson", Behavior::Permits(vec![permit("Williamson", "W-9")]));
        let (hays, hays_calls) = StubAdapter::new("Hays", Behavior::Permits(vec![permit("Hays", "H-1")]));
        let (harris, harris_calls) = StubAdapter::new("Harris", Behavior::Empty);

        let outcome = aggregator(vec![austin, travis, williamson, hays, harris])
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        assert_eq!(outcome.permits, vec![permit("Williamson", "W-9")]);
        assert_eq!(outcome.checked, vec!["Austin", "Travis", "Williamson"]);
        assert_eq!(
            [&austin_calls, &travis_calls, &williamson_calls, &hays_calls, &harris_calls].map(calls),
            [1, 1, 1, 0, 0]
        );
    }

    #[tokio::test]
    async fn test_all_manual_collects_urls_in_priority_order() {
        let (austin, _) = StubAdapter::new("Austin", Behavior::Empty);
        let (travis, _) = StubAdapter::new("Travis", Behavior::Manual("https://travis.example.gov"));
        let (williamson, _) = StubAdapter::new("Williamson", Behavior::Manual("https://wilco.example.gov"));
        let (hays, _) = StubAdapter::new("Hays", Behavior::Manual("https://hays.example.gov"));
        let (harris, _) = StubAdapter::new("Harris", Behavior::Manual("https://harris.example.gov"));

        let outcome = aggregator(vec![austin, travis, williamson, hays, harris])
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        assert!(outcome.permits.is_empty());
        assert_eq!(
            outcome.manual_check_urls,
            vec![
                "https://travis.example.gov",
                "https://wilco.example.gov",
                "https://hays.example.gov",
                "https://harris.example.gov",
            ]
        );
        assert_eq!(outcome.checked.len(), 5);
    }

    #[tokio::test]
    async fn test_manual_links_before_hit_are_kept() {
        let (austin, _) = StubAdapter::new("Austin", Behavior::Empty);
        let (travis, _) = StubAdapter::new("Travis", Behavior::Manual("https://travis.example.gov"));
        let (hays, _) = StubAdapter::new("Hays", Behavior::Permits(vec![permit("Hays", "H-1")]));
        let (harris, harris_calls) = StubAdapter::new("Harris", Behavior::Manual("https://harris.example.gov"));

        let outcome = aggregator(vec![austin, travis, hays, harris])
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        assert_eq!(outcome.permits.len(), 1);
        assert_eq!(outcome.manual_check_urls, vec!["https://travis.example.gov"]);
        assert_eq!(calls(&harris_calls), 0);
    }

    #[tokio::test]
    async fn test_error_is_equivalent_to_empty() {
        let (failing, failing_calls) = StubAdapter::new("Austin", Behavior::Fail);
        let (travis, _) = StubAdapter::new("Travis", Behavior::Permits(vec![permit("Travis", "T-1")]));
        let with_error = aggregator(vec![failing, travis.clone()])
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        let (empty, _) = StubAdapter::new("Austin", Behavior::Empty);
        let with_empty = aggregator(vec![empty, travis])
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        assert_eq!(calls(&failing_calls), 1);
        assert_eq!(with_error, with_empty);
    }

    #[tokio::test]
    async fn test_timeout_is_equivalent_to_empty() {
        let (slow, _) = StubAdapter::new("Austin", Behavior::Hang);
        let (travis, travis_calls) = StubAdapter::new("Travis", Behavior::Manual("https://travis.example.gov"));

        let outcome = PermitAggregator::new(vec![slow, travis], Duration::from_millis(20))
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        assert!(outcome.permits.is_empty());
        assert_eq!(outcome.manual_check_urls, vec!["https://travis.example.gov"]);
        assert_eq!(calls(&travis_calls), 1);
    }

    #[tokio::test]
    async fn test_empty_permit_vec_is_not_a_hit() {
        let (austin, _) = StubAdapter::new("Austin", Behavior::Permits(vec![]));
        let (travis, travis_calls) = StubAdapter::new("Travis", Behavior::Empty);

        let outcome = aggregator(vec![austin, travis])
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        assert!(outcome.permits.is_empty());
        assert_eq!(calls(&travis_calls), 1);
    }

    #[tokio::test]
    async fn test_duplicate_permit_numbers_dropped() {
        let mut first = permit("Austin", "2024-00123");
        first.description = Some("first".to_string());
        let mut second = permit("Austin", "2024-00123");
        second.description = Some("second".to_string());
        let unnumbered = Permit::new("Austin", "stub");

        let (austin, _) = StubAdapter::new(
            "Austin",
            Behavior::Permits(vec![first.clone(), second, unnumbered.clone(), unnumbered.clone()]),
        );

        let outcome = aggregator(vec![austin])
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        assert_eq!(outcome.permits, vec![first, unnumbered.clone(), unnumbered]);
    }

    #[test]
    fn test_county_promotion_order() {
        let (austin, _) = StubAdapter::new("Austin", Behavior::Empty);
        let (round_rock, _) = StubAdapter::new("Round Rock", Behavior::Empty);
        let (hays, _) = StubAdapter::new("Hays", Behavior::Empty);
        let (harris, _) = StubAdapter::promoted("Harris County", Some("Harris"), Behavior::Empty);
        let (houston, _) = StubAdapter::promoted("City of Houston", Some("Harris"), Behavior::Empty);

        let aggregator = aggregator(vec![austin, round_rock, hays, harris, houston]);
        let names = |county: Option<&str>| -> Vec<String> {
            aggregator
                .ordered_for(county)
                .iter()
                .map(|a| a.name().to_string())
                .collect()
        };

        assert_eq!(
            names(Some("Harris County")),
            vec!["Austin", "Harris County", "City of Houston", "Round Rock", "Hays"]
        );
        assert_eq!(
            names(Some("harris county")),
            vec!["Austin", "Harris County", "City of Houston", "Round Rock", "Hays"]
        );
        assert_eq!(
            names(Some("Travis County")),
            vec!["Austin", "Round Rock", "Hays", "Harris County", "City of Houston"]
        );
        assert_eq!(names(None), names(Some("Travis County")));
    }

    #[test]
    fn test_no_adapters() {
        let aggregator = aggregator(vec![]);
        assert!(aggregator.ordered_for(Some("Harris County")).is_empty());
        let outcome = tokio_test::block_on(aggregator.find_permits(&PermitQuery::for_address("x")));
        assert_eq!(outcome, SearchOutcome::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_after_networked_adapters() {
        let (austin, _) = StubAdapter::new("Austin", Behavior::Empty);
        let (travis, _) = StubAdapter::new("Travis", Behavior::Manual("https://travis.example.gov"));

        let started = tokio::time::Instant::now();
        aggregator(vec![austin, travis])
            .with_adapter_delay(Duration::from_millis(400))
            .find_permits(&PermitQuery::for_address("1 Main St"))
            .await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(400));
        assert!(elapsed < Duration::from_millis(800));
    }
}
