//! Metrics for the notification engine, named per Prometheus conventions.

use std::fmt;

/// Every metric the engine emits. No magic strings at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Catalog metrics
    CatalogLoadsSuccess,
    CatalogLoadsError,

    // Resolver metrics
    ResolverSpawnsResolved,
    ResolverParseMisses,
    ResolverStoreDegradations,

    // Subscription mutation metrics
    SubscriptionsNamesAccepted,
    SubscriptionsNamesRejected,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::CatalogLoadsSuccess => "spawnwatch_catalog_loads_success_total",
            MetricName::CatalogLoadsError => "spawnwatch_catalog_loads_error_total",
            MetricName::ResolverSpawnsResolved => "spawnwatch_resolver_spawns_resolved_total",
            MetricName::ResolverParseMisses => "spawnwatch_resolver_parse_misses_total",
            MetricName::ResolverStoreDegradations => {
                "spawnwatch_resolver_store_degradations_total"
            }
            MetricName::SubscriptionsNamesAccepted => {
                "spawnwatch_subscriptions_names_accepted_total"
            }
            MetricName::SubscriptionsNamesRejected => {
                "spawnwatch_subscriptions_names_rejected_total"
            }
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub mod catalog {
    use super::MetricName;

    pub fn load_success() {
        ::metrics::counter!(MetricName::CatalogLoadsSuccess.as_str()).increment(1);
    }

    pub fn load_error() {
        ::metrics::counter!(MetricName::CatalogLoadsError.as_str()).increment(1);
    }
}

pub mod resolver {
    use super::MetricName;

    pub fn spawn_resolved() {
        ::metrics::counter!(MetricName::ResolverSpawnsResolved.as_str()).increment(1);
    }

    pub fn parse_miss() {
        ::metrics::counter!(MetricName::ResolverParseMisses.as_str()).increment(1);
    }

    /// One category of one resolution degraded to an empty result.
    pub fn store_degraded(category: &str) {
        ::metrics::counter!(
            MetricName::ResolverStoreDegradations.as_str(),
            "category" => category.to_string()
        )
        .increment(1);
    }
}

pub mod subscriptions {
    use super::MetricName;

    pub fn names_accepted(count: usize) {
        ::metrics::counter!(MetricName::SubscriptionsNamesAccepted.as_str())
            .increment(count as u64);
    }

    pub fn names_rejected(count: usize) {
        ::metrics::counter!(MetricName::SubscriptionsNamesRejected.as_str())
            .increment(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_follow_prometheus_conventions() {
        let names = [
            MetricName::CatalogLoadsSuccess,
            MetricName::CatalogLoadsError,
            MetricName::ResolverSpawnsResolved,
            MetricName::ResolverParseMisses,
            MetricName::ResolverStoreDegradations,
            MetricName::SubscriptionsNamesAccepted,
            MetricName::SubscriptionsNamesRejected,
        ];
        for name in names {
            assert!(name.as_str().starts_with("spawnwatch_"));
            assert!(name.as_str().ends_with("_total"));
        }
    }
}
