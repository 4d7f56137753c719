//! End-to-end resolve scenarios driven by a scripted provider and a manual clock

use flyer_geocoder::geocoding::{
    Coordinates, Location, LookupError, ResilientResolver, ResolutionError, ResolverConfig,
};
use flyer_geocoder::resilience::{CircuitBreakerConfig, CircuitState};
use flyer_geocoder::testing::{ManualClock, ScriptedProvider};
use std::sync::Arc;
use std::time::Duration;

fn location(latitude: f64, longitude: f64) -> Location {
    Location::new(Coordinates::new(latitude, longitude).unwrap())
}

fn resolver_with(
    name: &str,
    provider: ScriptedProvider,
    config: ResolverConfig,
) -> (ResilientResolver<ScriptedProvider>, ManualClock) {
    let clock = ManualClock::new();
    let resolver = ResilientResolver::with_runtime(
        name,
        provider,
        config,
        Arc::new(clock.clone()),
        Arc::new(clock.clone()),
    );
    (resolver, clock)
}

fn resolver(provider: ScriptedProvider) -> (ResilientResolver<ScriptedProvider>, ManualClock) {
    resolver_with("nominatim", provider, ResolverConfig::default())
}

// =============================================================================
// Retry behaviour
// =============================================================================

#[tokio::test]
async fn test_various_address_formats_resolve() {
    let provider = ScriptedProvider::new();
    provider.fallback_found(location(51.5074, -0.1278));
    let (resolver, _clock) = resolver(provider.clone());

    for address in [
        "123 Main St, New York, NY 10001",
        "Bahnhofstrasse 1, 8001 Zürich",
        "London, UK",
    ] {
        let coordinates = resolver.resolve(address).await.unwrap();
        assert_eq!(coordinates, Coordinates::new(51.5074, -0.1278).unwrap());
    }

    assert_eq!(provider.calls(), 3);
    assert_eq!(resolver.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_mixed_transient_errors_then_success() {
    let provider = ScriptedProvider::new();
    provider.push_service_error("HTTP 502");
    provider.push_timeout();
    provider.push_found(location(47.3769, 8.5417));
    let (resolver, clock) = resolver(provider.clone());

    let coordinates = resolver.resolve("Zurich, Switzerland").await.unwrap();

    assert_eq!(coordinates.latitude, 47.3769);
    assert_eq!(provider.calls(), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
}

#[tokio::test]
async fn test_exhaustion_reports_last_error() {
    let provider = ScriptedProvider::new();
    provider.push_timeout();
    provider.push_timeout();
    provider.push_service_error("HTTP 503");
    let (resolver, _clock) = resolver(provider.clone());

    let err = resolver.resolve("Zurich").await.unwrap_err();

    assert_eq!(
        err,
        ResolutionError::ExhaustedRetries {
            attempts: 3,
            last_error: LookupError::Service("HTTP 503".to_string()),
        }
    );
}

#[tokio::test]
async fn test_absent_after_transient_error_stops_retrying() {
    let provider = ScriptedProvider::new();
    provider.push_timeout();
    provider.push_absent();
    provider.fallback_found(location(1.0, 1.0));
    let (resolver, clock) = resolver(provider.clone());

    let err = resolver.resolve("Nowhere 1").await.unwrap_err();

    assert!(matches!(err, ResolutionError::NotFound { .. }));
    assert_eq!(provider.calls(), 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
}

// =============================================================================
// Circuit breaker accounting
// =============================================================================

#[tokio::test]
async fn test_nine_lookups_open_circuit_and_tenth_call_is_rejected() {
    let provider = ScriptedProvider::new();
    provider.fallback_timeout();
    let (resolver, clock) = resolver(provider.clone());

    for _ in 0..3 {
        let err = resolver.resolve("Test Address").await.unwrap_err();
        assert!(matches!(err, ResolutionError::ExhaustedRetries { attempts: 3, .. }));
    }
    assert_eq!(provider.calls(), 9);
    assert_eq!(clock.sleeps().len(), 6);

    let err = resolver.resolve("Test Address").await.unwrap_err();

    assert!(matches!(err, ResolutionError::CircuitOpen { .. }));
    assert_eq!(err.to_string(), "Circuit breaker is open");
    assert_eq!(provider.calls(), 9);
    assert_eq!(clock.sleeps().len(), 6);

    // Rejections do not count as failures
    let snapshot = resolver.breaker().snapshot();
    assert_eq!(snapshot.total_failures, 3);
    assert_eq!(snapshot.total_rejections, 1);
}

#[tokio::test]
async fn test_not_found_results_can_open_the_circuit() {
    let provider = ScriptedProvider::new();
    provider.fallback_absent();
    let (resolver, _clock) = resolver(provider.clone());

    for _ in 0..3 {
        let err = resolver.resolve("InvalidAddressXYZ123456789").await.unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { .. }));
    }

    assert_eq!(provider.calls(), 3);
    assert_eq!(resolver.circuit_state(), CircuitState::Open);
}

#[tokio::test]
async fn test_success_between_failures_keeps_circuit_closed() {
    let provider = ScriptedProvider::new();
    provider.push_absent();
    provider.push_absent();
    provider.push_found(location(10.0, 10.0));
    provider.push_absent();
    provider.push_absent();
    let (resolver, _clock) = resolver(provider.clone());

    for _ in 0..5 {
        let _ = resolver.resolve("Somewhere").await;
    }

    let snapshot = resolver.breaker().snapshot();
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.consecutive_failures, 2);
}

#[tokio::test]
async fn test_recovery_cycle_after_cooldown() {
    let provider = ScriptedProvider::new();
    provider.fallback_service_error("HTTP 503");
    let (resolver, clock) = resolver(provider.clone());

    for _ in 0..3 {
        let _ = resolver.resolve("Test Address").await;
    }
    assert_eq!(resolver.circuit_state(), CircuitState::Open);

    // Just before the cooldown lapses the call is still rejected
    clock.advance(Duration::from_secs(59));
    let calls = provider.calls();
    assert!(matches!(
        resolver.resolve("Test Address").await,
        Err(ResolutionError::CircuitOpen { .. })
    ));
    assert_eq!(provider.calls(), calls);

    clock.advance(Duration::from_secs(1));
    provider.fallback_found(location(47.3769, 8.5417));

    resolver.resolve("Test Address").await.unwrap();
    let snapshot = resolver.breaker().snapshot();
    assert_eq!(snapshot.state, CircuitState::HalfOpen);
    assert_eq!(snapshot.consecutive_successes, 1);

    resolver.resolve("Test Address").await.unwrap();
    let snapshot = resolver.breaker().snapshot();
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.consecutive_successes, 0);
    assert_eq!(snapshot.consecutive_failures, 0);
}

#[tokio::test]
async fn test_custom_thresholds() {
    let provider = ScriptedProvider::new();
    provider.fallback_absent();
    let config = ResolverConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            timeout: Duration::from_secs(10),
        },
        ..ResolverConfig::default()
    };
    let (resolver, clock) = resolver_with("strict", provider.clone(), config);

    let _ = resolver.resolve("a").await;
    assert_eq!(resolver.circuit_state(), CircuitState::Open);

    clock.advance(Duration::from_secs(10));
    provider.fallback_found(location(0.0, 0.0));
    resolver.resolve("a").await.unwrap();

    assert_eq!(resolver.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_concurrent_calls_in_half_open_all_pass_through() {
    let provider = ScriptedProvider::new();
    provider.fallback_absent();
    let (resolver, clock) = resolver(provider.clone());
    for _ in 0..3 {
        let _ = resolver.resolve("x").await;
    }
    assert_eq!(resolver.circuit_state(), CircuitState::Open);

    clock.advance(Duration::from_secs(60));
    provider.fallback_found(location(5.0, 5.0));
    let calls = provider.calls();

    let (a, b) = tokio::join!(resolver.resolve("x"), resolver.resolve("y"));

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(provider.calls(), calls + 2);
    assert_eq!(resolver.circuit_state(), CircuitState::Closed);
}

// =============================================================================
// Instance isolation
// =============================================================================

#[tokio::test]
async fn test_resolvers_do_not_share_breaker_state() {
    let failing = ScriptedProvider::new();
    failing.fallback_timeout();
    let healthy = ScriptedProvider::new();
    healthy.fallback_found(location(46.948, 7.4474));

    let (primary, _) = resolver_with("primary", failing, ResolverConfig::default());
    let (secondary, _) = resolver_with("secondary", healthy, ResolverConfig::default());

    for _ in 0..3 {
        let _ = primary.resolve("Bern").await;
    }

    assert_eq!(primary.circuit_state(), CircuitState::Open);
    assert_eq!(secondary.circuit_state(), CircuitState::Closed);
    assert!(secondary.resolve("Bern").await.is_ok());
    assert_eq!(
        primary.resolve("Bern").await,
        Err(ResolutionError::CircuitOpen {
            name: "primary".to_string()
        })
    );
}
