//! Web search collaborators
//!
//! A unified provider interface over Tavily, Linkup, and Brave. Each
//! provider owns a key pool; retryable failures rotate to the next key
//! with exponential backoff, and rotations are reported back to the
//! caller as values on the outcome rather than through stored callbacks.

pub mod brave;
pub mod linkup;
pub mod tavily;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Config, KeyRotator, SearchProviderKind};
use crate::core::{AgentError, AgentResult};

pub use brave::BraveProvider;
pub use linkup::LinkupProvider;
pub use tavily::TavilyProvider;

/// Retry budget per search call
pub const MAX_RETRY_ATTEMPTS: usize = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// HTTP budget for one search request
pub(crate) const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Status codes that should trigger key rotation
pub fn should_rotate_key(status: u16) -> bool {
    matches!(status, 401 | 403 | 429)
}

/// Backoff before retry `attempt` (0-based): 100ms doubling, capped at 2s
pub fn backoff_for_attempt(attempt: usize) -> Duration {
    let mut backoff = INITIAL_BACKOFF;
    for _ in 0..attempt {
        backoff = backoff.saturating_mul(2);
        if backoff >= MAX_BACKOFF {
            return MAX_BACKOFF;
        }
    }
    backoff
}

/// A single search result, unified across providers
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
}

/// A key rotation that happened during a search (1-based for display)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRotation {
    pub from_index: usize,
    pub to_index: usize,
    pub total: usize,
}

/// Outcome of a search call, including any key rotations performed
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    /// Direct answer, provided by some providers
    pub answer: Option<String>,
    pub rotations: Vec<KeyRotation>,
}

impl SearchOutcome {
    /// Render results as numbered context for the model
    pub fn format_results_as_context(&self) -> String {
        let mut out = String::new();
        for (i, r) in self.results.iter().enumerate() {
            out.push_str(&format!(
                "[{}] {}\nURL: {}\n{}\n\n",
                i + 1,
                r.title,
                r.url,
                r.content
            ));
        }
        out
    }
}

/// Interface for web search providers
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for display ("tavily", "linkup", "brave")
    fn name(&self) -> &'static str;

    /// Perform a web search with the given query
    async fn search(&self, query: &str) -> AgentResult<SearchOutcome>;
}

/// Raw provider response before rotation bookkeeping
pub(crate) struct RawSearch {
    pub results: Vec<SearchResult>,
    pub answer: Option<String>,
}

/// One concrete backend: a single-attempt search plus its key pool
#[async_trait]
pub(crate) trait SearchBackend: Send + Sync {
    fn provider_name(&self) -> &'static str;
    fn rotator(&self) -> &KeyRotator;
    async fn attempt(&self, query: &str, api_key: &str) -> AgentResult<RawSearch>;
}

/// Shared retry loop: rotate keys on 401/403/429, back off, give up when
/// the pool or the attempt budget is exhausted.
pub(crate) async fn search_with_rotation(
    backend: &dyn SearchBackend,
    query: &str,
) -> AgentResult<SearchOutcome> {
    let rotator = backend.rotator();
    let mut rotations = Vec::new();

    for attempt in 0..MAX_RETRY_ATTEMPTS {
        let Some(key) = rotator.current_key() else {
            return Err(AgentError::other(format!(
                "no {} API key configured",
                backend.provider_name()
            )));
        };

        match backend.attempt(query, &key).await {
            Ok(raw) => {
                return Ok(SearchOutcome {
                    results: raw.results,
                    answer: raw.answer,
                    rotations,
                })
            }
            Err(e) => {
                let rotatable = e.status().map(should_rotate_key).unwrap_or(false);
                if !rotatable {
                    return Err(e);
                }

                match rotator.rotate() {
                    Ok((from, to)) => {
                        tracing::warn!(
                            "{} key {}/{} failed, switching to key {}/{}",
                            backend.provider_name(),
                            from + 1,
                            rotator.key_count(),
                            to + 1,
                            rotator.key_count()
                        );
                        rotations.push(KeyRotation {
                            from_index: from + 1,
                            to_index: to + 1,
                            total: rotator.key_count(),
                        });
                    }
                    Err(_) => {
                        return Err(AgentError::other(format!(
                            "{} (no more {} API keys available)",
                            e,
                            backend.provider_name()
                        )))
                    }
                }

                if attempt + 1 < MAX_RETRY_ATTEMPTS {
                    tokio::time::sleep(backoff_for_attempt(attempt)).await;
                }
            }
        }
    }

    Err(AgentError::other(format!(
        "max retry attempts ({}) exceeded",
        MAX_RETRY_ATTEMPTS
    )))
}

/// Blanket impl: every backend is a provider through the rotation loop
#[async_trait]
impl<T: SearchBackend> SearchProvider for T {
    fn name(&self) -> &'static str {
        self.provider_name()
    }

    async fn search(&self, query: &str) -> AgentResult<SearchOutcome> {
        search_with_rotation(self, query).await
    }
}

/// Build the provider selected by the configuration
pub fn provider_for(config: &Config) -> AgentResult<Box<dyn SearchProvider>> {
    config.require_search_keys().map_err(|e| AgentError::other(e.to_string()))?;

    Ok(match config.search_provider {
        SearchProviderKind::Tavily => {
            Box::new(TavilyProvider::new(Arc::clone(&config.tavily_keys))?)
        }
        SearchProviderKind::Linkup => {
            Box::new(LinkupProvider::new(Arc::clone(&config.linkup_keys))?)
        }
        SearchProviderKind::Brave => {
            Box::new(BraveProvider::new(Arc::clone(&config.brave_keys))?)
        }
    })
}

pub(crate) fn search_http_client() -> AgentResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(SEARCH_TIMEOUT).build()?)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_should_rotate_key() {
        assert!(should_rotate_key(401));
        assert!(should_rotate_key(403));
        assert!(should_rotate_key(429));
        assert!(!should_rotate_key(400));
        assert!(!should_rotate_key(500));
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_for_attempt(0), Duration::from_millis(100));
        assert_eq!(backoff_for_attempt(1), Duration::from_millis(200));
        assert_eq!(backoff_for_attempt(2), Duration::from_millis(400));
        assert_eq!(backoff_for_attempt(10), Duration::from_secs(2));
    }

    #[test]
    fn test_format_results_as_context() {
        let outcome = SearchOutcome {
            results: vec![SearchResult {
                title: "Rust".into(),
                url: "https://rust-lang.org".into(),
                content: "A language".into(),
                score: 0.9,
            }],
            answer: None,
            rotations: Vec::new(),
        };
        let ctx = outcome.format_results_as_context();
        assert!(ctx.starts_with("[1] Rust\nURL: https://rust-lang.org\nA language"));

        assert_eq!(SearchOutcome::default().format_results_as_context(), "");
    }

    /// Backend that fails with a given status a fixed number of times
    struct FlakyBackend {
        rotator: KeyRotator,
        failures: AtomicUsize,
        status: u16,
    }

    #[async_trait]
    impl SearchBackend for FlakyBackend {
        fn provider_name(&self) -> &'static str {
            "flaky"
        }

        fn rotator(&self) -> &KeyRotator {
            &self.rotator
        }

        async fn attempt(&self, _query: &str, api_key: &str) -> AgentResult<RawSearch> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                (f > 0).then(|| f - 1)
            }).is_ok()
            {
                return Err(AgentError::api(self.status, "denied"));
            }
            Ok(RawSearch {
                results: vec![SearchResult {
                    title: format!("found with {}", api_key),
                    url: String::new(),
                    content: String::new(),
                    score: 0.0,
                }],
                answer: None,
            })
        }
    }

    #[tokio::test]
    async fn test_rotation_recovers_and_reports() {
        let backend = FlakyBackend {
            rotator: KeyRotator::new(vec!["k1".into(), "k2".into()]),
            failures: AtomicUsize::new(1),
            status: 429,
        };

        let outcome = search_with_rotation(&backend, "q").await.unwrap();
        assert_eq!(outcome.results[0].title, "found with k2");
        assert_eq!(
            outcome.rotations,
            vec![KeyRotation {
                from_index: 1,
                to_index: 2,
                total: 2
            }]
        );
    }

    #[tokio::test]
    async fn test_non_rotatable_error_fails_fast() {
        let backend = FlakyBackend {
            rotator: KeyRotator::new(vec!["k1".into(), "k2".into()]),
            failures: AtomicUsize::new(5),
            status: 500,
        };

        let err = search_with_rotation(&backend, "q").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(backend.rotator.current_index(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_pool_gives_up() {
        let backend = FlakyBackend {
            rotator: KeyRotator::new(vec!["k1".into()]),
            failures: AtomicUsize::new(5),
            status: 401,
        };

        let err = search_with_rotation(&backend, "q").await.unwrap_err();
        assert!(err.to_string().contains("no more flaky API keys"));
    }
}
