//! # TeamCity client core
//!
//! A resilience and traversal layer between tool calls and a TeamCity REST
//! server. The server exposes paginated, filterable collections (projects,
//! builds, agents, triggers, queued items) and tree-shaped project
//! hierarchies, with inconsistent pagination markers and occasional transient
//! failures; this crate absorbs both.
//!
//! ## Core Concepts
//!
//! - **Locator**: TeamCity's `key:value` filter-query strings, built and
//!   merged without ever duplicating a filter key ([`locator`])
//! - **Invoker**: one logical remote call wrapped with circuit-breaker gating
//!   and retry backoff ([`invoker`], [`breaker`], [`retry`])
//! - **Paginator**: one page or all pages of a collection, assembled through
//!   the invoker ([`paging`])
//! - **HierarchyWalker**: ancestor chains, descendant sets, and whole
//!   subtrees over the mutable project graph, guarded against cycles
//!   ([`hierarchy`])
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teamcity_client::{
//!     BuildLocator, CircuitBreaker, ClientConfig, ConfigBuilder, HttpTransport, Invoker,
//!     Paginator, SystemClock,
//! };
//!
//! # async fn example() -> teamcity_client::Result<()> {
//! let config = ConfigBuilder::new()
//!     .base_url("https://teamcity.example.com")
//!     .token(std::env::var("TEAMCITY_TOKEN").unwrap_or_default())
//!     .build();
//!
//! let clock = Arc::new(SystemClock);
//! let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone(), clock.clone()));
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let invoker = Arc::new(Invoker::new(config.retry.clone(), breaker, clock));
//! let paginator = Paginator::new(transport, invoker, config.paging.clone());
//!
//! let locator = BuildLocator {
//!     project: Some("MyProject".to_string()),
//!     status: Some("SUCCESS".to_string()),
//!     ..Default::default()
//! }
//! .build();
//!
//! let builds: Vec<serde_json::Value> = paginator
//!     .fetch_all("builds", "build", &locator, 100, 10)
//!     .await?;
//! println!("{} builds", builds.len());
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod clock;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod invoker;
pub mod locator;
pub mod paging;
pub mod retry;
pub mod transport;

// Public re-exports for convenience
pub use breaker::{CircuitBreaker, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AuthConfig, BreakerConfig, ClientConfig, ConfigBuilder, PagingConfig, RetryConfig,
};
pub use error::{Result, TeamCityError};
pub use hierarchy::{Descendant, HierarchyNode, HierarchyWalker, ProjectRef, ROOT_PROJECT_ID};
pub use invoker::Invoker;
pub use locator::{
    dimension_key, merge_segments, normalize_dimension, split_top_level, BuildLocator,
};
pub use paging::{Continuation, Page, PageRequest, PageResult, Paginator};
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{HttpTransport, ScriptedTransport, Transport};
