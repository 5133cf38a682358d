//! Process-wide usage counters.

use chrono::{DateTime, Utc};
use ragroute_core::{Category, Strategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::time::Instant;

#[derive(Debug, Default)]
struct Counters {
    queries_total: u64,
    by_category: BTreeMap<Category, u64>,
    by_strategy: BTreeMap<Strategy, u64>,
    web_searches: u64,
}

/// Counters shared by every request the router serves.
#[derive(Debug)]
pub struct UsageStats {
    counters: RwLock<Counters>,
    start_time: DateTime<Utc>,
    started: Instant,
}

/// A point-in-time copy of [`UsageStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub queries_total: u64,
    pub queries_by_category: BTreeMap<Category, u64>,
    pub queries_by_strategy: BTreeMap<Strategy, u64>,
    pub web_searches: u64,
    pub start_time: DateTime<Utc>,
    pub uptime_secs: u64,
}

impl Default for UsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageStats {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(Counters::default()),
            start_time: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn record_query(&self, category: Category, strategy: Strategy) {
        let mut c = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        c.queries_total += 1;
        *c.by_category.entry(category).or_default() += 1;
        *c.by_strategy.entry(strategy).or_default() += 1;
    }

    pub fn record_web_search(&self) {
        self.counters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .web_searches += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        StatsSnapshot {
            queries_total: c.queries_total,
            queries_by_category: c.by_category.clone(),
            queries_by_strategy: c.by_strategy.clone(),
            web_searches: c.web_searches,
            start_time: self.start_time,
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}
