//! Operational counters and their export formats

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

/// A named pool counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stat {
    /// Resources created by the create callback
    Allocations,
    /// Successful acquisitions handed to a caller
    Borrows,
    /// Calls to `release`
    Releases,
    /// Resources destroyed for any reason
    Destroys,
    /// High-water mark of live resources
    MaxSize,
    /// Times an acquire had to block
    Suspends,
    /// Candidates rejected by the borrow validator
    InvalidOnBorrow,
    /// Returned resources rejected by the release validator
    InvalidOnRelease,
    /// Idle resources destroyed because they sat idle too long
    IdleTimeExceeded,
}

impl Stat {
    pub const ALL: [Stat; 9] = [
        Stat::Allocations,
        Stat::Borrows,
        Stat::Releases,
        Stat::Destroys,
        Stat::MaxSize,
        Stat::Suspends,
        Stat::InvalidOnBorrow,
        Stat::InvalidOnRelease,
        Stat::IdleTimeExceeded,
    ];

    /// Snake-case name used by the exporters
    pub fn name(self) -> &'static str {
        match self {
            Stat::Allocations => "allocations",
            Stat::Borrows => "borrows",
            Stat::Releases => "releases",
            Stat::Destroys => "destroys",
            Stat::MaxSize => "max_size",
            Stat::Suspends => "suspends",
            Stat::InvalidOnBorrow => "invalid_on_borrow",
            Stat::InvalidOnRelease => "invalid_on_release",
            Stat::IdleTimeExceeded => "idle_time_exceeded",
        }
    }

    fn help(self) -> &'static str {
        match self {
            Stat::Allocations => "Resources created",
            Stat::Borrows => "Resources handed out",
            Stat::Releases => "Resources returned",
            Stat::Destroys => "Resources destroyed",
            Stat::MaxSize => "High-water mark of live resources",
            Stat::Suspends => "Acquires that had to wait",
            Stat::InvalidOnBorrow => "Resources rejected on borrow",
            Stat::InvalidOnRelease => "Resources rejected on release",
            Stat::IdleTimeExceeded => "Resources expired while idle",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point-in-time snapshot of a pool's counters
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{Pool, PoolConfiguration, PoolOptions, Stat};
///
/// let config = PoolConfiguration::new(|| Ok(String::from("conn")), PoolOptions::new()).unwrap();
/// let pool = Pool::new(config).unwrap();
///
/// let entry = pool.acquire().unwrap();
/// pool.release(entry).unwrap();
///
/// let counts = pool.counts();
/// assert_eq!(counts.get(Stat::Allocations), 1);
/// assert_eq!(counts.get(Stat::Releases), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Counters {
    name: String,
    values: [u64; 9],
}

impl Counters {
    /// Value of a single counter
    pub fn get(&self, stat: Stat) -> u64 {
        self.values[stat.index()]
    }

    /// Name of the pool this snapshot was taken from
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stat, u64)> + '_ {
        Stat::ALL.into_iter().map(move |stat| (stat, self.get(stat)))
    }

    /// Export counters as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(stat, value)| (stat.name().to_string(), value.to_string()))
            .collect()
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export counters in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{MetricsExporter, Pool, PoolConfiguration, PoolOptions};
    /// use std::collections::HashMap;
    ///
    /// let config = PoolConfiguration::new(|| Ok(0u32), PoolOptions::new()).unwrap();
    /// let pool = Pool::new(config).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&pool.counts(), "db", Some(&tags));
    /// assert!(output.contains("resourcepool_borrows_total"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        counters: &Counters,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        for (stat, value) in counters.iter() {
            // MaxSize is a high-water mark, the rest only ever count up
            let (metric, kind) = match stat {
                Stat::MaxSize => (format!("resourcepool_{}", stat.name()), "gauge"),
                _ => (format!("resourcepool_{}_total", stat.name()), "counter"),
            };
            output.push_str(&format!("# HELP {} {}\n", metric, stat.help()));
            output.push_str(&format!("# TYPE {} {}\n", metric, kind));
            output.push_str(&format!("{}{{{}}} {}\n", metric, labels, value));
        }

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Mutable counters, owned by the pool state and updated under its lock
#[derive(Debug, Default)]
pub(crate) struct CounterSet {
    values: [u64; 9],
}

impl CounterSet {
    pub fn incr(&mut self, stat: Stat) {
        self.values[stat.index()] += 1;
    }

    pub fn add(&mut self, stat: Stat, amount: u64) {
        self.values[stat.index()] += amount;
    }

    /// Raise the high-water mark to `live` if it is larger
    pub fn observe_size(&mut self, live: usize) {
        let slot = &mut self.values[Stat::MaxSize.index()];
        *slot = (*slot).max(live as u64);
    }

    pub fn snapshot(&self, name: &str) -> Counters {
        Counters {
            name: name.to_string(),
            values: self.values,
        }
    }
}
