//! Human-readable cache statistics

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use super::key::RequestMode;
use super::policy;
use super::store::StoreStats;

/// Number of entries listed under "Recent entries"
const RECENT_ENTRIES: usize = 10;

/// Longest label shown in the listing
const MAX_LABEL_CHARS: usize = 50;

/// One line of the recent entries listing
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub mode: RequestMode,
    pub label: String,
    pub stored_at: DateTime<Utc>,
    pub expired: bool,
}

/// Snapshot of the cache contents, rendered with `Display`
#[derive(Debug, Clone, PartialEq)]
pub struct CacheReport {
    /// Cache directory, when the store is on disk
    pub location: Option<PathBuf>,
    pub entry_count: usize,
    /// Entries whose TTL has elapsed
    pub expired_count: usize,
    pub total_bytes: u64,
    pub oldest_stored_at: Option<DateTime<Utc>>,
    pub newest_stored_at: Option<DateTime<Utc>>,
    /// Newest entries first, at most ten
    pub recent: Vec<ReportLine>,
    /// Instant ages are measured against
    pub generated_at: DateTime<Utc>,
}

impl CacheReport {
    /// Builds a report from store statistics, judging expiry at `now`
    pub fn from_stats(stats: StoreStats, location: Option<PathBuf>, now: DateTime<Utc>) -> Self {
        let is_expired = |stored_at: DateTime<Utc>, ttl_seconds: u64| {
            now >= policy::expiry_instant(stored_at, ttl_seconds)
        };

        let expired_count = stats
            .entries
            .iter()
            .filter(|e| is_expired(e.stored_at, e.ttl_seconds))
            .count();

        let recent = stats
            .entries
            .iter()
            .take(RECENT_ENTRIES)
            .map(|e| ReportLine {
                mode: e.mode,
                label: e.label.chars().take(MAX_LABEL_CHARS).collect(),
                stored_at: e.stored_at,
                expired: is_expired(e.stored_at, e.ttl_seconds),
            })
            .collect();

        Self {
            location,
            entry_count: stats.entry_count,
            expired_count,
            total_bytes: stats.total_bytes,
            oldest_stored_at: stats.oldest_stored_at,
            newest_stored_at: stats.newest_stored_at,
            recent,
            generated_at: now,
        }
    }

    /// An empty report, used when statistics could not be collected
    pub fn empty(location: Option<PathBuf>, now: DateTime<Utc>) -> Self {
        Self::from_stats(StoreStats::default(), location, now)
    }

    fn age_of(&self, at: DateTime<Utc>) -> String {
        format!("{} ago", format_age(self.generated_at - at))
    }
}

impl fmt::Display for CacheReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "X/Twitter Cache Stats")?;
        match &self.location {
            Some(path) => writeln!(f, "   Location: {}", path.display())?,
            None => writeln!(f, "   Location: (in memory)")?,
        }
        writeln!(
            f,
            "   Cached entries: {} ({} expired)",
            self.entry_count, self.expired_count
        )?;
        writeln!(
            f,
            "   Total size: {} bytes ({:.1} KB)",
            group_thousands(self.total_bytes),
            self.total_bytes as f64 / 1024.0
        )?;

        if let (Some(oldest), Some(newest)) = (self.oldest_stored_at, self.newest_stored_at) {
            writeln!(
                f,
                "   Oldest entry: {} ({})",
                oldest.format("%Y-%m-%d %H:%M UTC"),
                self.age_of(oldest)
            )?;
            writeln!(
                f,
                "   Newest entry: {} ({})",
                newest.format("%Y-%m-%d %H:%M UTC"),
                self.age_of(newest)
            )?;
        }

        if !self.recent.is_empty() {
            writeln!(f)?;
            writeln!(f, "   Recent entries:")?;
            for line in &self.recent {
                let status = if line.expired { " [expired]" } else { "" };
                writeln!(
                    f,
                    "   [{}] {} ({}){}",
                    line.mode,
                    line.label,
                    self.age_of(line.stored_at),
                    status
                )?;
            }
            if self.entry_count > self.recent.len() {
                writeln!(f, "   ... and {} more", self.entry_count - self.recent.len())?;
            }
        }
        Ok(())
    }
}

/// Formats an age as its two most significant units, e.g. `3h 5m`
pub fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", secs)
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::CacheKey;
    use crate::cache::store::EntrySummary;

    fn summary(label: &str, mode: RequestMode, stored_at: DateTime<Utc>, ttl: u64) -> EntrySummary {
        EntrySummary {
            key: CacheKey::from_raw(label),
            mode,
            label: label.to_string(),
            stored_at,
            ttl_seconds: ttl,
            size: 100,
        }
    }

    #[test]
    fn test_format_age_units() {
        assert_eq!(format_age(Duration::seconds(0)), "0s");
        assert_eq!(format_age(Duration::seconds(45)), "45s");
        assert_eq!(format_age(Duration::seconds(12 * 60 + 5)), "12m");
        assert_eq!(format_age(Duration::seconds(3 * 3600 + 5 * 60)), "3h 5m");
        assert_eq!(format_age(Duration::seconds(2 * 86400 + 4 * 3600)), "2d 4h");
    }

    #[test]
    fn test_format_age_clamps_negative() {
        assert_eq!(format_age(Duration::seconds(-30)), "0s");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_report_counts_expired_entries() {
        let now = Utc::now();
        let stats = StoreStats::from_summaries(vec![
            summary("fresh", RequestMode::Search, now - Duration::minutes(5), 3600),
            summary("stale", RequestMode::User, now - Duration::hours(25), 86400),
        ]);

        let report = CacheReport::from_stats(stats, None, now);

        assert_eq!(report.entry_count, 2);
        assert_eq!(report.expired_count, 1);
        assert_eq!(report.total_bytes, 200);
        assert_eq!(report.recent[0].label, "fresh");
        assert!(!report.recent[0].expired);
        assert!(report.recent[1].expired);
    }

    #[test]
    fn test_report_display_includes_ages() {
        let now = Utc::now();
        let stats = StoreStats::from_summaries(vec![
            summary("openai", RequestMode::Search, now - Duration::minutes(5), 3600),
            summary("elonmusk", RequestMode::User, now - Duration::hours(25), 86400),
        ]);
        let report = CacheReport::from_stats(stats, Some(PathBuf::from("/tmp/xcache")), now);
        let text = report.to_string();

        assert!(text.contains("Location: /tmp/xcache"));
        assert!(text.contains("Cached entries: 2 (1 expired)"));
        assert!(text.contains("Total size: 200 bytes"));
        assert!(text.contains("[search] openai (5m ago)"));
        assert!(text.contains("[user] elonmusk (1d 1h ago) [expired]"));
        assert!(text.contains("Oldest entry:"));
    }

    #[test]
    fn test_report_lists_at_most_ten_entries() {
        let now = Utc::now();
        let summaries = (0..13)
            .map(|i| summary(&format!("q{}", i), RequestMode::Search, now - Duration::minutes(i), 3600))
            .collect();
        let report = CacheReport::from_stats(StoreStats::from_summaries(summaries), None, now);

        assert_eq!(report.recent.len(), 10);
        assert!(report.to_string().contains("... and 3 more"));
    }

    #[test]
    fn test_empty_report() {
        let report = CacheReport::empty(None, Utc::now());
        let text = report.to_string();
        assert_eq!(report.entry_count, 0);
        assert!(text.contains("Cached entries: 0 (0 expired)"));
        assert!(!text.contains("Recent entries"));
    }

    #[test]
    fn test_long_labels_are_truncated() {
        let now = Utc::now();
        let long = "x".repeat(80);
        let stats = StoreStats::from_summaries(vec![summary(&long, RequestMode::Search, now, 3600)]);
        let report = CacheReport::from_stats(stats, None, now);
        assert_eq!(report.recent[0].label.chars().count(), 50);
    }
}
