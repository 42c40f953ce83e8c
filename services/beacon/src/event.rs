//! Access events and the batches they are flushed in

use chrono::{DateTime, Utc};

/// Display limit for user agents and question text
pub const MAX_FIELD_CHARS: usize = 100;

/// Number of most recent questions quoted in a batch summary
pub const RECENT_QUERIES: usize = 5;

const ELLIPSIS: &str = "...";

/// Truncate to `max_chars` characters, marking the cut with a trailing ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Truncate so the result, marker included, fits a provider's length cap.
///
/// Length is measured in UTF-16 code units, which is what the chat providers count,
/// so an emoji uses two units.
pub fn fit_to_limit(text: &str, limit: usize) -> String {
    if text.encode_utf16().count() <= limit {
        return text.to_string();
    }
    let budget = limit.saturating_sub(ELLIPSIS.len());
    let mut used = 0;
    let mut kept = String::new();
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        kept.push(c);
    }
    format!("{}{}", kept, ELLIPSIS)
}

/// Resolve the client address: first hop of `X-Forwarded-For`, else the peer.
pub fn client_ip(forwarded_for: Option<&str>, peer: Option<&str>) -> String {
    forwarded_for
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .or(peer)
        .unwrap_or("unknown")
        .to_string()
}

/// A single "someone used the service" event
#[derive(Debug, Clone, PartialEq)]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub source_ip: String,
    pub user_agent: String,
    pub summary_text: String,
}

impl AccessEvent {
    pub fn new(
        source_ip: impl Into<String>,
        user_agent: &str,
        summary_text: &str,
    ) -> Self {
        Self::at(Utc::now(), source_ip, user_agent, summary_text)
    }

    pub fn at(
        timestamp: DateTime<Utc>,
        source_ip: impl Into<String>,
        user_agent: &str,
        summary_text: &str,
    ) -> Self {
        Self {
            timestamp,
            source_ip: source_ip.into(),
            user_agent: user_agent.chars().take(MAX_FIELD_CHARS).collect(),
            summary_text: truncate(summary_text.trim(), MAX_FIELD_CHARS),
        }
    }
}

/// Events drained from the buffer in one flush
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationBatch {
    pub events: Vec<AccessEvent>,
    pub count: usize,
    pub generated_at: DateTime<Utc>,
}

impl NotificationBatch {
    pub fn new(events: Vec<AccessEvent>, generated_at: DateTime<Utc>) -> Self {
        Self {
            count: events.len(),
            events,
            generated_at,
        }
    }

    /// Request counts per source IP, busiest first
    pub fn counts_by_ip(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for event in &self.events {
            let existing = counts.iter().position(|(ip, _)| *ip == event.source_ip);
            match existing {
                Some(i) => counts[i].1 += 1,
                None => counts.push((event.source_ip.as_str(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
    }

    /// The last few questions, in arrival order
    pub fn recent_queries(&self) -> &[AccessEvent] {
        let start = self.events.len().saturating_sub(RECENT_QUERIES);
        &self.events[start..]
    }

    /// Render the batch as the aggregated summary text sent to channels
    pub fn summary(&self) -> String {
        self.render(str::to_string)
    }

    /// Render the summary, passing client-supplied text (IPs and questions) through `escape`
    pub fn render<F>(&self, escape: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let mut lines = vec![
            "📊 **API usage summary**".to_string(),
            format!(
                "{} request{} as of {}",
                self.count,
                if self.count == 1 { "" } else { "s" },
                self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            String::new(),
            "**By IP:**".to_string(),
        ];
        lines.extend(
            self.counts_by_ip()
                .into_iter()
                .map(|(ip, n)| format!("• {}: {}", escape(ip), n)),
        );

        lines.push(String::new());
        lines.push("**Recent queries:**".to_string());
        lines.extend(
            self.recent_queries()
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{}. {}", i + 1, escape(&e.summary_text))),
        );
        lines.join("\n")
    }
}
