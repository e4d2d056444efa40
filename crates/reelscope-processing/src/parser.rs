//! Structured-field extraction from free-form analysis text.
//!
//! The analysis text is written by a generative model, so nothing about its
//! layout is guaranteed. Each field is looked up with an ordered list of
//! patterns, most specific first. The first pattern producing an in-range
//! value wins; a pattern whose matches are all out of range is skipped. A
//! field that no pattern yields is simply absent.

use anyhow::Context;
use regex::{Captures, Regex};
use reelscope_core::{Config, StructuredView};

const MAX_VIRAL_SCORE: f32 = 10.0;

struct TimestampPattern {
    name: &'static str,
    regex: Regex,
}

impl TimestampPattern {
    fn new(name: &'static str, pattern: &str) -> anyhow::Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Failed to compile {} timestamp pattern", name))?;
        Ok(Self { name, regex })
    }
}

/// Reads either a `secs` group or a `min`/`sec` clock pair.
fn seconds_from(caps: &Captures<'_>) -> Option<u32> {
    if let Some(secs) = caps.name("secs") {
        return secs.as_str().parse().ok();
    }
    let min: u32 = caps.name("min")?.as_str().parse().ok()?;
    let sec: u32 = caps.name("sec")?.as_str().parse().ok()?;
    if sec >= 60 {
        return None;
    }
    Some(min * 60 + sec)
}

/// Best-effort parser for the fields the analysis prompt asks for.
pub struct ResultParser {
    min_secs: u32,
    max_secs: u32,
    risk_keywords: Vec<String>,
    timestamp_patterns: Vec<TimestampPattern>,
    viral_score: Regex,
    risk_level: Regex,
}

impl ResultParser {
    pub fn new(min_secs: u32, max_secs: u32, risk_keywords: Vec<String>) -> anyhow::Result<Self> {
        let timestamp_patterns = vec![
            TimestampPattern::new(
                "labelled",
                r"(?i)\b(?:capa|cover|thumbnail)\b[*\s]*[:=\-][*\s]*(?:(?P<min>\d{1,2}):(?P<sec>\d{2})|(?P<secs>\d+))",
            )?,
            TimestampPattern::new(
                "ordinal",
                r"(?i)\b(?P<secs>\d+)(?:st|nd|rd|th)\s+second\b",
            )?,
            TimestampPattern::new("ordinal_pt", r"(?i)\bno\s+segundo\s+(?P<secs>\d+)")?,
            TimestampPattern::new(
                "seconds",
                r"(?i)\b(?P<secs>\d+)\s*(?:seconds?|segundos?)\b",
            )?,
            TimestampPattern::new("clock", r"\b(?P<min>\d{1,2}):(?P<sec>\d{2})\b")?,
        ];

        let viral_score = Regex::new(
            r"(?i)\b(?:potencial\s+viral|viral\s+potential|viral\s+score)\b[*\s]*[:=\-][*\s]*(?P<score>\d+(?:[.,]\d+)?)",
        )
        .context("Failed to compile viral score pattern")?;

        let risk_level = Regex::new(
            r"(?i)\b(?:risco|risk(?:\s+level)?)\b[*\s]*[:=\-][*\s]*(?P<level>\p{L}+)",
        )
        .context("Failed to compile risk level pattern")?;

        Ok(Self {
            min_secs,
            max_secs,
            risk_keywords: risk_keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
            timestamp_patterns,
            viral_score,
            risk_level,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (min_secs, max_secs) = config.timestamp_range();
        Self::new(min_secs, max_secs, config.risk_keywords().to_vec())
    }

    /// Second suggested as cover frame, if any pattern yields a valid one.
    pub fn extract_timestamp(&self, text: &str) -> Option<u32> {
        for pattern in &self.timestamp_patterns {
            let mut discarded = 0usize;
            for caps in pattern.regex.captures_iter(text) {
                match seconds_from(&caps) {
                    Some(secs) if (self.min_secs..=self.max_secs).contains(&secs) => {
                        tracing::debug!(pattern = pattern.name, seconds = secs, "Timestamp extracted");
                        return Some(secs);
                    }
                    _ => discarded += 1,
                }
            }
            if discarded > 0 {
                tracing::debug!(
                    pattern = pattern.name,
                    discarded,
                    "Timestamp matches out of range, trying next pattern"
                );
            }
        }
        None
    }

    /// Viral potential on a 0-10 scale.
    pub fn extract_viral_score(&self, text: &str) -> Option<f32> {
        self.viral_score.captures_iter(text).find_map(|caps| {
            let score: f32 = caps["score"].replace(',', ".").parse().ok()?;
            (0.0..=MAX_VIRAL_SCORE).contains(&score).then_some(score)
        })
    }

    /// Risk label, only when it belongs to the configured vocabulary.
    pub fn extract_risk_level(&self, text: &str) -> Option<String> {
        self.risk_level.captures_iter(text).find_map(|caps| {
            let level = caps["level"].to_lowercase();
            self.risk_keywords.contains(&level).then_some(level)
        })
    }

    pub fn parse(&self, text: &str) -> StructuredView {
        StructuredView {
            cover_second: self.extract_timestamp(text),
            viral_score: self.extract_viral_score(text),
            risk_level: self.extract_risk_level(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ResultParser {
        ResultParser::new(
            1,
            300,
            vec!["low".to_string(), "medium".to_string(), "high".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_labelled_marker() {
        assert_eq!(parser().extract_timestamp("Resumo...\nCAPA: 42\n"), Some(42));
    }

    #[test]
    fn test_labelled_marker_with_markdown_and_clock() {
        assert_eq!(parser().extract_timestamp("**Capa**: 01:05"), Some(65));
        assert_eq!(parser().extract_timestamp("Cover - 7s"), Some(7));
    }

    #[test]
    fn test_out_of_range_marker_yields_absent() {
        assert_eq!(parser().extract_timestamp("CAPA: 999"), None);
    }

    #[test]
    fn test_out_of_range_marker_falls_through() {
        let text = "CAPA: 999\nThe product appears at 12 seconds.";
        assert_eq!(parser().extract_timestamp(text), Some(12));
    }

    #[test]
    fn test_labelled_marker_wins_over_looser_phrasing() {
        let text = "At 30 seconds the hook lands.\nCAPA: 8";
        assert_eq!(parser().extract_timestamp(text), Some(8));
    }

    #[test]
    fn test_ordinal_phrasing() {
        assert_eq!(
            parser().extract_timestamp("Best frame is the 15th second of the clip"),
            Some(15)
        );
        assert_eq!(
            parser().extract_timestamp("O melhor momento está no segundo 23."),
            Some(23)
        );
    }

    #[test]
    fn test_bare_clock() {
        assert_eq!(parser().extract_timestamp("Peak moment (00:15)"), Some(15));
        assert_eq!(parser().extract_timestamp("Peak moment 00:75"), None);
    }

    #[test]
    fn test_zero_is_below_range() {
        assert_eq!(parser().extract_timestamp("CAPA: 0"), None);
    }

    #[test]
    fn test_no_marker_is_absent() {
        assert_eq!(parser().extract_timestamp("A great product video."), None);
    }

    #[test]
    fn test_viral_score() {
        let p = parser();
        assert_eq!(p.extract_viral_score("POTENCIAL VIRAL: 8/10"), Some(8.0));
        assert_eq!(p.extract_viral_score("**Viral potential**: 7,5"), Some(7.5));
        assert_eq!(p.extract_viral_score("Viral score: 42"), None);
        assert_eq!(p.extract_viral_score("6. VIRAL POTENTIAL: from 0 to 10"), None);
    }

    #[test]
    fn test_risk_level_uses_configured_keywords() {
        let p = parser();
        assert_eq!(p.extract_risk_level("RISCO: High"), Some("high".to_string()));
        assert_eq!(p.extract_risk_level("RISCO: alto"), None);

        let pt = ResultParser::new(1, 300, vec!["baixo".into(), "alto".into()]).unwrap();
        assert_eq!(pt.extract_risk_level("Risco: ALTO"), Some("alto".to_string()));
    }

    #[test]
    fn test_parse_full_view() {
        let text = "Analysis body.\nCAPA: 12\nPOTENCIAL VIRAL: 9/10\nRISCO: low";
        let view = parser().parse(text);
        assert_eq!(view.cover_second, Some(12));
        assert_eq!(view.viral_score, Some(9.0));
        assert_eq!(view.risk_level.as_deref(), Some("low"));
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parser().parse("").is_empty());
    }
}
