//! Expression timestamp alignment
//!
//! Resolves an approximate subtitle window into word-accurate bounds by
//! sliding the expression over transcript words near the window and keeping
//! the most similar span. Spans scoring below the confidence floor are
//! discarded and the approximate window is used as-is.

use tracing::{debug, info};

use crate::domain::config::AlignmentSettings;
use crate::domain::model::{AlignmentCandidate, AlignmentSource, ExpressionWindow, WordTimestamp};

pub mod text;

/// Confidence reported for unverified subtitle windows
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

pub struct TimestampAligner {
    settings: AlignmentSettings,
}

impl TimestampAligner {
    pub fn new(settings: AlignmentSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AlignmentSettings {
        &self.settings
    }

    /// Resolve the window for `expression`, buffers included.
    ///
    /// Never fails: a missing transcript or a weak match yields the
    /// approximate window tagged `SubtitleFallback`.
    pub fn align(
        &self,
        expression: &str,
        approx_start: f64,
        approx_end: f64,
        transcript: Option<&[WordTimestamp]>,
    ) -> ExpressionWindow {
        let approx_end = approx_end.max(approx_start);

        let best = transcript
            .and_then(|words| self.best_candidate(expression, approx_start, approx_end, words));

        match best {
            Some(candidate) if candidate.score >= self.settings.threshold => {
                let start = candidate.start_seconds().unwrap_or(approx_start);
                let end = candidate.end_seconds().unwrap_or(approx_end).max(start);
                debug!(
                    expression,
                    score = candidate.score,
                    start,
                    end,
                    "Aligned expression to transcript"
                );
                self.window(start, end, candidate.score, AlignmentSource::Transcript)
            }
            other => {
                match other {
                    Some(candidate) => info!(
                        expression,
                        score = candidate.score,
                        threshold = self.settings.threshold,
                        "Low-confidence alignment, using subtitle window"
                    ),
                    None => info!(expression, "No transcript match, using subtitle window"),
                }
                self.fallback_window(approx_start, approx_end)
            }
        }
    }

    /// The approximate window as-is, tagged unverified
    pub fn fallback_window(&self, approx_start: f64, approx_end: f64) -> ExpressionWindow {
        self.window(
            approx_start,
            approx_end.max(approx_start),
            FALLBACK_CONFIDENCE,
            AlignmentSource::SubtitleFallback,
        )
    }

    /// Highest-scoring contiguous span inside the search window.
    ///
    /// Transcript words are expanded into their normalized tokens and spans
    /// have as many tokens as the expression, so "well-known" counts as two.
    /// On equal scores the earliest span wins. `None` when too few tokens
    /// fall inside the window.
    pub fn best_candidate(
        &self,
        expression: &str,
        approx_start: f64,
        approx_end: f64,
        words: &[WordTimestamp],
    ) -> Option<AlignmentCandidate> {
        let target = text::tokens(expression);
        if target.is_empty() {
            return None;
        }
        let span_len = target.len();
        let target = target.join(" ");

        let lo = approx_start - self.settings.search_margin_secs;
        let hi = approx_end + self.settings.search_margin_secs;

        // (index of the source word, token)
        let tokens: Vec<(usize, String)> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| w.start_seconds >= lo && w.end_seconds <= hi)
            .flat_map(|(index, w)| text::tokens(&w.text).into_iter().map(move |t| (index, t)))
            .collect();

        if tokens.len() < span_len {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (offset, span) in tokens.windows(span_len).enumerate() {
            let joined = span
                .iter()
                .map(|(_, token)| token.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let score = text::similarity(&target, &joined);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((offset, score));
            }
        }

        best.map(|(offset, score)| {
            let first = tokens[offset].0;
            let last = tokens[offset + span_len - 1].0;
            AlignmentCandidate {
                words: words[first..=last].to_vec(),
                score,
                source: AlignmentSource::Transcript,
            }
        })
    }

    fn window(&self, start: f64, end: f64, confidence: f64, source: AlignmentSource) -> ExpressionWindow {
        ExpressionWindow {
            start_seconds: start,
            end_seconds: end,
            buffer_start: self.settings.buffer_start_secs,
            buffer_end: self.settings.buffer_end_secs,
            confidence,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(text: &str, start: f64, step: f64) -> Vec<WordTimestamp> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, word)| {
                let s = start + i as f64 * step;
                WordTimestamp::new(word, s, s + step * 0.8)
            })
            .collect()
    }

    fn aligner() -> TimestampAligner {
        TimestampAligner::new(AlignmentSettings::default())
    }

    #[test]
    fn test_exact_match_uses_transcript_bounds() {
        let words = transcript("so we had to break a leg tonight folks", 100.0, 0.5);
        let window = aligner().align("Break a leg!", 101.0, 103.0, Some(&words));

        assert_eq!(window.source, AlignmentSource::Transcript);
        assert!(window.confidence >= 0.85);
        assert_eq!(window.start_seconds, 102.0);
        assert_eq!(window.end_seconds, 103.0 + 0.4);
        assert_eq!(window.buffer_start, 0.2);
        assert!((window.padded_start() - 101.8).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_words_fall_back_to_approximate_window() {
        let words = transcript("the weather is lovely today in the park", 10.0, 0.5);
        let window = aligner().align("gonna get screwed", 11.0, 12.5, Some(&words));

        assert_eq!(window.source, AlignmentSource::SubtitleFallback);
        assert_eq!(window.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(window.start_seconds, 11.0);
        assert_eq!(window.end_seconds, 12.5);
    }

    #[test]
    fn test_multi_token_words_align_to_whole_word_bounds() {
        let words = vec![
            WordTimestamp::new("It's", 9.6, 9.9),
            WordTimestamp::new("a", 10.0, 10.1),
            WordTimestamp::new("well-known", 10.2, 10.8),
            WordTimestamp::new("fact.", 10.9, 11.4),
        ];
        let window = aligner().align("a well-known fact", 10.0, 11.5, Some(&words));

        assert_eq!(window.source, AlignmentSource::Transcript);
        assert!(window.confidence >= 0.85);
        assert_eq!(window.start_seconds, 10.0);
        assert_eq!(window.end_seconds, 11.4);
    }

    #[test]
    fn test_token_span_inside_one_word_keeps_that_word() {
        let words = transcript("meet at 9:30 sharp", 0.0, 1.0);
        let candidate = aligner().best_candidate("9 30", 0.0, 4.0, &words).unwrap();
        assert_eq!(candidate.score, 1.0);
        assert_eq!(candidate.words.len(), 1);
        assert_eq!(candidate.start_seconds(), Some(2.0));
    }

    #[test]
    fn test_words_outside_search_margin_are_ignored() {
        let words = transcript("break a leg", 500.0, 0.5);
        let window = aligner().align("break a leg", 10.0, 12.0, Some(&words));
        assert_eq!(window.source, AlignmentSource::SubtitleFallback);
    }

    #[test]
    fn test_ties_keep_first_span() {
        let words = transcript("hold on hold on", 0.0, 1.0);
        let candidate = aligner().best_candidate("hold on", 0.0, 4.0, &words).unwrap();
        assert_eq!(candidate.score, 1.0);
        assert_eq!(candidate.start_seconds(), Some(0.0));
    }

    #[test]
    fn test_missing_transcript_and_reversed_window() {
        let window = aligner().align("anything", 5.0, 4.0, None);
        assert_eq!(window.source, AlignmentSource::SubtitleFallback);
        assert_eq!(window.end_seconds, 5.0);
    }

    #[test]
    fn test_padded_start_never_negative() {
        let words = transcript("hi there", 0.0, 0.5);
        let window = aligner().align("hi there", 0.0, 1.0, Some(&words));
        assert_eq!(window.padded_start(), 0.0);
    }
}
