//! Transcript cleaning and sentence-aware chunking.
//!
//! [`clean_transcript`] strips caption furniture (cue timings, sequence
//! numbers, the `WEBVTT` header) so only spoken text reaches the chunker.
//! [`SentenceChunker`] splits the cleaned text into overlapping windows,
//! preferring to break at the last sentence terminator or newline inside
//! each window.

use std::sync::LazyLock;

use regex::Regex;

/// SRT/VTT cue timing ranges, e.g. `00:01:02,345 --> 00:01:05,678`.
static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}:\d{2}:\d{2}[,.]\d{3}\s*-->\s*\d{2}:\d{2}:\d{2}[,.]\d{3}")
        .expect("valid cue timing pattern")
});

/// Standalone cue sequence numbers on their own line.
static SEQUENCE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\s*$").expect("valid sequence number pattern"));

/// The `WEBVTT` file header.
static VTT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^WEBVTT\s*").expect("valid header pattern"));

/// Runs of three or more newlines.
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-run pattern"));

/// Strip caption markup from a raw transcript.
///
/// Removes SRT and VTT cue timing ranges, standalone sequence numbers, the
/// `WEBVTT` header, and collapses runs of blank lines, then trims.
pub fn clean_transcript(text: &str) -> String {
    let text = CUE_TIMING.replace_all(text, "");
    let text = SEQUENCE_NUMBER.replace_all(&text, "");
    let text = VTT_HEADER.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Splits text into overlapping chunks, breaking at sentence boundaries
/// where possible.
///
/// Scans forward in windows of `chunk_size` characters. A window that does
/// not reach the end of the text is truncated at the last `". "` or newline
/// inside it, provided that boundary lies past the window's midpoint (so a
/// pathological boundary near the start never produces a sliver). The next
/// window starts `chunk_overlap` characters before the previous one ended.
///
/// Indices are character positions, so multi-byte text never splits inside
/// a code point.
///
/// # Example
///
/// ```rust,ignore
/// use quill_rag::SentenceChunker;
///
/// let chunker = SentenceChunker::new(1000, 200);
/// let chunks = chunker.chunk(&cleaned);
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — characters shared between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Split `text` into chunks.
    ///
    /// Returns an empty `Vec` for empty or whitespace-only input, and a
    /// single chunk when the trimmed text fits in one window. No returned
    /// chunk is empty after trimming.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            // The logical window end may run past the text; slicing clamps it.
            let mut end = start + self.chunk_size;

            if end < chars.len() {
                let window = &chars[start..end];
                if let Some(break_point) = last_boundary(window) {
                    if break_point > self.chunk_size / 2 {
                        end = start + break_point + 1;
                    }
                }
            }

            let chunk: String = chars[start..end.min(chars.len())].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            // Advance with overlap; if the truncated window was no longer
            // than the overlap, jump to the window end instead of looping.
            let next = end.saturating_sub(self.chunk_overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }
}

/// Position of the last sentence terminator (`". "`) or newline in `window`.
fn last_boundary(window: &[char]) -> Option<usize> {
    let last_period = (0..window.len().saturating_sub(1))
        .rev()
        .find(|&i| window[i] == '.' && window[i + 1] == ' ');
    let last_newline = window.iter().rposition(|&c| c == '\n');

    match (last_period, last_newline) {
        (Some(p), Some(n)) => Some(p.max(n)),
        (Some(p), None) => Some(p),
        (None, Some(n)) => Some(n),
        (None, None) => None,
    }
}
