//! Incremental sentence segmentation of streamed model text.
//!
//! Deltas are appended to a buffer; every complete sentence (text plus its
//! run of terminal punctuation) is split off and returned, the trailing
//! fragment stays buffered until more text arrives. Sentences are returned
//! verbatim, leading whitespace included, so concatenating everything the
//! segmenter ever emitted plus [`pending`](SentenceSegmenter::pending)
//! reproduces the input exactly.

const TERMINATORS: [char; 3] = ['.', '!', '?'];

fn is_terminator(c: char) -> bool {
    TERMINATORS.contains(&c)
}

/// Accumulating sentence splitter.
#[derive(Debug, Default, Clone)]
pub struct SentenceSegmenter {
    buffer: String,
}

impl SentenceSegmenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return every sentence it completed, in order.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);

        let mut sentences = Vec::new();
        let mut start = 0;
        let mut chars = self.buffer.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            if !is_terminator(c) {
                continue;
            }
            // Swallow the whole run ("?!", "...") into this sentence.
            let mut end = idx + c.len_utf8();
            while let Some(&(next_idx, next)) = chars.peek() {
                if !is_terminator(next) {
                    break;
                }
                end = next_idx + next.len_utf8();
                chars.next();
            }
            sentences.push(self.buffer[start..end].to_string());
            start = end;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        sentences
    }

    /// Drop the buffered fragment. Returns how many bytes were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }

    /// The incomplete trailing fragment.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
