//! Sentence-bounded chunking of extracted document text.
//!
//! Each chunk becomes one LLM request, so chunks stay under a character
//! budget and never cut a sentence in half unless the sentence alone is over
//! budget.

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split text into sentences ending in one or more of `.`, `!`, `?`.
///
/// Slices keep their leading whitespace so that concatenating them restores
/// the original spacing. A trailing fragment with no terminator is kept as
/// the last sentence; terminator runs with no content are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut has_body = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if is_terminator(c) {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if !is_terminator(next) {
                    break;
                }
                end = j + next.len_utf8();
                chars.next();
            }
            if has_body {
                sentences.push(&text[start..end]);
            }
            start = end;
            has_body = false;
        } else if !c.is_whitespace() {
            has_body = true;
        }
    }

    if has_body {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Group sentences into chunks of at most `max_chars` characters.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();

        if len > max_chars {
            flush(&mut chunks, &mut current);
            current_len = 0;
            chunks.extend(split_oversized(sentence, max_chars));
            continue;
        }

        if current_len + len > max_chars {
            flush(&mut chunks, &mut current);
            current_len = 0;
        }
        current.push_str(sentence);
        current_len += len;
    }

    flush(&mut chunks, &mut current);
    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

/// Break a single over-long sentence on whitespace; words longer than the
/// budget are cut at character boundaries.
fn split_oversized(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_len = 0usize;

    for word in sentence.split_whitespace() {
        for part in hard_split(word, max_chars) {
            let part_len = part.chars().count();
            let sep = usize::from(piece_len > 0);
            if piece_len + sep + part_len > max_chars {
                pieces.push(std::mem::take(&mut piece));
                piece_len = 0;
            }
            if piece_len > 0 {
                piece.push(' ');
                piece_len += 1;
            }
            piece.push_str(&part);
            piece_len += part_len;
        }
    }

    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

fn hard_split(word: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect::<String>())
        .collect()
}
