/// Split `text` into chunks of at most `max_chars` characters.
///
/// Each chunk ends right before the last whitespace character that fits in
/// the limit; that whitespace character is dropped, so joining the chunks
/// with it restores the text. A run with no whitespace is cut at the limit.
/// Chunks holding only whitespace are skipped since there is nothing to say.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut end_of_limit = rest.len();
        let mut break_at = None;
        for (position, (offset, ch)) in rest.char_indices().enumerate() {
            if position == max_chars {
                end_of_limit = offset;
                if ch.is_whitespace() {
                    break_at = Some((offset, ch.len_utf8()));
                }
                break;
            }
            if position > 0 && ch.is_whitespace() {
                break_at = Some((offset, ch.len_utf8()));
            }
        }

        if end_of_limit == rest.len() {
            push_spoken(&mut chunks, rest);
            break;
        }

        match break_at {
            Some((offset, width)) => {
                push_spoken(&mut chunks, &rest[..offset]);
                rest = &rest[offset + width..];
            }
            None => {
                push_spoken(&mut chunks, &rest[..end_of_limit]);
                rest = &rest[end_of_limit..];
            }
        }
    }

    chunks
}

fn push_spoken(chunks: &mut Vec<String>, chunk: &str) {
    if !chunk.trim().is_empty() {
        chunks.push(chunk.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::split_for_speech;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_for_speech("Paz y bien", 3000), vec!["Paz y bien"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_for_speech("", 3000).is_empty());
    }

    #[test]
    fn long_chapter_breaks_on_whitespace() {
        let text = format!("{}abcde", "abcd ".repeat(1399));
        assert_eq!(text.chars().count(), 7000);

        let chunks = split_for_speech(&text, 3000);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 3000);
            assert!(!chunk.starts_with(' '));
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn unbroken_run_is_cut_at_limit() {
        let chunks = split_for_speech("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn whitespace_exactly_at_limit_is_used() {
        let chunks = split_for_speech("abcd efgh", 4);
        assert_eq!(chunks, vec!["abcd", "efgh"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = split_for_speech("señor señor", 5);
        assert_eq!(chunks, vec!["señor", "señor"]);
    }

    #[test]
    fn whitespace_only_chunks_are_skipped() {
        assert_eq!(split_for_speech("a  b", 1), vec!["a", "b"]);
        assert_eq!(split_for_speech("uno\n\n\ndos", 3), vec!["uno", "dos"]);
        assert!(split_for_speech(" \n\t ", 2).is_empty());
    }
}
