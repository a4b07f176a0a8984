/// Cut `text` at the earliest occurrence of any stop sequence.
///
/// Returns the kept prefix and whether a stop sequence was found.
pub fn truncate_at_stop<'a, S: AsRef<str>>(text: &'a str, stops: &[S]) -> (&'a str, bool) {
    let cut = stops
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s))
        .min();

    match cut {
        Some(idx) => (&text[..idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_stop_keeps_text() {
        let (out, hit) = truncate_at_stop("hello world", &["</s>"]);
        assert_eq!(out, "hello world");
        assert!(!hit);
    }

    #[test]
    fn earliest_stop_wins() {
        let text = "answer<|im_end|>junk</s>more";
        let (out, hit) = truncate_at_stop(text, &["</s>", "<|im_end|>"]);
        assert_eq!(out, "answer");
        assert!(hit);
    }

    #[test]
    fn empty_stop_is_ignored() {
        let (out, hit) = truncate_at_stop("abc", &["", "zz"]);
        assert_eq!(out, "abc");
        assert!(!hit);
    }

    #[test]
    fn stop_at_start_yields_empty() {
        let stops = vec!["<|endoftext|>".to_string()];
        let (out, hit) = truncate_at_stop("<|endoftext|>tail", &stops);
        assert_eq!(out, "");
        assert!(hit);
    }
}
