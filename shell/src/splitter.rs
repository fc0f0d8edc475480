/// Sequence separator.
pub const SEQUENCE: char = ';';
/// Pipeline separator.
pub const PIPE: char = '|';

/// Splits `text` on every `separator` that is outside a double-quoted span.
///
/// Segments are trimmed and empty ones are dropped, so `a;;b;` yields `["a", "b"]`.
/// Quotes are kept in the output; only the tokenizer strips them. A backslash
/// protects the next character from both quote toggling and splitting.
pub fn split(text: &str, separator: char) -> Vec<String> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            c if c == separator && !quoted => {
                push_trimmed(&mut segments, &text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    push_trimmed(&mut segments, &text[start..]);
    segments
}

fn push_trimmed(segments: &mut Vec<String>, segment: &str) {
    let segment = segment.trim_matches(|c: char| c.is_ascii_whitespace());
    if !segment.is_empty() {
        segments.push(segment.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims() {
        assert_eq!(
            split(" ls -l ;  pwd\t; echo hi ", SEQUENCE),
            vec!["ls -l", "pwd", "echo hi"]
        );
    }

    #[test]
    fn drops_empty_segments() {
        assert_eq!(split(";; a ;; b ; ;", SEQUENCE), vec!["a", "b"]);
        assert!(split("  ", SEQUENCE).is_empty());
        assert!(split("|", PIPE).is_empty());
    }

    #[test]
    fn quoted_separator_does_not_split() {
        assert_eq!(
            split(r#"echo "a;b" ; echo c"#, SEQUENCE),
            vec![r#"echo "a;b""#, "echo c"]
        );
        assert_eq!(
            split(r#"echo "x | y" | cat"#, PIPE),
            vec![r#"echo "x | y""#, "cat"]
        );
    }

    #[test]
    fn escaped_quote_does_not_toggle() {
        assert_eq!(
            split(r#"echo \"a;b"#, SEQUENCE),
            vec![r#"echo \"a"#, "b"]
        );
    }

    #[test]
    fn escaped_separator_does_not_split() {
        assert_eq!(split(r"echo a\;b", SEQUENCE), vec![r"echo a\;b"]);
    }

    #[test]
    fn sequence_then_pipe() {
        let line = r#"echo "1|2" | cat ; ls | wc -l"#;
        let nested: Vec<Vec<String>> = split(line, SEQUENCE)
            .iter()
            .map(|seq| split(seq, PIPE))
            .collect();
        assert_eq!(
            nested,
            vec![
                vec![r#"echo "1|2""#.to_string(), "cat".to_string()],
                vec!["ls".to_string(), "wc -l".to_string()],
            ]
        );
    }

    #[test]
    fn rejoining_reproduces_stages() {
        let line = "a b | c ; d | e | f";
        let rejoined = split(line, SEQUENCE)
            .iter()
            .map(|seq| split(seq, PIPE).join(" | "))
            .collect::<Vec<_>>()
            .join(" ; ");
        assert_eq!(rejoined, line);
    }
}
