//! Extractive resume summaries.

use std::collections::HashMap;

use crate::ranking::text::{sentences, tokenize};

/// Picks the `max_sentences` most representative sentences of `text`, in their
/// original order.
///
/// A sentence scores the mean in-document frequency of its terms, so sentences
/// built from words the document keeps repeating win. Sentences without terms
/// score zero; ties keep the earlier sentence.
pub fn summarize(text: &str, max_sentences: usize) -> String {
    let all = sentences(text);
    if max_sentences == 0 || all.is_empty() {
        return String::new();
    }
    if all.len() <= max_sentences {
        return all.join(" ");
    }

    let tokenized: Vec<Vec<String>> = all.iter().map(|s| tokenize(s)).collect();

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for tokens in &tokenized {
        for token in tokens {
            *frequency.entry(token.as_str()).or_insert(0) += 1;
        }
    }

    let mut scored: Vec<(usize, f64)> = tokenized
        .iter()
        .enumerate()
        .map(|(i, tokens)| {
            if tokens.is_empty() {
                return (i, 0.0);
            }
            let total: usize = tokens.iter().map(|t| frequency[t.as_str()]).sum();
            (i, total as f64 / tokens.len() as f64)
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut chosen: Vec<usize> = scored.iter().take(max_sentences).map(|(i, _)| *i).collect();
    chosen.sort_unstable();

    chosen
        .into_iter()
        .map(|i| all[i].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe. Rust engineer building distributed systems. \
        Maintained Rust services in production. Enjoys hiking. \
        Designed distributed Rust storage systems.";

    #[test]
    fn test_short_text_returned_whole() {
        assert_eq!(summarize("One line. Two lines.", 3), "One line. Two lines.");
    }

    #[test]
    fn test_picks_representative_sentences_in_order() {
        let summary = summarize(RESUME, 2);
        assert_eq!(
            summary,
            "Rust engineer building distributed systems. Designed distributed Rust storage systems."
        );
    }

    #[test]
    fn test_zero_sentences_is_empty() {
        assert_eq!(summarize(RESUME, 0), "");
        assert_eq!(summarize("", 3), "");
    }

    #[test]
    fn test_respects_limit() {
        let summary = summarize(RESUME, 3);
        assert_eq!(sentences(&summary).len(), 3);
    }
}
