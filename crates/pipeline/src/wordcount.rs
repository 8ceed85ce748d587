//! The word-count dataflow over a finite list of lines.

use std::collections::{BTreeMap, HashMap};

use common::WordCount;
use futures_core::Stream;
use futures_util::{StreamExt, future, stream};

/// The fixed input lines of the job.
pub const SENTENCES: [&str; 6] = [
    "the quick brown fox",
    "jumped over",
    "the lazy dog",
    "foxes are just",
    "lazier than dogs",
    "or at least our dog",
];

/// Lowercases a line and splits it on every ASCII whitespace character
/// (space, tab, newline, vertical tab, form feed, carriage return).
///
/// Adjacent separators leave empty tokens behind; they are dropped because
/// the word is the table's primary key. Non-ASCII spaces such as U+00A0 stay
/// inside the word.
pub fn tokenize(line: &str) -> Vec<String> {
    line.to_lowercase()
        .split(is_separator)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Builds the word-count stream.
///
/// Every token yields the running total for its word, so the last pair
/// emitted for a word carries its final count and the counts seen for any
/// one word never decrease. Nothing is computed until the stream is polled.
pub fn word_counts<I>(lines: I) -> impl Stream<Item = WordCount> + Send
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    I::IntoIter: Send,
{
    let tokens = stream::iter(lines.into_iter().map(|line| tokenize(line.as_ref())))
        .flat_map(stream::iter)
        .map(|word: String| WordCount::single(word));

    keyed_sum(tokens)
}

/// Groups pairs by word and keeps a running sum of their counts.
fn keyed_sum<S>(pairs: S) -> impl Stream<Item = WordCount> + Send
where
    S: Stream<Item = WordCount> + Send,
{
    pairs.scan(HashMap::<String, i64>::new(), |totals, pair| {
        let total = totals.entry(pair.word.clone()).or_insert(0);
        *total += pair.count;
        future::ready(Some(WordCount::new(pair.word, *total)))
    })
}

/// Final count per word, computed in a single pass.
pub fn final_counts<I>(lines: I) -> BTreeMap<String, i64>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    lines
        .into_iter()
        .flat_map(|line| tokenize(line.as_ref()))
        .fold(BTreeMap::new(), |mut totals, word| {
            *totals.entry(word).or_insert(0) += 1;
            totals
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(lines: &[&str]) -> Vec<WordCount> {
        word_counts(lines.iter().copied()).collect().await
    }

    #[test]
    fn tokenize_lowercases_and_splits() {
        assert_eq!(tokenize("The Quick  brown\tFOX"), vec!["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn tokenize_drops_empty_tokens() {
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
        assert_eq!(tokenize("  jumped   over  "), vec!["jumped", "over"]);
        assert_eq!(tokenize("a\r\n\x0Bb\x0Cc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn tokenize_keeps_non_ascii_spaces_inside_words() {
        assert_eq!(tokenize("lazy\u{a0}dog fox"), vec!["lazy\u{a0}dog", "fox"]);
    }

    #[test]
    fn tokens_are_stable_under_relowering() {
        for line in SENTENCES {
            for token in tokenize(line) {
                assert_eq!(token.to_lowercase(), token);
            }
        }
    }

    #[test]
    fn final_counts_for_fixed_input() {
        let counts = final_counts(SENTENCES);

        assert_eq!(counts["the"], 2);
        assert_eq!(counts["dog"], 2);
        for word in ["quick", "brown", "fox", "jumped", "over", "foxes", "dogs"] {
            assert_eq!(counts[word], 1, "{word}");
        }
        assert_eq!(counts.values().sum::<i64>(), 20);
    }

    #[tokio::test]
    async fn stream_emits_running_totals() {
        let pairs = collect(&["the dog", "The cat", "THE dog"]).await;

        assert_eq!(
            pairs,
            vec![
                WordCount::new("the", 1),
                WordCount::new("dog", 1),
                WordCount::new("the", 2),
                WordCount::new("cat", 1),
                WordCount::new("the", 3),
                WordCount::new("dog", 2),
            ]
        );
    }

    #[tokio::test]
    async fn last_emitted_pair_matches_final_count() {
        let pairs = collect(&SENTENCES).await;

        let mut last = BTreeMap::new();
        for pair in pairs {
            last.insert(pair.word, pair.count);
        }
        assert_eq!(last, final_counts(SENTENCES));
    }

    #[tokio::test]
    async fn counts_per_word_never_decrease() {
        let pairs = collect(&SENTENCES).await;

        let mut seen = HashMap::new();
        for pair in pairs {
            let previous = seen.insert(pair.word.clone(), pair.count).unwrap_or(0);
            assert!(pair.count > previous, "{pair}");
        }
    }

    #[tokio::test]
    async fn empty_input_emits_nothing() {
        assert!(collect(&[]).await.is_empty());
        assert!(collect(&["", "   "]).await.is_empty());
    }
}
