//! Text preprocessing for keyword matching: lowercase, tokenize, drop punctuation and stopwords.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Standard English stopword list (NLTK corpus, 179 entries).
const STOPWORDS_EN: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS_EN.iter().copied().collect());

/// Clitics split off the end of a word, Treebank style ("don't" -> "do" + "n't").
const CLITIC_SUFFIXES: &[&str] = &["'ll", "'re", "'ve", "'s", "'m", "'d"];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Splits `text` into word and punctuation tokens.
///
/// Words are runs of alphanumerics, underscores, apostrophes and hyphens; a `.` between
/// two alphanumerics stays inside the word (`3.5`, `example.com`). Every other non-space
/// character is its own token. Contractions are split into stem and clitic.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        let ch = if ch == '\u{2019}' { '\'' } else { ch };
        if ch.is_alphanumeric() || matches!(ch, '\'' | '-' | '_') {
            word.push(ch);
            continue;
        }
        if ch == '.'
            && word.chars().last().is_some_and(char::is_alphanumeric)
            && chars.peek().is_some_and(|c| c.is_alphanumeric())
        {
            word.push(ch);
            continue;
        }
        flush_word(&mut word, &mut tokens);
        if !ch.is_whitespace() {
            tokens.push(ch.to_string());
        }
    }
    flush_word(&mut word, &mut tokens);
    tokens
}

fn flush_word(word: &mut String, tokens: &mut Vec<String>) {
    if word.is_empty() {
        return;
    }
    let raw = std::mem::take(word);
    let is_edge = |c: char| c == '\'' || c == '-';

    let core = raw.trim_matches(is_edge);
    let leading = &raw[..raw.len() - raw.trim_start_matches(is_edge).len()];
    let trailing = &raw[raw.trim_end_matches(is_edge).len()..];

    tokens.extend(leading.chars().map(String::from));
    if !core.is_empty() {
        split_contraction(core, tokens);
    }
    // a word made only of quotes/hyphens has already been emitted as `leading`
    if !core.is_empty() {
        tokens.extend(trailing.chars().map(String::from));
    }
}

fn split_contraction(word: &str, tokens: &mut Vec<String>) {
    let lower = word.to_ascii_lowercase();
    if lower.ends_with("n't") && word.len() > 3 {
        let cut = word.len() - 3;
        tokens.push(word[..cut].to_string());
        tokens.push(word[cut..].to_string());
        return;
    }
    for suffix in CLITIC_SUFFIXES {
        if lower.ends_with(suffix) && word.len() > suffix.len() {
            let cut = word.len() - suffix.len();
            tokens.push(word[..cut].to_string());
            tokens.push(word[cut..].to_string());
            return;
        }
    }
    tokens.push(word.to_string());
}

/// Lowercases, tokenizes and keeps only alphanumeric, non-stopword tokens (order preserved).
pub fn preprocess(text: &str) -> Vec<String> {
    tokenize(&text.to_lowercase())
        .into_iter()
        .filter(|t| t.chars().all(char::is_alphanumeric) && !is_stopword(t))
        .collect()
}
