//! Term frequency tables over comment text.
//!
//! Segmentation is behind the [`Tokenizer`] trait. The default
//! [`JiebaTokenizer`] is a dictionary segmenter that keeps Chinese words
//! such as 风景 whole. [`WordTokenizer`] follows Unicode word boundaries
//! and suits space-separated languages only.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use jieba_rs::Jieba;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{LexiconConfig, TokenizerKind};
use crate::model::TermCount;

/// Stop words carried over from the review corpus this tool was built for.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "的", "了", "是", "我", "不", "一个", "在", "有", "和", "就", "人", "都", "也", "很", "什么",
    "没有", "可以", "会", "对", "他", "这", "它", "我们", "你", "你们", "她", "他们", "她们",
    "但是", "为", "怎么", "已经", "而且", "更", "来", "自己", "这样",
];

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Built-in jieba dictionary, loaded once per process.
fn jieba() -> &'static Jieba {
    static JIEBA: OnceLock<Jieba> = OnceLock::new();
    JIEBA.get_or_init(|| {
        log::debug!("loading jieba dictionary");
        Jieba::new()
    })
}

/// Dictionary segmentation (jieba, HMM for unknown words), lowercased.
/// Whitespace and punctuation segments are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JiebaTokenizer;

impl Tokenizer for JiebaTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        jieba()
            .cut(text, true)
            .into_iter()
            .filter(|w| w.chars().any(char::is_alphanumeric))
            .map(str::to_lowercase)
            .collect()
    }
}

/// Unicode word segmentation, lowercased.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words().map(|w| w.to_lowercase()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    pub fn from_config(config: &LexiconConfig) -> Self {
        let mut words: HashSet<String> = config.stop_words.iter().map(|w| w.trim().to_string()).collect();
        if config.default_stop_words {
            words.extend(DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()));
        }
        Self(words)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }
}

/// Tokenizer plus the filters applied to its output.
pub struct Lexicon {
    tokenizer: Box<dyn Tokenizer>,
    stop_words: StopWords,
    min_token_chars: usize,
}

impl Lexicon {
    pub fn from_config(config: &LexiconConfig) -> Self {
        let tokenizer: Box<dyn Tokenizer> = match config.tokenizer {
            TokenizerKind::Jieba => Box::new(JiebaTokenizer),
            TokenizerKind::UnicodeWords => Box::new(WordTokenizer),
        };
        Self::with_tokenizer(config, tokenizer)
    }

    pub fn with_tokenizer(config: &LexiconConfig, tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            stop_words: StopWords::from_config(config),
            min_token_chars: config.min_token_chars,
        }
    }

    fn keep(&self, token: &str) -> bool {
        token.chars().count() >= self.min_token_chars && !self.stop_words.contains(token)
    }

    /// Counts of kept tokens, sorted by count desc then term asc.
    pub fn term_frequencies<'a, I>(&self, texts: I) -> Vec<TermCount>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for token in self.tokenizer.tokenize(text) {
                let token = token.trim();
                if self.keep(token) {
                    *counts.entry(token.to_string()).or_insert(0) += 1;
                }
            }
        }

        let mut table: Vec<TermCount> = counts
            .into_iter()
            .map(|(term, count)| TermCount { term, count })
            .collect();
        table.sort_by(|x, y| y.count.cmp(&x.count).then_with(|| x.term.cmp(&y.term)));
        table
    }

    pub fn top_terms<'a, I>(&self, texts: I, n: usize) -> Vec<TermCount>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = self.term_frequencies(texts);
        table.truncate(n);
        table
    }
}
