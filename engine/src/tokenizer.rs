use crate::config::VectorizerParams;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Text analysis shared by fitting and query encoding. A vectorizer keeps its
/// analyzer so queries are always normalized exactly like the corpus was.
#[derive(Debug, Clone, PartialEq)]
pub struct Analyzer {
    stopwords: bool,
    stemming: bool,
    ngram_range: (usize, usize),
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::from_params(&VectorizerParams::default())
    }
}

impl Analyzer {
    pub fn from_params(params: &VectorizerParams) -> Self {
        Self { stopwords: params.stopwords, stemming: params.stemming, ngram_range: params.ngram_range }
    }

    /// NFKC-normalized, lowercased words with stop words removed and stems applied.
    pub fn words(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut words = Vec::new();
        for mat in RE.find_iter(&normalized) {
            let token = mat.as_str();
            if self.stopwords && is_stopword(token) {
                continue;
            }
            if self.stemming {
                words.push(STEMMER.stem(token).into_owned());
            } else {
                words.push(token.to_string());
            }
        }
        words
    }

    /// Words expanded into the configured n-gram range. N-grams are built from
    /// consecutive kept words and joined by a single space.
    pub fn terms(&self, text: &str) -> Vec<String> {
        let words = self.words(text);
        let (lo, hi) = self.ngram_range;
        if lo == 1 && hi == 1 {
            return words;
        }
        let mut terms = Vec::new();
        for n in lo..=hi {
            if n > words.len() {
                break;
            }
            for window in words.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }
}
