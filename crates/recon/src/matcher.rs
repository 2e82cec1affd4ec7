//! Pairing Fundline files with partner files by name similarity.
//!
//! The two sides are exported by unrelated systems, so names share tokens
//! but rarely their order: `Q1_Report_ABC` vs `ABC_Report_Q1`.

use std::path::Path;

use strsim::normalized_levenshtein;

use crate::config::{MatchMode, MatchingConfig};
use crate::model::{FileMatchOutput, MatchedPair, Unmatched};

/// Strip the extension and lower-case.
pub fn normalize_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_lowercase()
}

/// Best similarity (0-100) of the shorter string against every equally long
/// window of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let width = short.len();
    let short: String = short.iter().collect();
    let best = long
        .windows(width)
        .map(|w| normalized_levenshtein(&short, &w.iter().collect::<String>()))
        .fold(0.0_f64, f64::max);
    best * 100.0
}

/// Split on anything that is not alphanumeric, sort, join with spaces.
pub fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two normalized names: the better of the raw partial ratio
/// and the partial ratio of the token-sorted forms.
pub fn name_score(a: &str, b: &str) -> f64 {
    partial_ratio(a, b).max(partial_ratio(&sort_tokens(a), &sort_tokens(b)))
}

/// Pick a partner for each Fundline file, in Fundline input order.
///
/// Ties resolve to the earliest candidate. A pair is emitted only when the
/// best score is strictly above `config.threshold`.
pub fn match_files(fundline: &[String], partner: &[String], config: &MatchingConfig) -> FileMatchOutput {
    let candidates: Vec<String> = partner.iter().map(|p| normalize_name(p)).collect();
    let mut taken = vec![false; partner.len()];
    let mut output = FileMatchOutput::default();

    for file in fundline {
        let base = normalize_name(file);

        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            if config.mode == MatchMode::Injective && taken[idx] {
                continue;
            }
            let score = name_score(&base, candidate);
            log::debug!("score '{file}' vs '{}': {score:.1}", partner[idx]);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((idx, score));
            }
        }

        match best {
            Some((idx, score)) if score > config.threshold => {
                taken[idx] = true;
                output.pairs.push(MatchedPair {
                    fundline: file.clone(),
                    partner: partner[idx].clone(),
                    score,
                });
            }
            _ => output.unmatched.push(Unmatched {
                fundline: file.clone(),
                best_candidate: best.map(|(idx, _)| partner[idx].clone()),
                best_score: best.map(|(_, s)| s),
            }),
        }
    }

    log::info!("matched files: {:?}", output.pairs.iter().map(|p| (&p.fundline, &p.partner)).collect::<Vec<_>>());
    output
}
