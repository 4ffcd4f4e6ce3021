//! Turns the text of a `.command` file into the argument list handed to the
//! program under test.
//!
//! A command file is free-form: it usually starts with the command line as the
//! course staff typed it (`./cacheSim example1_trace --mem-cyc 100 ...`), so
//! everything before the first flag is annotation and gets dropped. One flag is
//! special: when it carries the skip value the fixture is not run at all, and in
//! every other case the flag and its value are removed before launch.

use crate::config::CheckerConfig;

/// How to read a command file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentRules {
    pub flag_marker: String,
    pub skip_flag: String,
    pub skip_value: String,
}

impl ArgumentRules {
    pub fn from_config(config: &CheckerConfig) -> Self {
        Self {
            flag_marker: config.flag_marker.clone(),
            skip_flag: config.skip_flag.clone(),
            skip_value: config.skip_value.clone(),
        }
    }
}

/// Result of filtering one flag out of an argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredArgs {
    pub args: Vec<String>,
    pub skip: bool,
}

/// What to do with a fixture, decided from its command file alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentPlan {
    Run(Vec<String>),
    Skip,
}

/// Splits on any run of whitespace, newlines included.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Drops the annotation preamble. With no flag anywhere the tokens are kept as
/// they are.
pub fn effective_arguments<'a>(tokens: &'a [String], flag_marker: &str) -> &'a [String] {
    match tokens.iter().position(|t| t.starts_with(flag_marker)) {
        Some(start) => &tokens[start..],
        None => tokens,
    }
}

/// Removes every occurrence of `flag` together with the token after it, and
/// reports whether `flag` was ever immediately followed by `skip_value`.
pub fn filter_flag(tokens: &[String], flag: &str, skip_value: &str) -> FilteredArgs {
    let skip = tokens
        .windows(2)
        .any(|pair| pair[0] == flag && pair[1] == skip_value);

    let mut args = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if token == flag {
            iter.next();
            continue;
        }
        args.push(token.clone());
    }
    FilteredArgs { args, skip }
}

/// Full derivation: tokenize, drop the preamble, then apply the skip flag.
pub fn plan_arguments(text: &str, rules: &ArgumentRules) -> ArgumentPlan {
    let tokens = tokenize(text);
    let effective = effective_arguments(&tokens, &rules.flag_marker);
    let filtered = filter_flag(effective, &rules.skip_flag, &rules.skip_value);
    if filtered.skip {
        ArgumentPlan::Skip
    } else {
        ArgumentPlan::Run(filtered.args)
    }
}
