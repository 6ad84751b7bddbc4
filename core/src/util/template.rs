//! `{name}` placeholder expansion for stage command templates.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([a-z_]+)\}").unwrap();
}

/// Replace every `{name}` whose name is present in `vars`.
///
/// Unknown placeholders are left verbatim so literal braces in tool
/// arguments survive.
pub fn expand_placeholders(template: &str, vars: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
