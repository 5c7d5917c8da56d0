//! Query parameter helpers.
//!
//! The Connect API takes two comma-delimited list parameters that are built
//! differently: `include_meta` always gets a leading comma (the server ignores
//! it), `include` never does.

use std::collections::BTreeMap;

/// Query parameters sent with a request, encoded in key order.
pub type Params = BTreeMap<String, String>;

pub const INCLUDE_META: &str = "include_meta";
pub const INCLUDE: &str = "include";

/// Append `,<value>` to `include_meta`, creating it when absent.
pub fn add_meta_param(params: &mut Params, value: &str) {
    let meta = params.entry(INCLUDE_META.to_owned()).or_default();
    meta.push(',');
    meta.push_str(value);
}

/// Append `value` to `include`, inserting a comma only after existing content.
pub fn add_include_param(params: &mut Params, value: &str) {
    let include = params.entry(INCLUDE.to_owned()).or_default();
    if !include.is_empty() {
        include.push(',');
    }
    include.push_str(value);
}
