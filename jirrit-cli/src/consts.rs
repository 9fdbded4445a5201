//! Constants for the Jirrit CLI

/// Long flags also accepted with a single leading dash
pub const SINGLE_DASH_LONG_FLAGS: &[&str] = &["hd", "ver", "reverse", "getsvrcfg", "setsvrcfg", "fn", "fv", "cfg", "log"];

/// Extra entry in the action menu that reuses the previous action's results
pub const WITH_FORMER_RESULTS: &str = "_with former results_";

/// Printed when an action returns nothing
pub const NO_RESULTS: &str = "No results.";

/// Seconds an update probe may take
pub const UPDATE_TIMEOUT_SECS: u64 = 10;
