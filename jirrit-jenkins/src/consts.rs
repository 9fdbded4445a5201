//! Jenkins endpoints and model class names.

/// JSON API suffix of any Jenkins object
pub const JSON_API: &str = "api/json";

/// Console log suffix of a build
pub const CONSOLE_TEXT: &str = "consoleText";

/// Builds listed when no count is given
pub const DEFAULT_BUILD_COUNT: usize = 10;

pub const PARAMETERS_ACTION: &str = "hudson.model.ParametersAction";
pub const CAUSE_ACTION: &str = "hudson.model.CauseAction";
pub const USER_ID_CAUSE: &str = "hudson.model.Cause$UserIdCause";

/// Parameter classes whose values are plain text
pub const TEXT_PARAMETERS: &[&str] = &["hudson.model.StringParameterValue", "hudson.model.TextParameterValue"];
