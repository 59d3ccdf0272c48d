//! Environment tweaks for language autobuild scripts.

/// JVM options variable read by Java build tools.
pub const JAVA_TOOL_OPTIONS_VAR: &str = "JAVA_TOOL_OPTIONS";

/// Flags that stop Maven reusing pooled HTTP connections. Hosted runners
/// drop idle connections after a few minutes and Maven does not recover,
/// so long builds time out fetching dependencies.
const KEEP_ALIVE_FLAGS: [&str; 2] = ["-Dhttp.keepAlive=false", "-Dmaven.wagon.http.pool=false"];

/// Append the keep-alive flags to an existing `JAVA_TOOL_OPTIONS` value.
///
/// Existing options are kept in order. A flag already present is not added
/// a second time.
#[must_use]
pub fn augment_java_tool_options(existing: Option<&str>) -> String {
    let mut options: Vec<&str> = existing
        .unwrap_or_default()
        .split_whitespace()
        .collect();
    for flag in KEEP_ALIVE_FLAGS {
        if !options.contains(&flag) {
            options.push(flag);
        }
    }
    options.join(" ")
}
