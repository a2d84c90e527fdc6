/// Escape a string for safe use in shell single quotes
/// Converts: foo'bar -> 'foo'\''bar'
///
/// # Examples
///
/// ```
/// use wxo_lifecycle::utils::shell::escape;
///
/// assert_eq!(escape("hello"), "'hello'");
/// assert_eq!(escape("foo'bar"), "'foo'\\''bar'");
/// ```
pub fn escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Quote an argument only if the shell would otherwise split or expand it
///
/// # Examples
///
/// ```
/// use wxo_lifecycle::utils::shell::quote;
///
/// assert_eq!(quote("tools/greetings.py"), "tools/greetings.py");
/// assert_eq!(quote("my tool.py"), "'my tool.py'");
/// assert_eq!(quote(""), "''");
/// ```
pub fn quote(s: &str) -> String {
    let is_plain = !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '@' | '+')
        });

    if is_plain {
        s.to_string()
    } else {
        escape(s)
    }
}

/// Join command arguments into a line that can be pasted into a shell
///
/// # Examples
///
/// ```
/// use wxo_lifecycle::utils::shell::join_args;
///
/// let args = vec!["orchestrate", "agents", "remove", "-n", "my agent"];
/// assert_eq!(join_args(&args), "orchestrate agents remove -n 'my agent'");
/// ```
pub fn join_args(args: &[impl AsRef<str>]) -> String {
    args.iter()
        .map(|arg| quote(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
