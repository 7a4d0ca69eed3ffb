//! Shell quoting for remote command lines.

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ',')
}

/// Quote `arg` for a POSIX shell. Words made only of safe characters are
/// passed through untouched so ids and plain paths read naturally.
pub fn quote(arg: &str) -> String {
    if !arg.is_empty() && arg.chars().all(is_safe) {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('\'');
    out.push_str(&arg.replace('\'', r"'\''"));
    out.push('\'');
    out
}
