use std::path::PathBuf;

/// Conventional install locations checked after `PATH`, platform-specific.
fn conventional_locations(bin_name: &str) -> Vec<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    vec![
        PathBuf::from(format!("{home}/.local/bin/{bin_name}")),
        PathBuf::from(format!("{home}/.{bin_name}/bin/{bin_name}")),
        PathBuf::from(format!("/usr/local/bin/{bin_name}")),
        PathBuf::from(format!("/opt/{bin_name}/bin/{bin_name}")),
    ]
}

fn search_path(bin_name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(bin_name))
        .find(|candidate| candidate.is_file())
}

/// Resolve a binary via (1) explicit config path, (2) `PATH` search, (3) a
/// short list of conventional install locations.
pub fn resolve_binary(explicit: Option<&str>, bin_name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
    }

    if let Some(found) = search_path(bin_name) {
        return Some(found);
    }

    conventional_locations(bin_name)
        .into_iter()
        .find(|p| p.is_file())
}

/// Quote an argument for a POSIX shell wrapper, resistant to embedded quotes,
/// backticks, `$`, and newlines: wrap in single quotes, escaping any
/// embedded single quote as `'\''`.
pub fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=".contains(c)) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_args_are_not_quoted() {
        assert_eq!(shell_quote("simple-arg_1.txt"), "simple-arg_1.txt");
    }

    #[test]
    fn embedded_quote_is_escaped() {
        assert_eq!(shell_quote("it's here"), r"'it'\''s here'");
    }

    #[test]
    fn backticks_and_dollar_are_neutralized_by_single_quoting() {
        let quoted = shell_quote("`rm -rf /` $HOME");
        assert!(quoted.starts_with('\''));
        assert!(quoted.ends_with('\''));
    }
}
