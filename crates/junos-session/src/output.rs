//! Command strings and helpers for reading `display set` output.
//!
//! # Example
//!
//! ```
//! use junos_session::output::{self, CMD_SHOW_CONFIG, PIPE_DISPLAY_SET_RELATIVE};
//!
//! let cmd = format!("{}applications application-set web{}", CMD_SHOW_CONFIG, PIPE_DISPLAY_SET_RELATIVE);
//! assert_eq!(cmd, "show configuration applications application-set web | display set relative");
//!
//! let reply = "<configuration-output>\nset application junos-http\n</configuration-output>";
//! let lines: Vec<&str> = output::display_set_lines(reply).collect();
//! assert_eq!(lines, ["application junos-http"]);
//! ```

/// Prefix of a configuration show command.
pub const CMD_SHOW_CONFIG: &str = "show configuration ";

/// Suffix asking for `set` statements.
pub const PIPE_DISPLAY_SET: &str = " | display set";

/// Suffix asking for `set` statements relative to the shown hierarchy.
pub const PIPE_DISPLAY_SET_RELATIVE: &str = " | display set relative";

/// Reply of a show command when nothing is configured at that hierarchy.
pub const EMPTY_W: &str = "empty";

/// Opening tag wrapping configuration output.
pub const XML_START_TAG_CONFIG_OUT: &str = "<configuration-output>";

/// Closing tag wrapping configuration output.
pub const XML_END_TAG_CONFIG_OUT: &str = "</configuration-output>";

/// Start of a `set` statement.
pub const SET_LS: &str = "set ";

/// Start of a `delete` statement.
pub const DELETE_LS: &str = "delete ";

/// Separator between the components of a compound resource identifier.
pub const ID_SEPARATOR: &str = "_-_";

/// Builds `show configuration <path> | display set`.
pub fn show_config_display_set(path: &str) -> String {
    format!("{}{}{}", CMD_SHOW_CONFIG, path, PIPE_DISPLAY_SET)
}

/// Builds `show configuration <path> | display set relative`.
pub fn show_config_display_set_relative(path: &str) -> String {
    format!("{}{}{}", CMD_SHOW_CONFIG, path, PIPE_DISPLAY_SET_RELATIVE)
}

/// Yields the statements of a `display set` reply with the `set ` prefix
/// removed.
///
/// Lines carrying the opening tag are dropped wherever they appear and
/// iteration stops at the closing tag. Blank lines are dropped.
pub fn display_set_lines(reply: &str) -> impl Iterator<Item = &str> {
    reply
        .lines()
        .filter(|line| !line.contains(XML_START_TAG_CONFIG_OUT))
        .take_while(|line| !line.contains(XML_END_TAG_CONFIG_OUT))
        .map(|line| line.strip_prefix(SET_LS).unwrap_or(line).trim_end())
        .filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_config_commands() {
        assert_eq!(
            show_config_display_set("system ntp server 192.0.2.1"),
            "show configuration system ntp server 192.0.2.1 | display set"
        );
        assert_eq!(
            show_config_display_set_relative("snmp"),
            "show configuration snmp | display set relative"
        );
    }

    #[test]
    fn test_display_set_lines_strips_tags_and_prefix() {
        let reply = "<configuration-output>\n\
                     set application junos-http\n\
                     set application junos-https\n\
                     </configuration-output>\n\
                     trailing noise";
        let lines: Vec<&str> = display_set_lines(reply).collect();
        assert_eq!(lines, ["application junos-http", "application junos-https"]);
    }

    #[test]
    fn test_display_set_lines_tag_after_leading_newline() {
        let reply = "\n<configuration-output>\nset application junos-http\n</configuration-output>\n";
        let lines: Vec<&str> = display_set_lines(reply).collect();
        assert_eq!(lines, ["application junos-http"]);
    }

    #[test]
    fn test_display_set_lines_without_tags() {
        let reply = "set prefer\n\nset version 4\n";
        let lines: Vec<&str> = display_set_lines(reply).collect();
        assert_eq!(lines, ["prefer", "version 4"]);
    }
}
