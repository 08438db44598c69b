pub mod logging;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_STORE: &str = "store";
pub const ARG_EPHEMERAL: &str = "ephemeral";
pub const ARG_TIMEOUT: &str = "timeout";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("medsession")
        .about("Session manager for the medical appointments API")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_URL)
                .short('u')
                .long(ARG_API_URL)
                .help("Identity API base URL, example: https://api.clinic.tld/v1")
                .env("MEDSESSION_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_STORE)
                .short('s')
                .long(ARG_STORE)
                .help("Path of the credentials file")
                .env("MEDSESSION_STORE")
                .global(true)
                .default_value(crate::cli::globals::DEFAULT_STORE_PATH)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new(ARG_EPHEMERAL)
                .long(ARG_EPHEMERAL)
                .help("Keep credentials in memory only")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("HTTP request timeout in seconds")
                .env("MEDSESSION_TIMEOUT")
                .global(true)
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..=300)),
        );

    let command = logging::with_args(command);
    session::with_subcommands(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = "https://api.clinic.test";

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "medsession");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Session manager for the medical appointments API".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_global_args_after_subcommand() {
        temp_env::with_vars(
            [
                ("MEDSESSION_API_URL", None::<&str>),
                ("MEDSESSION_STORE", None),
                ("MEDSESSION_TIMEOUT", None),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "medsession",
                    "logout",
                    "--api-url",
                    API,
                    "--timeout",
                    "3",
                ]);

                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).map(String::as_str),
                    Some(API)
                );
                assert_eq!(matches.get_one::<u64>(ARG_TIMEOUT).copied(), Some(3));
                assert_eq!(
                    matches.get_one::<std::path::PathBuf>(ARG_STORE),
                    Some(&std::path::PathBuf::from("medsession.json"))
                );
                assert_eq!(matches.subcommand_name(), Some("logout"));
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("MEDSESSION_API_URL", Some(API)),
                ("MEDSESSION_STORE", Some("/tmp/session.json")),
                ("MEDSESSION_TIMEOUT", Some("30")),
                ("MEDSESSION_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["medsession", "whoami"]);
                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).map(String::as_str),
                    Some(API)
                );
                assert_eq!(
                    matches.get_one::<std::path::PathBuf>(ARG_STORE),
                    Some(&std::path::PathBuf::from("/tmp/session.json"))
                );
                assert_eq!(matches.get_one::<u64>(ARG_TIMEOUT).copied(), Some(30));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_missing_api_url() {
        temp_env::with_vars([("MEDSESSION_API_URL", None::<&str>)], || {
            let matches = new().get_matches_from(vec!["medsession", "logout"]);
            assert_eq!(matches.get_one::<String>(ARG_API_URL), None);
        });
    }

    #[test]
    fn test_timeout_out_of_range() {
        temp_env::with_vars([("MEDSESSION_API_URL", Some(API))], || {
            let result =
                new().try_get_matches_from(vec!["medsession", "logout", "--timeout", "0"]);
            assert!(result.is_err());
        });
    }
}
