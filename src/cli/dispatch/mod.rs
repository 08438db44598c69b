use crate::{
    cli::{
        actions::{session, users, Action},
        commands::{
            session::{
                ARG_EMAIL, ARG_NAME, ARG_PASSWORD, ARG_REFRESH, ARG_ROLE, CMD_LOGIN, CMD_LOGOUT,
                CMD_REGISTER, CMD_USERS, CMD_WHOAMI,
            },
            ARG_API_URL, ARG_EPHEMERAL, ARG_STORE, ARG_TIMEOUT,
        },
        globals::GlobalArgs,
    },
    session::user::Role,
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(name)
        .with_context(|| format!("missing required argument: --{name}"))
}

fn role(matches: &ArgMatches) -> Result<Option<Role>> {
    matches
        .get_one::<String>(ARG_ROLE)
        .map(|role| role.parse::<Role>().map_err(|e| anyhow!(e)))
        .transpose()
}

fn globals(matches: &ArgMatches) -> Result<GlobalArgs> {
    let mut globals = GlobalArgs::new(required(matches, ARG_API_URL)?.clone());

    if let Some(path) = matches.get_one::<PathBuf>(ARG_STORE) {
        globals.set_store_path(path.clone());
    }
    globals.ephemeral = matches.get_flag(ARG_EPHEMERAL);
    if let Some(seconds) = matches.get_one::<u64>(ARG_TIMEOUT) {
        globals.timeout = Duration::from_secs(*seconds);
    }

    Ok(globals)
}

/// Maps parsed arguments to the action to run and its global options.
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &ArgMatches) -> Result<(Action, GlobalArgs)> {
    let globals = globals(matches)?;

    let action = match matches.subcommand() {
        Some((CMD_LOGIN, sub)) => Action::Login(session::LoginArgs {
            email: required(sub, ARG_EMAIL)?.clone(),
            password: SecretString::from(required(sub, ARG_PASSWORD)?.clone()),
        }),
        Some((CMD_REGISTER, sub)) => Action::Register(session::RegisterArgs {
            name: required(sub, ARG_NAME)?.clone(),
            email: required(sub, ARG_EMAIL)?.clone(),
            password: SecretString::from(required(sub, ARG_PASSWORD)?.clone()),
            role: role(sub)?.unwrap_or(Role::Patient),
        }),
        Some((CMD_LOGOUT, _)) => Action::Logout,
        Some((CMD_WHOAMI, sub)) => Action::WhoAmI {
            refresh: sub.get_flag(ARG_REFRESH),
        },
        Some((CMD_USERS, sub)) => Action::Users(users::Args { role: role(sub)? }),
        Some((other, _)) => return Err(anyhow!("unknown subcommand: {other}")),
        None => return Err(anyhow!("no subcommand given")),
    };

    Ok((action, globals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    const API: &str = "https://api.clinic.test";

    fn matches(args: &[&str]) -> ArgMatches {
        temp_env::with_vars(
            [
                ("MEDSESSION_API_URL", Some(API)),
                ("MEDSESSION_STORE", None),
                ("MEDSESSION_TIMEOUT", None),
                ("MEDSESSION_PASSWORD", None),
            ],
            || {
                let mut argv = vec!["medsession"];
                argv.extend_from_slice(args);
                commands::new().get_matches_from(argv)
            },
        )
    }

    #[test]
    fn test_handler_login() {
        let (action, globals) =
            handler(&matches(&["login", "-e", "ana@clinic.test", "-p", "pw"])).expect("handler");

        assert_eq!(globals.api_url, API);
        assert_eq!(globals.store_path, PathBuf::from("medsession.json"));
        assert!(!globals.ephemeral);
        assert_eq!(globals.timeout, Duration::from_secs(10));

        match action {
            Action::Login(args) => {
                assert_eq!(args.email, "ana@clinic.test");
                assert_eq!(args.password.expose_secret(), "pw");
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_handler_register() {
        let (action, _) = handler(&matches(&[
            "register", "--name", "Ana", "--email", "ana@clinic.test", "--password", "pw",
            "--role", "doctor",
        ]))
        .expect("handler");

        match action {
            Action::Register(args) => {
                assert_eq!(args.name, "Ana");
                assert_eq!(args.role, Role::Doctor);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_handler_globals() {
        let (action, globals) = handler(&matches(&[
            "whoami",
            "--refresh",
            "--ephemeral",
            "--store",
            "/tmp/other.json",
            "--timeout",
            "5",
        ]))
        .expect("handler");

        assert!(matches!(action, Action::WhoAmI { refresh: true }));
        assert!(globals.ephemeral);
        assert_eq!(globals.store_path, PathBuf::from("/tmp/other.json"));
        assert_eq!(globals.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_handler_users() {
        let (action, _) = handler(&matches(&["users"])).expect("handler");
        assert!(matches!(action, Action::Users(users::Args { role: None })));

        let (action, _) = handler(&matches(&["users", "-r", "patient"])).expect("handler");
        assert!(matches!(
            action,
            Action::Users(users::Args {
                role: Some(Role::Patient)
            })
        ));
    }

    #[test]
    fn test_handler_requires_api_url() {
        let matches = temp_env::with_vars([("MEDSESSION_API_URL", None::<&str>)], || {
            commands::new().get_matches_from(vec!["medsession", "logout"])
        });

        let err = handler(&matches).expect_err("api url is required");
        assert!(err.to_string().contains("--api-url"));
    }

    #[test]
    fn test_handler_logout() {
        let (action, _) = handler(&matches(&["logout"])).expect("handler");
        assert!(matches!(action, Action::Logout));
    }
}
