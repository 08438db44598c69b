use clap::{builder::ValueParser, Arg, ArgAction, Command};
use regex::Regex;

pub const CMD_LOGIN: &str = "login";
pub const CMD_REGISTER: &str = "register";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_WHOAMI: &str = "whoami";
pub const CMD_USERS: &str = "users";

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_NAME: &str = "name";
pub const ARG_ROLE: &str = "role";
pub const ARG_REFRESH: &str = "refresh";

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

fn validator_email() -> ValueParser {
    ValueParser::from(move |email: &str| -> std::result::Result<String, String> {
        let email = email.trim();
        if valid_email(email) {
            Ok(email.to_string())
        } else {
            Err("invalid email address".to_string())
        }
    })
}

fn email_arg() -> Arg {
    Arg::new(ARG_EMAIL)
        .short('e')
        .long(ARG_EMAIL)
        .help("Account email")
        .required(true)
        .value_parser(validator_email())
}

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .short('p')
        .long(ARG_PASSWORD)
        .help("Account password")
        .env("MEDSESSION_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in and persist the session")
                .arg(email_arg())
                .arg(password_arg()),
        )
        .subcommand(
            Command::new(CMD_REGISTER)
                .about("Create an account and sign in with it")
                .arg(
                    Arg::new(ARG_NAME)
                        .short('n')
                        .long(ARG_NAME)
                        .help("Full name")
                        .required(true),
                )
                .arg(email_arg())
                .arg(password_arg())
                .arg(
                    Arg::new(ARG_ROLE)
                        .short('r')
                        .long(ARG_ROLE)
                        .help("Account role")
                        .default_value("patient")
                        .value_parser(["patient", "doctor", "admin"]),
                ),
        )
        .subcommand(Command::new(CMD_LOGOUT).about("Sign out and forget stored credentials"))
        .subcommand(
            Command::new(CMD_WHOAMI)
                .about("Show the restored session user")
                .arg(
                    Arg::new(ARG_REFRESH)
                        .long(ARG_REFRESH)
                        .help("Fetch the latest profile from the server")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new(CMD_USERS)
                .about("List users visible to the signed in account")
                .arg(
                    Arg::new(ARG_ROLE)
                        .short('r')
                        .long(ARG_ROLE)
                        .help("Only list users with this role")
                        .value_parser(["doctor", "patient"]),
                ),
        )
}
