use clap::Parser;

use super::*;

#[test]
fn parses_order_with_all_flags() {
    let cli = Cli::try_parse_from([
        "bislericli",
        "order",
        "--profile",
        "office",
        "--qty",
        "3",
        "--return",
        "1",
        "--allow-extra",
        "--debug",
    ])
    .expect("expected valid cli args");

    assert!(cli.debug);
    match cli.command {
        Commands::Order {
            profile,
            qty,
            return_jars,
            allow_extra,
        } => {
            assert_eq!(profile.as_deref(), Some("office"));
            assert_eq!(qty, 3);
            assert_eq!(return_jars, Some(1));
            assert!(allow_extra);
        }
        other => panic!("expected order, got {other:?}"),
    }
}

#[test]
fn order_defaults_leave_quantity_to_config() {
    let cli = Cli::try_parse_from(["bislericli", "order"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Order {
            profile: None,
            qty: 0,
            return_jars: None,
            allow_extra: false,
        }
    ));
    assert!(!cli.debug);
}

#[test]
fn negative_quantity_is_a_parse_error() {
    assert!(Cli::try_parse_from(["bislericli", "order", "--qty", "-2"]).is_err());
}

#[test]
fn parses_auth_login_otp_by_default() {
    let cli = Cli::try_parse_from(["bislericli", "auth", "login", "--phone", "9876543210"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Auth {
            command: AuthCommands::Login {
                method: auth::LoginMethod::Otp,
                phone: Some(_),
                cookies_file: None,
                ..
            }
        }
    ));
}

#[test]
fn parses_auth_login_browser_with_cookie_file() {
    let cli = Cli::try_parse_from([
        "bislericli",
        "auth",
        "login",
        "--method",
        "browser",
        "--cookies-file",
        "/tmp/cookies.json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Auth {
            command: AuthCommands::Login {
                method: auth::LoginMethod::Browser,
                cookies_file: Some(_),
                ..
            }
        }
    ));
}

#[test]
fn rejects_unknown_login_method() {
    assert!(Cli::try_parse_from(["bislericli", "auth", "login", "--method", "sso"]).is_err());
}

#[test]
fn parses_auth_status_and_logout() {
    let cli = Cli::try_parse_from(["bislericli", "auth", "status", "--profile", "home"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Auth {
            command: AuthCommands::Status { profile: Some(_) }
        }
    ));
    let cli = Cli::try_parse_from(["bislericli", "auth", "logout"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Auth {
            command: AuthCommands::Logout { profile: None }
        }
    ));
}

#[test]
fn parses_profile_use() {
    let cli = Cli::try_parse_from(["bislericli", "profile", "use", "office"]).unwrap();
    match cli.command {
        Commands::Profile {
            command: ProfileCommands::Use { name },
        } => assert_eq!(name, "office"),
        other => panic!("expected profile use, got {other:?}"),
    }
}

#[test]
fn orders_limit_defaults_to_ten() {
    let cli = Cli::try_parse_from(["bislericli", "orders"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Orders {
            profile: None,
            limit: 10
        }
    ));
}

#[test]
fn parses_stats_patterns_and_config_show() {
    let cli = Cli::try_parse_from(["bislericli", "stats", "--view-patterns"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Stats {
            view_patterns: true,
            ..
        }
    ));
    let cli = Cli::try_parse_from(["bislericli", "config", "show"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommands::Show
        }
    ));
}

#[test]
fn a_command_is_required() {
    assert!(Cli::try_parse_from(["bislericli"]).is_err());
}

#[test]
fn debug_flag_is_accepted_after_any_subcommand() {
    let cli = Cli::try_parse_from(["bislericli", "sync", "--debug"]).unwrap();
    assert!(cli.debug);
    assert!(matches!(cli.command, Commands::Sync { profile: None }));
}
