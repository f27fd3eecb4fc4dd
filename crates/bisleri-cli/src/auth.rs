//! `auth` command handlers.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use bisleri_client::auth::{login_with_otp, normalize_phone};
use bisleri_client::extract::address_candidates;
use bisleri_client::session::import_cookie_export;
use bisleri_client::{Page, StorefrontClient};
use bisleri_core::{Profile, Prompter, StoredCookie, ADDRESS_SOURCE_SHIPPING_PAGE};
use chrono::Utc;
use clap::{Subcommand, ValueEnum};

use crate::context::AppContext;
use crate::format::{key_value, timestamp};
use crate::prompt::TerminalPrompter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoginMethod {
    /// SMS one-time password
    Otp,
    /// Cookies exported from a logged-in browser session
    Browser,
}

/// Sub-commands available under `auth`.
#[derive(Debug, Subcommand)]
pub enum AuthCommands {
    /// Log in and store the session in a profile
    Login {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long, value_enum, default_value_t = LoginMethod::Otp)]
        method: LoginMethod,
        /// Phone number (10 digits); prompted for when omitted
        #[arg(long)]
        phone: Option<String>,
        /// Browser cookie export (JSON array), required with `--method browser`
        #[arg(long)]
        cookies_file: Option<PathBuf>,
    },
    /// End the session and forget its cookies
    Logout {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Show what is saved for a profile
    Status {
        #[arg(long)]
        profile: Option<String>,
    },
}

pub(crate) async fn run_auth(ctx: &AppContext, command: AuthCommands) -> anyhow::Result<()> {
    match command {
        AuthCommands::Login {
            profile,
            method,
            phone,
            cookies_file,
        } => {
            let prompter = TerminalPrompter::new();
            let source = match method {
                LoginMethod::Otp => CredentialSource::Otp {
                    phone: phone.as_deref(),
                },
                LoginMethod::Browser => CredentialSource::CookieFile(
                    cookies_file
                        .as_deref()
                        .context("--cookies-file is required with --method browser")?,
                ),
            };
            run_login(ctx, &prompter, profile.as_deref(), source).await
        }
        AuthCommands::Logout { profile } => run_logout(ctx, profile.as_deref()).await,
        AuthCommands::Status { profile } => run_status(ctx, profile.as_deref()),
    }
}

pub(crate) enum CredentialSource<'a> {
    Otp { phone: Option<&'a str> },
    CookieFile(&'a Path),
}

/// Acquires a session, stores it in the profile, makes that profile current
/// and tries to capture a delivery address from the shipping page.
pub(crate) async fn run_login<P: Prompter>(
    ctx: &AppContext,
    prompter: &P,
    profile_flag: Option<&str>,
    source: CredentialSource<'_>,
) -> anyhow::Result<()> {
    let (mut cfg, mut profile) = ctx.load_profile(profile_flag)?;

    let (cookies, phone) = match source {
        CredentialSource::Otp { phone } => {
            let phone = resolve_phone(prompter, phone, &profile.phone_number).await?;
            let client = StorefrontClient::new(ctx.client_settings(), &[])?;
            let cookies = login_with_otp(&client, prompter, &phone)
                .await
                .context("login failed")?;
            (cookies, Some(phone))
        }
        CredentialSource::CookieFile(path) => (import_browser_session(ctx, path).await?, None),
    };

    profile.replace_session(cookies, phone.as_deref(), Utc::now());
    ctx.store.save_profile(&profile)?;

    if capture_address(ctx, &mut profile).await {
        if let Err(err) = ctx.store.save_profile(&profile) {
            tracing::warn!(error = %err, "captured address not saved");
        }
    }

    cfg.current_profile.clone_from(&profile.name);
    ctx.store.save_config(&cfg)?;
    println!("Login captured for profile: {}", profile.name);
    Ok(())
}

/// The flag wins; otherwise the saved number is offered as the default.
async fn resolve_phone<P: Prompter>(
    prompter: &P,
    flag: Option<&str>,
    saved: &str,
) -> anyhow::Result<String> {
    let raw = match flag.map(str::trim).filter(|p| !p.is_empty()) {
        Some(phone) => phone.to_string(),
        None if !saved.is_empty() => {
            let answer = prompter.ask(&format!("Phone number [{saved}]")).await?;
            if answer.is_empty() {
                saved.to_string()
            } else {
                answer
            }
        }
        None => prompter.ask("Phone number").await?,
    };
    Ok(normalize_phone(&raw)?)
}

async fn import_browser_session(ctx: &AppContext, path: &Path) -> anyhow::Result<Vec<StoredCookie>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read cookie export {}", path.display()))?;
    let cookies = import_cookie_export(&json, Utc::now().timestamp())?;
    let client = StorefrontClient::new(ctx.client_settings(), &cookies)?;
    client
        .verify_authenticated()
        .await
        .context("browser session is not logged in")?;
    tracing::info!(cookies = cookies.len(), "browser session imported");
    Ok(cookies)
}

/// Takes the default (or first) address off the shipping page. Any failure
/// leaves the profile untouched.
pub(crate) async fn capture_address(ctx: &AppContext, profile: &mut Profile) -> bool {
    let html = match ctx.session_client(profile) {
        Ok(client) => client.fetch_shipping_page().await,
        Err(err) => {
            tracing::debug!(error = %err, "address capture skipped");
            return false;
        }
    };
    let html = match html {
        Ok(html) => html,
        Err(err) => {
            tracing::debug!(error = %err, "address capture skipped");
            return false;
        }
    };
    let candidates = address_candidates(&Page::parse(&html));
    let Some(chosen) = candidates
        .iter()
        .find(|c| c.is_default)
        .or_else(|| candidates.first())
    else {
        tracing::debug!("no address on shipping page");
        return false;
    };
    profile.address_id.clone_from(&chosen.id);
    profile.address = Some(chosen.address.clone());
    profile.address_source = ADDRESS_SOURCE_SHIPPING_PAGE.to_string();
    tracing::info!(address_id = %profile.address_id, "address captured");
    true
}

async fn run_logout(ctx: &AppContext, profile_flag: Option<&str>) -> anyhow::Result<()> {
    let (_, mut profile) = ctx.load_profile(profile_flag)?;
    if profile.has_session() {
        let result = match ctx.session_client(&profile) {
            Ok(client) => client.logout().await.map_err(anyhow::Error::from),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            eprintln!("Warning: remote logout failed: {err:#}");
        }
    }
    profile.clear_session();
    ctx.store.save_profile(&profile)?;
    println!("Logged out profile: {}", profile.name);
    Ok(())
}

fn run_status(ctx: &AppContext, profile_flag: Option<&str>) -> anyhow::Result<()> {
    let (_, profile) = ctx.load_profile(profile_flag)?;
    for line in status_lines(&profile) {
        println!("{line}");
    }
    Ok(())
}

fn status_lines(profile: &Profile) -> Vec<String> {
    let mut lines = vec![
        key_value("Profile", &profile.name),
        key_value("Last login", &timestamp(profile.last_login)),
        key_value("Cookies", &profile.cookies.len().to_string()),
        key_value(
            "Address",
            profile
                .address
                .as_ref()
                .map_or("not set", |a| a.address1.as_str()),
        ),
    ];
    if !profile.phone_number.is_empty() {
        lines.push(key_value("Phone", &profile.phone_number));
    }
    if let Some(order) = &profile.last_order {
        lines.push(key_value(
            "Last order",
            &format!("{} ({})", order.order_id, timestamp(Some(order.placed_at))),
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use bisleri_core::{Address, LastOrder, ScriptedPrompter};
    use chrono::TimeZone;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::context::test_support::context;

    #[tokio::test]
    async fn flag_phone_skips_the_prompt() {
        let prompter = ScriptedPrompter::new();
        let phone = resolve_phone(&prompter, Some("+91 98765 43210"), "").await.unwrap();
        assert_eq!(phone, "9876543210");
        assert!(prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn empty_answer_keeps_saved_phone() {
        let prompter = ScriptedPrompter::new().with_answers([""]);
        let phone = resolve_phone(&prompter, None, "9876543210").await.unwrap();
        assert_eq!(phone, "9876543210");
        assert_eq!(prompter.asked(), vec!["Phone number [9876543210]"]);
    }

    #[tokio::test]
    async fn short_phone_is_rejected() {
        let prompter = ScriptedPrompter::new().with_answers(["12345"]);
        assert!(resolve_phone(&prompter, None, "").await.is_err());
    }

    #[test]
    fn status_reports_missing_address() {
        let profile = Profile::new("home");
        let lines = status_lines(&profile);
        assert_eq!(lines[0], "Profile: home");
        assert_eq!(lines[1], "Last login: -");
        assert_eq!(lines[2], "Cookies: 0");
        assert_eq!(lines[3], "Address: not set");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn status_includes_phone_and_last_order() {
        let mut profile = Profile::new("office");
        profile.phone_number = "9876543210".into();
        profile.address = Some(Address {
            address1: "12 Residency Road".into(),
            ..Address::default()
        });
        profile.last_order = Some(LastOrder {
            order_id: "BS-77".into(),
            placed_at: Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap(),
            total_price: "₹180".into(),
        });
        let lines = status_lines(&profile);
        assert_eq!(lines[3], "Address: 12 Residency Road");
        assert_eq!(lines[4], "Phone: 9876543210");
        assert_eq!(lines[5], "Last order: BS-77 (2026-02-03T04:05:06Z)");
    }

    #[tokio::test]
    async fn browser_login_imports_cookies_and_captures_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/my-orders"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<div class='all-order'></div>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/checkout"))
            .and(query_param("stage", "shipping"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="address-card" data-address-id="home">Asha Rao, Bengaluru, KA 560001 9876543210</div>
                   <div class="address-card" data-address-id="work">Default - Asha Rao, Pune, MH 411001 9876543210</div>"#,
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), &server.uri());
        let export = dir.path().join("cookies.json");
        std::fs::write(
            &export,
            r#"[{"name":"dwsid","value":"browser","domain":".bisleri.com","path":"/"},
                {"name":"_ga","value":"x","domain":".google.com","path":"/"}]"#,
        )
        .unwrap();

        let prompter = ScriptedPrompter::new();
        run_login(&ctx, &prompter, Some("home"), CredentialSource::CookieFile(&export))
            .await
            .unwrap();

        let profile = ctx.store.load_or_create_profile("home").unwrap();
        assert_eq!(profile.cookies.len(), 1);
        assert_eq!(profile.cookies[0].value, "browser");
        assert!(profile.last_login.is_some());
        assert_eq!(profile.address_id, "work");
        assert_eq!(profile.address_source, "shipping-page");
        assert_eq!(profile.address.unwrap().postal_code, "411001");
        assert_eq!(ctx.load_config().unwrap().current_profile, "home");
    }

    #[tokio::test]
    async fn browser_login_with_dead_session_saves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/my-orders"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/login"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("login"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), &server.uri());
        let export = dir.path().join("cookies.json");
        std::fs::write(&export, r#"[{"name":"dwsid","value":"stale","domain":"www.bisleri.com"}]"#)
            .unwrap();

        let prompter = ScriptedPrompter::new();
        let err = run_login(&ctx, &prompter, Some("home"), CredentialSource::CookieFile(&export))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("browser session is not logged in"));
        assert!(!ctx.store.load_or_create_profile("home").unwrap().has_session());
    }
}
