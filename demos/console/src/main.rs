//! Console demo: start the auth core, optionally log in, resolve paths.
//!
//! ```text
//! SUPABASE_URL=... SUPABASE_ANON_KEY=... formula-console -e ada@example.com -p secret /team
//! formula-console --offline -e admin@example.com -p admin /edit/onboarding
//! ```

use std::ffi::OsString;

use formula::prelude::*;
use formula::Profile;

#[derive(Debug, Default)]
struct Args {
    email: Option<String>,
    password: Option<String>,
    offline: bool,
    paths: Vec<String>,
    help: bool,
}

fn parse_args<I>(args: I) -> Result<Args, lexopt::Error>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('e') | Long("email") => result.email = Some(parser.value()?.parse()?),
            Short('p') | Long("password") => result.password = Some(parser.value()?.parse()?),
            Long("offline") => result.offline = true,
            Short('h') | Long("help") => result.help = true,
            Value(val) => result.paths.push(val.string()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(result)
}

fn print_help() {
    println!(
        r#"formula-console
Start the Formula auth core, optionally log in, and resolve paths.

USAGE:
    formula-console [OPTIONS] [PATH]...

OPTIONS:
    -e, --email <EMAIL>        Log in with this email
    -p, --password <PASSWORD>  Password for --email
        --offline              Use an in-memory backend with demo accounts
    -h, --help                 Print help

ENVIRONMENT VARIABLES:
    SUPABASE_URL               Project URL (required unless --offline)
    SUPABASE_ANON_KEY          Project anon key (required unless --offline)
    SUPABASE_TIMEOUT_SECS      HTTP timeout in seconds [default: 10]
    RUST_LOG                   Log filter [default: info]"#
    );
}

/// An in-memory backend seeded with one admin and one plain user.
async fn demo_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend
        .add_account(User::new("demo-admin", "admin@example.com"), "admin")
        .await;
    backend
        .add_account(User::new("demo-user", "user@example.com"), "user")
        .await;
    backend
        .set_profile(UserId::from("demo-admin"), Profile::with_role("admin"))
        .await;
    backend
}

fn describe(state: &SessionSnapshot) -> String {
    match &state.user {
        Some(user) => format!(
            "{} ({}) as {}",
            user.email.as_deref().unwrap_or("no email"),
            user.id,
            state.role
        ),
        None => "logged out".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), FormulaError> {
    let args = parse_args(std::env::args_os().skip(1))
        .map_err(|e| FormulaError::Config(e.to_string()))?;
    if args.help {
        print_help();
        return Ok(());
    }

    let _ = formula::init_tracing();

    let app = if args.offline {
        FormulaApp::builder().build_with(demo_backend().await)
    } else {
        FormulaApp::builder().connect_from_env()?
    };

    let state = app.ready().await?;
    println!("session: {}", describe(&state));

    if let Some(email) = &args.email {
        let password = args.password.as_deref().unwrap_or_default();
        match app.session().login(email, password).await {
            Ok(_) => println!("login ok: {}", describe(&app.session().snapshot())),
            Err(e) => println!("login failed: {e}"),
        }
    }

    for path in &args.paths {
        match app.resolve(path) {
            Some(hit) => {
                let slug = hit.param("slug").map(|s| format!(" slug={s}")).unwrap_or_default();
                let lazy = if hit.route.lazy { " (lazy)" } else { "" };
                println!("{path} -> {} [{}]{slug}{lazy}", hit.route.name, hit.route.view);
            }
            None => println!("{path} -> no route"),
        }
    }

    if app.session().snapshot().is_signed_in() {
        if let Err(e) = app.session().logout().await {
            tracing::warn!(error = %e, "logout failed");
        }
    }

    app.shutdown().await
}
