use super::Context;
use backscroll_browser::find_any_browser;
use backscroll_core::Config;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    println!("backscroll check");
    println!("================");
    println!();

    let config_exists = ctx.config_path.exists();
    println!(
        "Config:    {} {}",
        ctx.config_path.display(),
        if config_exists { "✓" } else { "✗ (not found, using defaults and environment)" }
    );

    let config = ctx.load_config()?;
    for (key, value) in settings(&config) {
        println!("  {:<14} {}", key, value);
    }
    println!();

    let jar = ctx.paths.cookies_file();
    println!(
        "Cookies:   {} {}",
        jar.display(),
        if jar.exists() { "✓" } else { "✗ (will sign in)" }
    );
    if !jar.exists() && !config.has_credentials() {
        println!("  ⚠ No cookies and no email/password: sign-in will fail");
    }

    match &config.browser.binary {
        Some(binary) => println!("Browser:   {} (configured)", binary),
        None => match find_any_browser() {
            Some((engine, path)) => println!("Browser:   {} ({})", path, engine.name()),
            None => println!("Browser:   ✗ Chrome/Chromium/Edge not found"),
        },
    }
    println!();

    match config.validate() {
        Ok(()) => println!("✓ Configuration is valid"),
        Err(e) => {
            println!("✗ {}", e);
            return Err(e.into());
        }
    }
    Ok(())
}

/// The resolved settings, with the password masked.
fn settings(config: &Config) -> Vec<(&'static str, String)> {
    let cutoff = match config.cutoff() {
        Ok(date) => date.to_string(),
        Err(_) => format!(
            "invalid ({}-{}-{})",
            config.start_year, config.start_month, config.start_day
        ),
    };
    vec![
        ("workspace_url", config.workspace_url.clone()),
        ("email", config.email.clone()),
        ("password", mask(&config.password)),
        ("channel_name", config.channel_name.clone()),
        ("start_date", cutoff),
        ("scroll_offset", config.scroll_offset.to_string()),
        ("time_delay", format!("{}s", config.time_delay)),
        (
            "max_cycles",
            config
                .max_cycles()
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
        ),
        ("headed", config.browser.headed.to_string()),
    ]
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        "********".to_string()
    }
}
