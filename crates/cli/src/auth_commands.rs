use {anyhow::Result, botdeck_config::BotdeckConfig, botdeck_oauth::DiscordOAuth};

/// Print the authorize URL an operator opens to sign in.
pub fn print_auth_url(config: BotdeckConfig, origin: Option<String>) -> Result<()> {
    let oauth = DiscordOAuth::new(config.oauth);
    let url = oauth.authorize_url(origin.as_deref())?;
    println!("{url}");
    if !oauth.is_configured() {
        eprintln!(
            "note: no client secret configured; set BOTDECK_DISCORD_CLIENT_SECRET before signing in"
        );
    }
    Ok(())
}
