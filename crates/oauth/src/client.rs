use {
    botdeck_config::OAuthSettings,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, info, warn},
    url::Url,
};

#[cfg(feature = "metrics")]
use botdeck_metrics::{counter, oauth as oauth_metrics};

use crate::{
    Error, Result,
    error::Context,
    types::{DiscordUser, Identity, PartialGuild},
};

/// Origin assumed when the request carries none.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authorization-code sign-in against Discord.
pub struct DiscordOAuth {
    settings: OAuthSettings,
    client: reqwest::Client,
}

impl DiscordOAuth {
    #[must_use]
    pub fn new(settings: OAuthSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    /// The configured redirect URI, else `{origin}/auth/callback`.
    #[must_use]
    pub fn redirect_uri(&self, origin: Option<&str>) -> String {
        if let Some(uri) = self.settings.redirect_uri.as_deref().filter(|u| !u.is_empty()) {
            return uri.to_string();
        }
        let origin = origin
            .filter(|o| !o.is_empty())
            .unwrap_or(DEFAULT_ORIGIN)
            .trim_end_matches('/');
        format!("{origin}/auth/callback")
    }

    /// URL that sends the operator to Discord's consent screen.
    pub fn authorize_url(&self, origin: Option<&str>) -> Result<String> {
        let client_id = self
            .settings
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(Error::NotConfigured {
                missing: "client_id",
            })?;

        let mut url = Url::parse(&self.settings.authorize_url).context("invalid authorize_url")?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", &self.redirect_uri(origin))
            .append_pair("response_type", "code")
            .append_pair("scope", &self.settings.scopes.join(" "));
        Ok(url.to_string())
    }

    /// Trade an authorization code for the operator's identity.
    ///
    /// The user lookup is required; the guild list is best-effort and comes
    /// back empty when Discord refuses it.
    pub async fn exchange(&self, code: &str, origin: Option<&str>) -> Result<Identity> {
        #[cfg(feature = "metrics")]
        counter!(oauth_metrics::CODE_EXCHANGE_TOTAL).increment(1);

        let result = self.exchange_inner(code, origin).await;

        #[cfg(feature = "metrics")]
        if result.is_err() {
            counter!(oauth_metrics::CODE_EXCHANGE_ERRORS_TOTAL).increment(1);
        }

        result
    }

    async fn exchange_inner(&self, code: &str, origin: Option<&str>) -> Result<Identity> {
        let (client_id, client_secret) = self.credentials()?;
        let redirect_uri = self.redirect_uri(origin);
        debug!(%redirect_uri, "exchanging authorization code");

        let resp = self
            .client
            .post(&self.settings.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret.expose_secret().as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let details = resp.json().await.unwrap_or(serde_json::Value::Null);
            warn!(status = status.as_u16(), "discord token exchange failed");
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                details,
            });
        }
        let token: TokenResponse = resp
            .json()
            .await
            .context("decode discord token response")?;
        let access_token = Secret::new(token.access_token);

        let resp = self
            .client
            .get(self.api_url("/users/@me"))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let details = resp.json().await.unwrap_or(serde_json::Value::Null);
            warn!(status = status.as_u16(), "discord user lookup failed");
            return Err(Error::UserLookup {
                status: status.as_u16(),
                details,
            });
        }
        let user: DiscordUser = resp.json().await.context("decode discord user")?;
        info!(user = %user.username, "discord user signed in");

        let guilds = self.fetch_guilds(&access_token).await;
        Ok(Identity {
            user,
            guilds,
            access_token,
        })
    }

    async fn fetch_guilds(&self, access_token: &Secret<String>) -> Vec<PartialGuild> {
        let result = async {
            self.client
                .get(self.api_url("/users/@me/guilds"))
                .bearer_auth(access_token.expose_secret())
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<PartialGuild>>()
                .await
        }
        .await;
        result.unwrap_or_else(|err| {
            warn!(error = %err, "failed to get guilds (non-critical)");
            Vec::new()
        })
    }

    fn credentials(&self) -> Result<(&str, &Secret<String>)> {
        let client_id = self
            .settings
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(Error::NotConfigured {
                missing: "client_id",
            })?;
        let secret = self
            .settings
            .client_secret
            .as_ref()
            .filter(|s| !s.expose_secret().is_empty())
            .ok_or(Error::NotConfigured {
                missing: "client_secret",
            })?;
        Ok((client_id, secret))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.api_base.trim_end_matches('/'))
    }
}
