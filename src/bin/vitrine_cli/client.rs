#![deny(clippy::all, clippy::pedantic)]

use std::fs;

use reqwest::{Client, Response, Url};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use vitrine_api_types::ErrorBody;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("site URL is required (use --site or VITRINE_SITE_URL)")]
    MissingSite,
    #[error("revalidation secret is required (use --secret-file or REVALIDATE_SECRET)")]
    MissingSecret,
    #[error("failed to read secret file: {0}")]
    SecretFile(std::io::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Server(String),
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub base: Url,
    secret: Option<String>,
}

impl Ctx {
    pub fn new(site: &str, secret: Option<String>) -> Result<Self, CliError> {
        let base = Url::parse(site)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self {
            client,
            base,
            secret,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("vitrine-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn secret(&self) -> Result<&str, CliError> {
        self.secret.as_deref().ok_or(CliError::MissingSecret)
    }

    pub fn url(&self, path: &str) -> Result<Url, CliError> {
        self.base.join(path).map_err(CliError::Url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let resp = self.client.get(self.url(path)?).send().await?;
        Self::handle(resp).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        let resp = self.client.post(self.url(path)?).json(body).send().await?;
        Self::handle(resp).await
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, CliError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let detail = match serde_json::from_slice::<ErrorBody>(&bytes) {
                Ok(body) => body.message,
                Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(CliError::Server(format!("status {status}: {detail}")));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| CliError::Server(format!("failed to parse body: {e}")))
    }
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    let site = cli.site.clone().ok_or(CliError::MissingSite)?;
    let secret = if let Some(path) = &cli.secret_file {
        Some(
            fs::read_to_string(path)
                .map_err(CliError::SecretFile)?
                .trim()
                .to_string(),
        )
    } else {
        cli.secret_env.clone()
    };

    Ctx::new(&site, secret)
}
