#![deny(clippy::all, clippy::pedantic)]

use serde::Serialize;

use vitrine_api_types::{
    CacheStatusResponse, HealthResponse, InvalidatePathRequest, InvalidateTagRequest,
    RevalidationResponse,
};

use crate::args::RevalidateCmd;
use crate::client::{CliError, Ctx};

pub async fn revalidate(ctx: &Ctx, cmd: RevalidateCmd) -> Result<RevalidationResponse, CliError> {
    let secret = ctx.secret()?.to_string();
    let response: RevalidationResponse = match cmd {
        RevalidateCmd::Path { path } => {
            let body = InvalidatePathRequest { path, secret };
            ctx.post("/invalidate-by-path", &body).await?
        }
        RevalidateCmd::Tag { tag } => {
            let body = InvalidateTagRequest { tag, secret };
            ctx.post("/invalidate-by-tag", &body).await?
        }
    };
    print_json(&response)?;
    Ok(response)
}

pub async fn status(ctx: &Ctx) -> Result<CacheStatusResponse, CliError> {
    let response: CacheStatusResponse = ctx.get("/_cache").await?;
    print_json(&response)?;
    Ok(response)
}

pub async fn health(ctx: &Ctx) -> Result<HealthResponse, CliError> {
    let response: HealthResponse = ctx.get("/_health").await?;
    print_json(&response)?;
    Ok(response)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Server(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}
