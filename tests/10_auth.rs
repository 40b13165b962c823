mod common;

use anyhow::Result;
use reqwest::StatusCode;

use common::{spawn_server, MEMBER, NEWCOMER};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = spawn_server().await?;

    let (status, body) = server.get("/health", None).await?;

    assert_eq!(status, StatusCode::OK, "unexpected status: {}", status);
    assert_eq!(body["data"]["status"], "ok", "body: {}", body);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let server = spawn_server().await?;

    let (status, body) = server.get("/api/auth/permissions", None).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED", "body: {}", body);
    Ok(())
}

#[tokio::test]
async fn invalid_token_is_rejected() -> Result<()> {
    let server = spawn_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/api/auth/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn whoami_returns_caller_and_profile() -> Result<()> {
    let server = spawn_server().await?;

    let (status, body) = server.get("/api/auth/whoami", Some(MEMBER)).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["userId"], MEMBER.to_string());
    assert_eq!(body["data"]["profile"]["id"], MEMBER.to_string());
    Ok(())
}

#[tokio::test]
async fn whoami_works_without_role_assignments() -> Result<()> {
    let server = spawn_server().await?;

    let (status, body) = server.get("/api/auth/whoami", Some(NEWCOMER)).await?;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    Ok(())
}
