#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use api_panel_rust::auth::{generate_jwt, Claims};
use api_panel_rust::config;
use api_panel_rust::database::models::{Organization, Profile, RoleAssignment};
use api_panel_rust::database::{MemoryStore, PanelStore};
use api_panel_rust::handlers;
use api_panel_rust::permissions::Role;
use api_panel_rust::state::AppState;

pub const ORG_1: Uuid = Uuid::from_u128(0x0001);
pub const ORG_2: Uuid = Uuid::from_u128(0x0002);

/// Global SYSTEM_ADMIN
pub const ADMIN: Uuid = Uuid::from_u128(0xA0);
/// Second global SYSTEM_ADMIN, used to check bulk delete protection
pub const OTHER_ADMIN: Uuid = Uuid::from_u128(0xA1);
/// ORG_ADMIN in ORG_1
pub const ORG_ADMIN: Uuid = Uuid::from_u128(0xB0);
/// USER in ORG_1
pub const MEMBER: Uuid = Uuid::from_u128(0xC0);
/// USER in ORG_2
pub const OUTSIDER: Uuid = Uuid::from_u128(0xC1);
/// Profile with no role assignments
pub const NEWCOMER: Uuid = Uuid::from_u128(0xD0);

pub struct TestServer {
    pub base_url: String,
    pub store: MemoryStore,
    client: reqwest::Client,
}

async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_organization(Organization::new(ORG_1, "Org One", "org-one")).await;
    store.insert_organization(Organization::new(ORG_2, "Org Two", "org-two")).await;

    for user in [ADMIN, OTHER_ADMIN, ORG_ADMIN, MEMBER, OUTSIDER, NEWCOMER] {
        store
            .insert_profile(Profile::new(user, format!("{}@example.com", user.simple())))
            .await;
    }

    store.insert_assignment(RoleAssignment::new(ADMIN, Role::SystemAdmin, None)).await;
    store.insert_assignment(RoleAssignment::new(OTHER_ADMIN, Role::SystemAdmin, None)).await;
    store.insert_assignment(RoleAssignment::new(ORG_ADMIN, Role::OrgAdmin, Some(ORG_1))).await;
    store.insert_assignment(RoleAssignment::new(MEMBER, Role::User, Some(ORG_1))).await;
    store.insert_assignment(RoleAssignment::new(OUTSIDER, Role::User, Some(ORG_2))).await;
    store
}

/// Serve the full router over a seeded memory store on an ephemeral port
pub async fn spawn_server() -> Result<TestServer> {
    let store = seeded_store().await;
    let shared: Arc<dyn PanelStore> = Arc::new(store.clone());
    let app = handlers::router(AppState::new(shared, config::config()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let base_url = format!("http://{}", listener.local_addr()?);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        base_url,
        store,
        client: reqwest::Client::new(),
    })
}

pub fn token_for(user: Uuid) -> String {
    generate_jwt(Claims::new(user, Some(format!("{}@example.com", user.simple())))).expect("token")
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(res: reqwest::Response) -> Result<(StatusCode, Value)> {
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, user: Option<Uuid>) -> Result<(StatusCode, Value)> {
        let mut req = self.client.get(self.url(path));
        if let Some(user) = user {
            req = req.bearer_auth(token_for(user));
        }
        Self::read(req.send().await?).await
    }

    pub async fn post(&self, path: &str, user: Uuid, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token_for(user))
            .json(&body)
            .send()
            .await?;
        Self::read(res).await
    }

    pub async fn patch(&self, path: &str, user: Uuid, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .patch(self.url(path))
            .bearer_auth(token_for(user))
            .json(&body)
            .send()
            .await?;
        Self::read(res).await
    }
}
