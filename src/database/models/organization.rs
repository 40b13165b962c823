use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const SUBSCRIPTION_PLANS: &[&str] = &["free", "starter", "professional", "enterprise"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_plan: String,
    pub max_users: i32,
    pub max_apis: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_plan")]
    pub subscription_plan: String,
    #[serde(default = "default_max_users")]
    pub max_users: i32,
    #[serde(default = "default_max_apis")]
    pub max_apis: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub subscription_plan: Option<String>,
    pub max_users: Option<i32>,
    pub max_apis: Option<i32>,
    pub is_active: Option<bool>,
}

fn default_plan() -> String {
    "free".to_string()
}

fn default_max_users() -> i32 {
    5
}

fn default_max_apis() -> i32 {
    10
}

impl Organization {
    /// Active organization on the default plan
    pub fn new(id: Uuid, name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            subscription_plan: default_plan(),
            max_users: default_max_users(),
            max_apis: default_max_apis(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_new(new: NewOrganization) -> Self {
        Self {
            subscription_plan: new.subscription_plan,
            max_users: new.max_users,
            max_apis: new.max_apis,
            ..Self::new(Uuid::new_v4(), new.name, new.slug)
        }
    }

    pub fn apply(&mut self, patch: &OrganizationPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(plan) = &patch.subscription_plan {
            self.subscription_plan = plan.clone();
        }
        if let Some(max_users) = patch.max_users {
            self.max_users = max_users;
        }
        if let Some(max_apis) = patch.max_apis {
            self.max_apis = max_apis;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}
