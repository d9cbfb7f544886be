// roster-service/src/models/org.rs
use crate::models::Role;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Org {
    pub org_id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Org {
    pub fn summary(&self) -> serde_json::Value {
        json!({
            "id": self.org_id,
            "name": self.name,
            "owner_id": self.owner_id,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrgMember {
    pub org_id: String,
    pub user_id: String,
    pub role: Role,
    pub joined_at: String,
}

// Teams live under an org partition
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Team {
    pub org_id: String,
    pub team_id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TeamMember {
    pub team_id: String,
    pub user_id: String,
    pub role: Role,
    pub joined_at: String,
}
