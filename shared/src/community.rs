use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub realm: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub finalized: bool,
}

impl Community {
    /// Members without a community get an empty ID from the backend.
    pub fn is_joined(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Response of `GET /user/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedUser {
    pub battletag: String,
    #[serde(default)]
    pub char: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub community: Community,
}

/// Admin-configured guild rank thresholds, `GET/POST /community/config`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySettings {
    pub officer_rank: u32,
    pub member_rank: u32,
}

/// Body of `POST /community/config`. The backend reads the officer threshold as `adminRank`
/// on write but reports it as `officerRank` on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityRankRequest {
    #[serde(rename = "adminRank")]
    pub officer_rank: u32,
    #[serde(rename = "memberRank")]
    pub member_rank: u32,
}

impl From<CommunitySettings> for CommunityRankRequest {
    fn from(settings: CommunitySettings) -> Self {
        Self {
            officer_rank: settings.officer_rank,
            member_rank: settings.member_rank,
        }
    }
}

impl From<CommunityRankRequest> for CommunitySettings {
    fn from(request: CommunityRankRequest) -> Self {
        Self {
            officer_rank: request.officer_rank,
            member_rank: request.member_rank,
        }
    }
}
