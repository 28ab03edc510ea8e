use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Enumerations ---

/// RiskLevel
///
/// Assessed phishing risk of a tracked website. Stored and serialized with the
/// capitalised names (`"Low"`, `"Medium"`, `"High"`); new entries default to `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum RiskLevel {
    Low,
    Medium,
    #[default]
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Low" => Ok(RiskLevel::Low),
            "Medium" => Ok(RiskLevel::Medium),
            "High" => Ok(RiskLevel::High),
            other => Err(ValidationError::InvalidRiskLevel(other.to_string())),
        }
    }
}

/// Role
///
/// Account role on the `users` collection. Carried for completeness of the
/// user schema; no handler branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

// --- Storage Schemas (Mapped to MongoDB documents) ---

/// UserDocument
///
/// A record of the `users` collection. Websites reference it by `_id` through
/// their `createdBy` field.
///
/// The password is stored exactly as supplied. This service never creates or
/// authenticates users, so it does not hash it either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl UserDocument {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role: Role::default(),
        }
    }
}

/// WebsiteDocument
///
/// A record of the `websites` collection as persisted. Converted into the API
/// shape (`Website`) before leaving the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub is_protected: bool,
    pub date_added: bson::DateTime,
    pub created_by: ObjectId,
}

impl WebsiteDocument {
    /// Builds a fresh document for `owner`, stamping a new id and `dateAdded`.
    pub fn new(website: NewWebsite, owner: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            name: website.name,
            url: website.url,
            risk_level: website.risk_level,
            is_protected: website.is_protected,
            date_added: bson::DateTime::now(),
            created_by: owner,
        }
    }

    /// API shape with `createdBy` left as the raw owner id.
    pub fn into_website(self) -> Website {
        let created_by = CreatedBy::Id(self.created_by.to_hex());
        self.into_website_with(created_by)
    }

    /// API shape with `createdBy` resolved against a map of owner usernames.
    /// A dangling reference resolves to `null`.
    pub fn into_populated(self, owners: &HashMap<ObjectId, String>) -> Website {
        let created_by = match owners.get(&self.created_by) {
            Some(username) => CreatedBy::User(UserSummary {
                id: self.created_by.to_hex(),
                username: username.clone(),
            }),
            None => CreatedBy::Missing,
        };
        self.into_website_with(created_by)
    }

    fn into_website_with(self, created_by: CreatedBy) -> Website {
        Website {
            id: self.id.to_hex(),
            name: self.name,
            url: self.url,
            risk_level: self.risk_level,
            is_protected: self.is_protected,
            date_added: DateTime::<Utc>::from_timestamp_millis(self.date_added.timestamp_millis())
                .unwrap_or_default(),
            created_by,
        }
    }
}

// --- Response Schemas ---

/// Website
///
/// The JSON representation returned by every website endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Website {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub url: String,
    pub risk_level: RiskLevel,
    pub is_protected: bool,
    #[ts(type = "string")]
    pub date_added: DateTime<Utc>,
    /// Owner id on create/update responses, `{_id, username}` on reads.
    #[ts(type = "string | { _id: string, username: string } | null")]
    #[schema(value_type = Object, nullable)]
    pub created_by: CreatedBy,
}

/// CreatedBy
///
/// The owner reference of a website, either unresolved (an id string) or
/// resolved to the owning user's summary. `Missing` serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedBy {
    Id(String),
    User(UserSummary),
    Missing,
}

/// UserSummary
///
/// The owner projection used when resolving `createdBy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
}

/// MessageResponse
///
/// The `{"msg": "..."}` body used for confirmations and every error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreateWebsiteRequest
///
/// Body of `POST /websites`. Every field is optional at the wire level so that
/// presence can be checked explicitly by `NewWebsite::try_from`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateWebsiteRequest {
    #[schema(example = "Example")]
    pub name: Option<String>,
    #[schema(example = "http://example.com")]
    pub url: Option<String>,
    #[schema(example = "High")]
    pub risk_level: Option<String>,
    pub is_protected: Option<bool>,
}

/// UpdateWebsiteRequest
///
/// Partial update body of `PUT /websites/{id}`. Omitted fields keep their
/// stored values.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateWebsiteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_protected: Option<bool>,
}

// --- Validated Domain Inputs ---

/// ValidationError
///
/// Schema violations detected before a write reaches the store.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("`{0}` is required")]
    MissingField(&'static str),
    #[error("`{0}` is not a valid risk level (expected Low, Medium or High)")]
    InvalidRiskLevel(String),
}

/// NewWebsite
///
/// A create request that passed the schema checks, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebsite {
    pub name: String,
    pub url: String,
    pub risk_level: RiskLevel,
    pub is_protected: bool,
}

impl TryFrom<CreateWebsiteRequest> for NewWebsite {
    type Error = ValidationError;

    fn try_from(req: CreateWebsiteRequest) -> Result<Self, Self::Error> {
        let name = non_empty(req.name).ok_or(ValidationError::MissingField("name"))?;
        let url = non_empty(req.url).ok_or(ValidationError::MissingField("url"))?;
        let risk_level = match non_empty(req.risk_level) {
            Some(level) => level.parse()?,
            None => RiskLevel::default(),
        };

        Ok(Self {
            name,
            url,
            risk_level,
            is_protected: req.is_protected.unwrap_or(false),
        })
    }
}

/// WebsiteChanges
///
/// The set of fields a partial update actually touches. Empty strings are
/// treated as "not supplied"; `isProtected` applies whenever present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WebsiteChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub is_protected: Option<bool>,
}

impl WebsiteChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.url.is_none()
            && self.risk_level.is_none()
            && self.is_protected.is_none()
    }

    /// Applies the supplied fields onto a stored document in place.
    pub fn apply_to(&self, website: &mut WebsiteDocument) {
        if let Some(name) = &self.name {
            website.name = name.clone();
        }
        if let Some(url) = &self.url {
            website.url = url.clone();
        }
        if let Some(risk_level) = self.risk_level {
            website.risk_level = risk_level;
        }
        if let Some(is_protected) = self.is_protected {
            website.is_protected = is_protected;
        }
    }

    /// The `$set` document for a MongoDB update.
    pub fn to_set_document(&self) -> bson::Document {
        let mut set = bson::Document::new();
        if let Some(name) = &self.name {
            set.insert("name", name.as_str());
        }
        if let Some(url) = &self.url {
            set.insert("url", url.as_str());
        }
        if let Some(risk_level) = self.risk_level {
            set.insert("riskLevel", risk_level.as_str());
        }
        if let Some(is_protected) = self.is_protected {
            set.insert("isProtected", is_protected);
        }
        set
    }
}

impl TryFrom<UpdateWebsiteRequest> for WebsiteChanges {
    type Error = ValidationError;

    fn try_from(req: UpdateWebsiteRequest) -> Result<Self, Self::Error> {
        let risk_level = non_empty(req.risk_level)
            .map(|level| level.parse::<RiskLevel>())
            .transpose()?;

        Ok(Self {
            name: non_empty(req.name),
            url: non_empty(req.url),
            risk_level,
            is_protected: req.is_protected,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
