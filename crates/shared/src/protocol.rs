use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ContentKind, EntityId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub stack: String,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub live_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub years: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: String,
    /// Job title shown under the name, not the entity's display title.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A content document as exchanged with the content API. The variant is
/// chosen by the collection the document came from, never by its shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentRecord {
    BlogPost(BlogPostRecord),
    Project(ProjectRecord),
    Profile(ProfileRecord),
}

impl ContentRecord {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentRecord::BlogPost(_) => ContentKind::BlogPost,
            ContentRecord::Project(_) => ContentKind::Project,
            ContentRecord::Profile(_) => ContentKind::Profile,
        }
    }

    pub fn decode(kind: ContentKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ContentKind::BlogPost => ContentRecord::BlogPost(serde_json::from_value(value)?),
            ContentKind::Project => ContentRecord::Project(serde_json::from_value(value)?),
            ContentKind::Profile => ContentRecord::Profile(serde_json::from_value(value)?),
        })
    }

    /// Decodes a collection listing. Singleton collections answer with one
    /// object (or `null`) instead of an array.
    pub fn decode_list(
        kind: ContentKind,
        value: serde_json::Value,
    ) -> serde_json::Result<Vec<Self>> {
        match value {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| ContentRecord::decode(kind, item))
                .collect(),
            single => Ok(vec![ContentRecord::decode(kind, single)?]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUploadResponse {
    #[serde(default)]
    pub secure_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<OperatorSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSummary {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blog_record_uses_mongo_id_and_camel_case() {
        let record = ContentRecord::decode(
            ContentKind::BlogPost,
            json!({
                "_id": "65f0c1",
                "title": "Hello",
                "slug": "hello",
                "content": "<p>hi</p>",
                "published": true,
                "createdAt": "2024-03-01T10:00:00Z"
            }),
        )
        .expect("decode");

        let ContentRecord::BlogPost(blog) = record else {
            panic!("expected blog record");
        };
        assert_eq!(blog.id, Some(EntityId::new("65f0c1")));
        assert!(blog.published);
        assert!(blog.tags.is_empty());
        assert!(blog.created_at.is_some());
    }

    #[test]
    fn new_records_serialize_without_id() {
        let record = ContentRecord::Project(ProjectRecord {
            title: "Site".into(),
            repo_url: "https://example.com/repo".into(),
            ..ProjectRecord::default()
        });
        let value = serde_json::to_value(&record).expect("encode");
        assert!(value.get("_id").is_none());
        assert_eq!(value["repoUrl"], "https://example.com/repo");
    }

    #[test]
    fn singleton_listing_accepts_object_or_null() {
        let one = ContentRecord::decode_list(ContentKind::Profile, json!({"name": "Ada"}))
            .expect("object");
        assert_eq!(one.len(), 1);
        let none = ContentRecord::decode_list(ContentKind::Profile, serde_json::Value::Null)
            .expect("null");
        assert!(none.is_empty());
    }
}
