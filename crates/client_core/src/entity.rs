//! Editable content model shared by blog posts, projects and the profile.

use chrono::{DateTime, Utc};
use shared::{
    domain::{ContentKind, EntityId},
    protocol::{BlogPostRecord, ContentRecord, ExperienceRecord, ProfileRecord, ProjectRecord},
};

use crate::error::DraftError;

pub type Experience = ExperienceRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogMetadata {
    pub excerpt: String,
    pub tags: Vec<String>,
    pub published: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMetadata {
    /// Rich-text HTML, edited with the same widget as the body.
    pub features: String,
    pub stack: String,
    pub repo_url: String,
    pub live_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileMetadata {
    pub headline: String,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
}

/// Per-kind fields the workflow carries without interpreting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    BlogPost(BlogMetadata),
    Project(ProjectMetadata),
    Profile(ProfileMetadata),
}

impl Metadata {
    pub fn empty(kind: ContentKind) -> Self {
        match kind {
            ContentKind::BlogPost => Metadata::BlogPost(BlogMetadata::default()),
            ContentKind::Project => Metadata::Project(ProjectMetadata::default()),
            ContentKind::Profile => Metadata::Profile(ProfileMetadata::default()),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Metadata::BlogPost(_) => ContentKind::BlogPost,
            Metadata::Project(_) => ContentKind::Project,
            Metadata::Profile(_) => ContentKind::Profile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: Option<EntityId>,
    /// Display title; the profile keeps its person name here.
    pub title: String,
    pub slug: String,
    /// Rich-text HTML as produced by the editor widget.
    pub body: String,
    pub image: Option<String>,
    pub metadata: Metadata,
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity {
    pub fn empty(kind: ContentKind) -> Self {
        Self {
            id: None,
            title: String::new(),
            slug: String::new(),
            body: String::new(),
            image: None,
            metadata: Metadata::empty(kind),
            created_at: None,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.metadata.kind()
    }

    pub fn from_record(record: ContentRecord) -> Self {
        match record {
            ContentRecord::BlogPost(blog) => Self {
                id: blog.id,
                title: blog.title,
                slug: blog.slug,
                body: blog.content,
                image: non_empty(blog.image),
                metadata: Metadata::BlogPost(BlogMetadata {
                    excerpt: blog.excerpt,
                    tags: blog.tags,
                    published: blog.published,
                }),
                created_at: blog.created_at,
            },
            ContentRecord::Project(project) => Self {
                id: project.id,
                title: project.title,
                slug: project.slug,
                body: project.description,
                image: non_empty(project.image),
                metadata: Metadata::Project(ProjectMetadata {
                    features: project.features,
                    stack: project.stack,
                    repo_url: project.repo_url,
                    live_url: project.live_url,
                }),
                created_at: project.created_at,
            },
            ContentRecord::Profile(profile) => Self {
                id: profile.id,
                title: profile.name,
                slug: String::new(),
                body: profile.bio,
                image: non_empty(profile.image),
                metadata: Metadata::Profile(ProfileMetadata {
                    headline: profile.title,
                    skills: profile.skills,
                    experience: profile.experience,
                }),
                created_at: profile.created_at,
            },
        }
    }

    /// Request body for create and update: the entity's fields without `_id`
    /// or server timestamps.
    pub fn to_request_record(&self) -> ContentRecord {
        match &self.metadata {
            Metadata::BlogPost(meta) => ContentRecord::BlogPost(BlogPostRecord {
                id: None,
                title: self.title.clone(),
                slug: self.slug.clone(),
                content: self.body.clone(),
                excerpt: meta.excerpt.clone(),
                tags: meta.tags.clone(),
                published: meta.published,
                image: self.image.clone(),
                created_at: None,
            }),
            Metadata::Project(meta) => ContentRecord::Project(ProjectRecord {
                id: None,
                title: self.title.clone(),
                slug: self.slug.clone(),
                description: self.body.clone(),
                features: meta.features.clone(),
                stack: meta.stack.clone(),
                repo_url: meta.repo_url.clone(),
                live_url: meta.live_url.clone(),
                image: self.image.clone(),
                created_at: None,
            }),
            Metadata::Profile(meta) => ContentRecord::Profile(ProfileRecord {
                id: None,
                name: self.title.clone(),
                title: meta.headline.clone(),
                bio: self.body.clone(),
                skills: meta.skills.clone(),
                experience: meta.experience.clone(),
                image: self.image.clone(),
                created_at: None,
            }),
        }
    }

    /// Trims list entries and drops blank ones, the way the forms submit
    /// comma separated tags and skills.
    pub fn normalize_lists(&mut self) {
        match &mut self.metadata {
            Metadata::BlogPost(meta) => meta.tags = normalize_list(&meta.tags),
            Metadata::Profile(meta) => meta.skills = normalize_list(&meta.skills),
            Metadata::Project(_) => {}
        }
    }
}

/// One operator edit. Title, slug and body exist on every kind; the rest
/// only on the kind named in the comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Title(String),
    Slug(String),
    Body(String),
    // blog post
    Excerpt(String),
    Tags(Vec<String>),
    Published(bool),
    // project
    Features(String),
    Stack(String),
    RepoUrl(String),
    LiveUrl(String),
    // profile
    Headline(String),
    Skills(Vec<String>),
    Experience(Vec<Experience>),
}

impl FieldEdit {
    pub fn name(&self) -> &'static str {
        match self {
            FieldEdit::Title(_) => "title",
            FieldEdit::Slug(_) => "slug",
            FieldEdit::Body(_) => "body",
            FieldEdit::Excerpt(_) => "excerpt",
            FieldEdit::Tags(_) => "tags",
            FieldEdit::Published(_) => "published",
            FieldEdit::Features(_) => "features",
            FieldEdit::Stack(_) => "stack",
            FieldEdit::RepoUrl(_) => "repo url",
            FieldEdit::LiveUrl(_) => "live url",
            FieldEdit::Headline(_) => "headline",
            FieldEdit::Skills(_) => "skills",
            FieldEdit::Experience(_) => "experience",
        }
    }

    /// Writes the edit into `entity`. Slug derivation is the caller's job.
    pub(crate) fn apply(self, entity: &mut Entity) -> Result<(), DraftError> {
        let kind = entity.kind();
        let not_applicable = |field: &'static str| DraftError::FieldNotApplicable { field, kind };

        match (self, &mut entity.metadata) {
            (FieldEdit::Title(value), _) => entity.title = value,
            (FieldEdit::Slug(value), _) if kind.uses_slug() => entity.slug = value,
            (FieldEdit::Body(value), _) => entity.body = value,
            (FieldEdit::Excerpt(value), Metadata::BlogPost(meta)) => meta.excerpt = value,
            (FieldEdit::Tags(value), Metadata::BlogPost(meta)) => meta.tags = value,
            (FieldEdit::Published(value), Metadata::BlogPost(meta)) => meta.published = value,
            (FieldEdit::Features(value), Metadata::Project(meta)) => meta.features = value,
            (FieldEdit::Stack(value), Metadata::Project(meta)) => meta.stack = value,
            (FieldEdit::RepoUrl(value), Metadata::Project(meta)) => meta.repo_url = value,
            (FieldEdit::LiveUrl(value), Metadata::Project(meta)) => meta.live_url = value,
            (FieldEdit::Headline(value), Metadata::Profile(meta)) => meta.headline = value,
            (FieldEdit::Skills(value), Metadata::Profile(meta)) => meta.skills = value,
            (FieldEdit::Experience(value), Metadata::Profile(meta)) => meta.experience = value,
            (edit, _) => return Err(not_applicable(edit.name())),
        }
        Ok(())
    }
}

/// Splits a comma separated form value ("rust, web ,") into trimmed,
/// non-empty entries.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_list(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

const MEDIA_TAGS: [&str; 8] = [
    "img", "iframe", "video", "audio", "embed", "object", "picture", "svg",
];

/// True when the editor HTML has neither visible text nor embedded media,
/// e.g. `<p><br></p>`.
pub fn is_blank_html(html: &str) -> bool {
    let mut tag: Option<String> = None;
    let mut text = String::new();
    for ch in html.chars() {
        match tag.as_mut() {
            None if ch == '<' => tag = Some(String::new()),
            None => text.push(ch),
            Some(name) if ch == '>' => {
                if is_media_tag(name) {
                    return false;
                }
                tag = None;
            }
            Some(name) => name.push(ch),
        }
    }
    text.replace("&nbsp;", " ").trim().is_empty()
}

fn is_media_tag(tag: &str) -> bool {
    let name = tag
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default();
    MEDIA_TAGS.iter().any(|media| media.eq_ignore_ascii_case(name))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/entity_tests.rs"]
mod tests;
