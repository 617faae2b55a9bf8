use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(EntityId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    BlogPost,
    Project,
    Profile,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::BlogPost,
        ContentKind::Project,
        ContentKind::Profile,
    ];

    /// Collection segment under the API base url.
    pub fn path(self) -> &'static str {
        match self {
            ContentKind::BlogPost => "blogs",
            ContentKind::Project => "projects",
            ContentKind::Profile => "about",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentKind::BlogPost => "blog post",
            ContentKind::Project => "project",
            ContentKind::Profile => "profile",
        }
    }

    pub fn uses_slug(self) -> bool {
        !matches!(self, ContentKind::Profile)
    }

    /// The profile lives at a single url: it is read as one object and
    /// saved with `POST` whether or not it already exists.
    pub fn is_singleton(self) -> bool {
        matches!(self, ContentKind::Profile)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content kind '{0}' (expected blogs, projects or about)")]
pub struct UnknownContentKind(pub String);

impl FromStr for ContentKind {
    type Err = UnknownContentKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "blog" | "blogs" | "blog_post" | "post" | "posts" => Ok(ContentKind::BlogPost),
            "project" | "projects" => Ok(ContentKind::Project),
            "about" | "profile" => Ok(ContentKind::Profile),
            other => Err(UnknownContentKind(other.to_string())),
        }
    }
}
