mod config;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    entity::parse_list, slug, AlwaysConfirm, AuthClient, Confirm, ContentView, Credentials,
    DeleteOutcome, Entity, FieldEdit, HttpContentApi, ImageFile, ImageUploadPipeline, Metadata,
    UploadApplied,
};
use shared::domain::{ContentKind, EntityId};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "cms", about = "Manage blog posts, projects and the profile")]
struct Cli {
    /// Config file; defaults to ./cms.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    /// Bearer token for write operations.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        kind: ContentKind,
        /// Include unpublished entries.
        #[arg(long)]
        all: bool,
    },
    Create {
        kind: ContentKind,
        #[command(flatten)]
        fields: FieldArgs,
    },
    Edit {
        kind: ContentKind,
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    Delete {
        kind: ContentKind,
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    Upload {
        path: PathBuf,
    },
    Slug {
        title: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Whoami,
}

#[derive(Args, Debug, Default, Clone)]
struct FieldArgs {
    /// Title, or the person's name for the profile.
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    slug: Option<String>,
    /// HTML body (content, description or bio).
    #[arg(long)]
    body: Option<String>,
    #[arg(long, conflicts_with = "body")]
    body_file: Option<PathBuf>,
    #[arg(long)]
    excerpt: Option<String>,
    /// Comma separated.
    #[arg(long)]
    tags: Option<String>,
    #[arg(long)]
    published: Option<bool>,
    #[arg(long)]
    features: Option<String>,
    #[arg(long)]
    stack: Option<String>,
    #[arg(long)]
    repo_url: Option<String>,
    #[arg(long)]
    live_url: Option<String>,
    /// Job title shown under the profile name.
    #[arg(long)]
    headline: Option<String>,
    /// Comma separated.
    #[arg(long)]
    skills: Option<String>,
    #[arg(long)]
    image: Option<PathBuf>,
}

impl FieldArgs {
    /// Edits in form order; title before slug so an explicit slug wins.
    fn edits(&self, body: Option<String>) -> Vec<FieldEdit> {
        let mut edits = Vec::new();
        if let Some(v) = &self.title {
            edits.push(FieldEdit::Title(v.clone()));
        }
        if let Some(v) = &self.slug {
            edits.push(FieldEdit::Slug(v.clone()));
        }
        if let Some(v) = body.or_else(|| self.body.clone()) {
            edits.push(FieldEdit::Body(v));
        }
        if let Some(v) = &self.excerpt {
            edits.push(FieldEdit::Excerpt(v.clone()));
        }
        if let Some(v) = &self.tags {
            edits.push(FieldEdit::Tags(parse_list(v)));
        }
        if let Some(v) = self.published {
            edits.push(FieldEdit::Published(v));
        }
        if let Some(v) = &self.features {
            edits.push(FieldEdit::Features(v.clone()));
        }
        if let Some(v) = &self.stack {
            edits.push(FieldEdit::Stack(v.clone()));
        }
        if let Some(v) = &self.repo_url {
            edits.push(FieldEdit::RepoUrl(v.clone()));
        }
        if let Some(v) = &self.live_url {
            edits.push(FieldEdit::LiveUrl(v.clone()));
        }
        if let Some(v) = &self.headline {
            edits.push(FieldEdit::Headline(v.clone()));
        }
        if let Some(v) = &self.skills {
            edits.push(FieldEdit::Skills(parse_list(v)));
        }
        edits
    }
}

/// Asks on the terminal; anything but `y`/`yes` declines.
struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm_delete(&self, kind: ContentKind, id: &EntityId) -> bool {
        print!("Delete {kind} {id}? This cannot be undone [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(token) = cli.token {
        settings.token = Some(token);
    }

    run(cli.command, &settings).await
}

async fn run(command: Command, settings: &Settings) -> Result<()> {
    let http = reqwest::Client::new();
    match command {
        Command::Slug { title } => println!("{}", slug::generate(&title)),
        Command::List { kind, all } => {
            let mut view = content_view(kind, settings, &http)?;
            view.refresh(all).await?;
            if view.store().is_empty() {
                println!("no {kind} entries");
            }
            for entity in view.store().iter() {
                println!("{}", summary_line(entity));
            }
        }
        Command::Create { kind, fields } => {
            let mut view = content_view(kind, settings, &http)?;
            view.open_new();
            let saved = fill_and_save(&mut view, &fields).await?;
            println!("created {}", summary_line(&saved));
        }
        Command::Edit { kind, id, fields } => {
            let mut view = content_view(kind, settings, &http)?;
            view.refresh(true).await?;
            view.open_existing(&EntityId::new(id))?;
            let saved = fill_and_save(&mut view, &fields).await?;
            println!("updated {}", summary_line(&saved));
        }
        Command::Delete { kind, id, yes } => {
            let mut view = content_view(kind, settings, &http)?;
            view.refresh(true).await?;
            let id = EntityId::new(id);
            let confirm: &dyn Confirm = if yes { &AlwaysConfirm } else { &PromptConfirm };
            match view.delete(&id, confirm).await? {
                DeleteOutcome::Deleted => println!("deleted {kind} {id}"),
                DeleteOutcome::Cancelled => println!("cancelled"),
            }
        }
        Command::Upload { path } => {
            let file = ImageFile::from_path(&path).await?;
            let (pipeline, _resolutions) =
                ImageUploadPipeline::new(settings.image_host(http)?, settings.upload_limits());
            let url = pipeline
                .upload(&file)
                .await
                .with_context(|| format!("failed to upload '{}'", path.display()))?;
            println!("{url}");
        }
        Command::Login { email, password } => {
            let auth = AuthClient::new(http, settings.api_base()?);
            let session = auth.login(&email, &password).await?;
            if let Some(operator) = &session.operator {
                info!(email = %operator.email, "authenticated");
            }
            match session.credentials {
                Credentials::Bearer(token) => println!("export CMS_TOKEN='{token}'"),
                Credentials::Cookie(cookie) => println!("export CMS_COOKIE='{cookie}'"),
            }
        }
        Command::Whoami => {
            let Some(credentials) = settings.credentials() else {
                bail!("no credentials configured; run `cms login` and export the result");
            };
            let auth = AuthClient::new(http, settings.api_base()?);
            let operator = auth.me(&credentials).await?;
            match operator.name {
                Some(name) => println!("{name} <{}>", operator.email),
                None => println!("{}", operator.email),
            }
        }
    }
    Ok(())
}

fn content_view(
    kind: ContentKind,
    settings: &Settings,
    http: &reqwest::Client,
) -> Result<ContentView> {
    let api = HttpContentApi::new(http.clone(), settings.api_base()?, settings.session());
    Ok(ContentView::new(
        kind,
        Arc::new(api),
        settings.image_host(http.clone())?,
        settings.upload_limits(),
    ))
}

async fn fill_and_save(view: &mut ContentView, fields: &FieldArgs) -> Result<Entity> {
    let body = match &fields.body_file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read '{}'", path.display()))?,
        ),
        None => None,
    };
    for edit in fields.edits(body) {
        view.set_field(edit)?;
    }

    if let Some(path) = &fields.image {
        let file = ImageFile::from_path(path).await?;
        view.attach_image(file)?;
        match view.wait_for_upload().await {
            Some(UploadApplied::Failed(err)) => {
                return Err(err).with_context(|| format!("failed to upload '{}'", path.display()));
            }
            Some(UploadApplied::Applied(url)) => info!(%url, "image uploaded"),
            _ => {}
        }
    }

    if let Some(draft) = view.draft() {
        let problems = draft.validation_errors();
        if !problems.is_empty() {
            let names: Vec<_> = problems.iter().map(|problem| problem.field_name()).collect();
            bail!("missing required fields: {}", names.join(", "));
        }
    }
    Ok(view.save().await?)
}

fn summary_line(entity: &Entity) -> String {
    let id = entity.id.as_ref().map(EntityId::as_str).unwrap_or("-");
    match &entity.metadata {
        Metadata::BlogPost(meta) => format!(
            "{id}  {:<9}  {}  ({})",
            if meta.published { "published" } else { "draft" },
            entity.title,
            entity.slug
        ),
        Metadata::Project(meta) => {
            format!("{id}  {}  ({})  [{}]", entity.title, entity.slug, meta.stack)
        }
        Metadata::Profile(meta) => format!("{id}  {}  {}", entity.title, meta.headline),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
