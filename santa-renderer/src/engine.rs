//! Tera rendering engine — [`ReplyKind`] enum and [`Renderer`].
//!
//! # Template map
//!
//! | Reply              | Template                   |
//! |--------------------|----------------------------|
//! | Names              | `names.tera`               |
//! | NoNames            | `no_names.tera`            |
//! | Proposed           | `proposed.tera`            |
//! | AlreadyYours       | `already_yours.tera`       |
//! | Confirmed          | `confirmed.tera`           |
//! | Reciprocal         | `reciprocal.tera`          |
//! | Exhausted          | `exhausted.tera`           |
//! | Cancelled          | `cancelled.tera`           |
//! | Task               | `task.tera`                |
//! | NotAssigned        | `not_assigned.tera`        |
//! | NoTask             | `no_task.tera`             |
//! | Error              | `error.tera`               |
//! | PersistenceWarning | `persistence_warning.tera` |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use santa_core::ParticipantName;
use santa_exchange::{
    Allocation, AssignmentView, Cancelled, Confirmed, ExchangeError, ProposeOutcome,
};

use crate::context::ReplyContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates — baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("names.tera", include_str!("templates/names.tera")),
    ("no_names.tera", include_str!("templates/no_names.tera")),
    ("proposed.tera", include_str!("templates/proposed.tera")),
    ("already_yours.tera", include_str!("templates/already_yours.tera")),
    ("confirmed.tera", include_str!("templates/confirmed.tera")),
    ("reciprocal.tera", include_str!("templates/reciprocal.tera")),
    ("exhausted.tera", include_str!("templates/exhausted.tera")),
    ("cancelled.tera", include_str!("templates/cancelled.tera")),
    ("task.tera", include_str!("templates/task.tera")),
    ("not_assigned.tera", include_str!("templates/not_assigned.tera")),
    ("no_task.tera", include_str!("templates/no_task.tera")),
    ("error.tera", include_str!("templates/error.tera")),
    (
        "persistence_warning.tera",
        include_str!("templates/persistence_warning.tera"),
    ),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ReplyKind
// ---------------------------------------------------------------------------

/// Every reply the transport can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    Names,
    NoNames,
    Proposed,
    AlreadyYours,
    Confirmed,
    Reciprocal,
    Exhausted,
    Cancelled,
    Task,
    NotAssigned,
    NoTask,
    Error,
    PersistenceWarning,
}

impl ReplyKind {
    /// All reply variants in a stable order.
    pub fn all() -> &'static [ReplyKind] {
        &[
            ReplyKind::Names,
            ReplyKind::NoNames,
            ReplyKind::Proposed,
            ReplyKind::AlreadyYours,
            ReplyKind::Confirmed,
            ReplyKind::Reciprocal,
            ReplyKind::Exhausted,
            ReplyKind::Cancelled,
            ReplyKind::Task,
            ReplyKind::NotAssigned,
            ReplyKind::NoTask,
            ReplyKind::Error,
            ReplyKind::PersistenceWarning,
        ]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            ReplyKind::Names              => "names.tera",
            ReplyKind::NoNames            => "no_names.tera",
            ReplyKind::Proposed           => "proposed.tera",
            ReplyKind::AlreadyYours       => "already_yours.tera",
            ReplyKind::Confirmed          => "confirmed.tera",
            ReplyKind::Reciprocal         => "reciprocal.tera",
            ReplyKind::Exhausted          => "exhausted.tera",
            ReplyKind::Cancelled          => "cancelled.tera",
            ReplyKind::Task               => "task.tera",
            ReplyKind::NotAssigned        => "not_assigned.tera",
            ReplyKind::NoTask             => "no_task.tera",
            ReplyKind::Error              => "error.tera",
            ReplyKind::PersistenceWarning => "persistence_warning.tera",
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that override embedded defaults.
/// Template names are normalised to lowercase.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render one reply. Output is LF-only with trailing whitespace trimmed.
    pub fn render(&self, kind: ReplyKind, ctx: &ReplyContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(kind.template_name(), &tera_ctx)?;
        Ok(rendered.replace("\r\n", "\n").trim_end().to_string())
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Maps workflow outcomes onto reply templates. Create once and reuse.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(None)? })
    }

    /// Embedded templates overridden by any `.tera` files in `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(Some(dir))? })
    }

    pub fn names(&self, names: &[ParticipantName]) -> Result<String, RenderError> {
        if names.is_empty() {
            return self.engine.render(ReplyKind::NoNames, &ReplyContext::default());
        }
        self.engine.render(ReplyKind::Names, &ReplyContext::for_names(names))
    }

    pub fn proposal(&self, outcome: &ProposeOutcome) -> Result<String, RenderError> {
        match outcome {
            ProposeOutcome::Proposed { name } => {
                self.engine.render(ReplyKind::Proposed, &ReplyContext::for_name(name))
            }
            ProposeOutcome::AlreadyYours { name, assignment } => self.engine.render(
                ReplyKind::AlreadyYours,
                &ReplyContext::for_name(name).with_assignment(assignment.as_ref()),
            ),
        }
    }

    pub fn confirmed(&self, confirmed: &Confirmed) -> Result<String, RenderError> {
        let ctx = ReplyContext::for_name(&confirmed.name)
            .with_assignment(confirmed.allocation.assignment());
        let kind = match confirmed.allocation {
            Allocation::Assigned(_) => ReplyKind::Confirmed,
            Allocation::Reciprocal(_) => ReplyKind::Reciprocal,
            Allocation::Exhausted { .. } => ReplyKind::Exhausted,
        };
        let mut text = self.engine.render(kind, &ctx)?;
        if confirmed.warning.is_some() {
            text.push('\n');
            text.push_str(&self.warning()?);
        }
        Ok(text)
    }

    pub fn cancelled(&self, cancelled: &Cancelled) -> Result<String, RenderError> {
        self.engine
            .render(ReplyKind::Cancelled, &ReplyContext::for_name(&cancelled.name))
    }

    pub fn assignment(&self, view: &AssignmentView) -> Result<String, RenderError> {
        match view {
            AssignmentView::Assigned { name, assignment } => self.engine.render(
                ReplyKind::Task,
                &ReplyContext::for_name(name).with_assignment(Some(assignment)),
            ),
            AssignmentView::NotAssignedYet { name } => {
                self.engine.render(ReplyKind::NotAssigned, &ReplyContext::for_name(name))
            }
            AssignmentView::NoClaim => self.engine.render(ReplyKind::NoTask, &ReplyContext::default()),
        }
    }

    pub fn error(&self, err: &ExchangeError) -> Result<String, RenderError> {
        self.engine.render(ReplyKind::Error, &ReplyContext::for_error(err))
    }

    pub fn warning(&self) -> Result<String, RenderError> {
        self.engine
            .render(ReplyKind::PersistenceWarning, &ReplyContext::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
