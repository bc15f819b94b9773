use std::fmt;

use super::{string_list, text_or, Entity, FromDocument};
use crate::filter::{Facet, Filterable};
use crate::store::RawDocument;

/// Development status of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectStatus {
    EnDesarrollo,
    Completado,
    EnPausa,
    /// Anything else the store holds, including an absent status.
    Unrecognized(String),
}

/// Badge colour for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Yellow,
    Green,
    Gray,
}

impl ProjectStatus {
    /// Labels of the three known statuses, in selector order.
    pub const ALL: &'static [&'static str] = &["En Desarrollo", "Completado", "En Pausa"];

    pub fn parse(raw: &str) -> Self {
        match raw {
            "En Desarrollo" => ProjectStatus::EnDesarrollo,
            "Completado" => ProjectStatus::Completado,
            "En Pausa" => ProjectStatus::EnPausa,
            other => ProjectStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ProjectStatus::EnDesarrollo => "En Desarrollo",
            ProjectStatus::Completado => "Completado",
            ProjectStatus::EnPausa => "En Pausa",
            ProjectStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn badge(&self) -> BadgeTone {
        match self {
            ProjectStatus::EnDesarrollo => BadgeTone::Yellow,
            ProjectStatus::Completado => BadgeTone::Green,
            _ => BadgeTone::Gray,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ProjectStatus::Unrecognized(_))
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub link: String,
    pub github_url: Option<String>,
    pub tags: Vec<String>,
    pub status: ProjectStatus,
}

impl FromDocument for Project {
    fn from_document(doc: &RawDocument) -> Self {
        let github = text_or(doc, "githubUrl", "");
        Self {
            id: doc.id.clone(),
            title: text_or(doc, "title", ""),
            description: text_or(doc, "description", ""),
            image_url: text_or(doc, "imageUrl", ""),
            link: text_or(doc, "link", ""),
            github_url: (!github.is_empty()).then_some(github),
            tags: string_list(doc, "tags"),
            status: ProjectStatus::parse(&text_or(doc, "status", "")),
        }
    }
}

impl Filterable for Project {
    const FACETS: &'static [Facet] = &[Facet::Tag, Facet::Status];

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn facet_matches(&self, facet: Facet, selected: &str) -> bool {
        match facet {
            Facet::Tag => self.tags.iter().any(|t| t == selected),
            Facet::Status => self.status.is_recognized() && self.status.label() == selected,
            _ => false,
        }
    }

    fn facet_values(&self, facet: Facet) -> Vec<&str> {
        match facet {
            Facet::Tag => self.tags.iter().map(String::as_str).collect(),
            Facet::Status if self.status.is_recognized() => vec![self.status.label()],
            _ => Vec::new(),
        }
    }

    fn fixed_options(facet: Facet) -> Option<&'static [&'static str]> {
        matches!(facet, Facet::Status).then_some(ProjectStatus::ALL)
    }
}

impl Entity for Project {
    const COLLECTION: &'static str = "projects";
    const LOAD_ERROR: &'static str =
        "Error al cargar los proyectos. Por favor, intenta de nuevo más tarde.";
    const EMPTY_MESSAGE: &'static str = "No se encontraron proyectos que coincidan con tu búsqueda.";

    fn id(&self) -> &str {
        &self.id
    }
}
