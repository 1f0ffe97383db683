use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::ModuleId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// A named, ordered collection of lessons; the top-level course unit.
///
/// Modules are ordered within the course by `order_index` and can be hidden
/// from learners without deletion via `is_active`.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    id: ModuleId,
    title: String,
    description: Option<String>,
    image_url: Option<String>,
    materials_url: Option<String>,
    order_index: u32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Module {
    /// Creates a new Module.
    ///
    /// Title and description are trimmed; empty optional fields collapse to
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` if the title is empty or
    /// whitespace-only.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ModuleId,
        title: impl Into<String>,
        description: Option<String>,
        image_url: Option<String>,
        materials_url: Option<String>,
        order_index: u32,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ModuleError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ModuleError::EmptyTitle);
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description: normalize_optional(description),
            image_url: normalize_optional(image_url),
            materials_url: normalize_optional(materials_url),
            order_index,
            is_active,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    #[must_use]
    pub fn materials_url(&self) -> Option<&str> {
        self.materials_url.as_deref()
    }

    /// Position of this module within the course ordering.
    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    /// Whether learners can see this module.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn module_new_rejects_empty_title() {
        let err = Module::new(
            ModuleId::new(1),
            "   ",
            None,
            None,
            None,
            0,
            true,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ModuleError::EmptyTitle);
    }

    #[test]
    fn module_new_happy_path() {
        let module = Module::new(
            ModuleId::new(3),
            "Web Development",
            Some("HTML, CSS and modern frameworks".into()),
            Some("https://img.example.com/web.png".into()),
            None,
            2,
            true,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(module.id(), ModuleId::new(3));
        assert_eq!(module.title(), "Web Development");
        assert_eq!(module.description(), Some("HTML, CSS and modern frameworks"));
        assert_eq!(module.image_url(), Some("https://img.example.com/web.png"));
        assert_eq!(module.materials_url(), None);
        assert_eq!(module.order_index(), 2);
        assert!(module.is_active());
    }

    #[test]
    fn module_trims_title_and_description() {
        let module = Module::new(
            ModuleId::new(1),
            "  Databases  ",
            Some("  SQL basics  ".into()),
            None,
            None,
            0,
            true,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(module.title(), "Databases");
        assert_eq!(module.description(), Some("SQL basics"));
    }

    #[test]
    fn module_filters_blank_optional_fields() {
        let module = Module::new(
            ModuleId::new(1),
            "DevOps",
            Some("   ".into()),
            Some("".into()),
            Some("  ".into()),
            0,
            false,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(module.description(), None);
        assert_eq!(module.image_url(), None);
        assert_eq!(module.materials_url(), None);
        assert!(!module.is_active());
    }
}
