//! Read side of the study catalog.
//!
//! The catalog is a tree: stage → term → grade → subject, then per subject a
//! set of content options (notes, exams, videos...) each split into
//! sections that finally hold resources. Lookups by name are always scoped
//! to the parent selection, since names like "الفصل الأول" repeat across
//! stages.

use rusqlite::{params, OptionalExtension, Params};
use serde::Serialize;

use super::db::Store;
use crate::error::AppResult;

/// One selectable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
}

/// A study resource (a titled link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub title: String,
    pub url: String,
}

impl Store {
    pub fn stages(&self) -> AppResult<Vec<CatalogItem>> {
        self.items("SELECT id, name FROM stages ORDER BY position, id", [])
    }

    pub fn stage_by_name(&self, name: &str) -> AppResult<Option<CatalogItem>> {
        self.item("SELECT id, name FROM stages WHERE name = ?1", params![name.trim()])
    }

    pub fn terms(&self, stage_id: i64) -> AppResult<Vec<CatalogItem>> {
        self.items(
            "SELECT id, name FROM terms WHERE stage_id = ?1 ORDER BY position, id",
            params![stage_id],
        )
    }

    pub fn term_by_name(&self, stage_id: i64, name: &str) -> AppResult<Option<CatalogItem>> {
        self.item(
            "SELECT id, name FROM terms WHERE stage_id = ?1 AND name = ?2",
            params![stage_id, name.trim()],
        )
    }

    pub fn grades(&self, term_id: i64) -> AppResult<Vec<CatalogItem>> {
        self.items(
            "SELECT id, name FROM grades WHERE term_id = ?1 ORDER BY position, id",
            params![term_id],
        )
    }

    pub fn grade_by_name(&self, term_id: i64, name: &str) -> AppResult<Option<CatalogItem>> {
        self.item(
            "SELECT id, name FROM grades WHERE term_id = ?1 AND name = ?2",
            params![term_id, name.trim()],
        )
    }

    pub fn subjects(&self, grade_id: i64) -> AppResult<Vec<CatalogItem>> {
        self.items(
            "SELECT id, name FROM subjects WHERE grade_id = ?1 ORDER BY position, id",
            params![grade_id],
        )
    }

    pub fn subject_by_name(&self, grade_id: i64, name: &str) -> AppResult<Option<CatalogItem>> {
        self.item(
            "SELECT id, name FROM subjects WHERE grade_id = ?1 AND name = ?2",
            params![grade_id, name.trim()],
        )
    }

    /// Content options offered for a subject.
    pub fn options_for_subject(&self, subject_id: i64) -> AppResult<Vec<CatalogItem>> {
        self.items(
            "SELECT o.id, o.name
             FROM subject_option_map m
             JOIN subject_options o ON o.id = m.option_id
             WHERE m.subject_id = ?1
             ORDER BY m.position, o.id",
            params![subject_id],
        )
    }

    pub fn option_by_name(&self, subject_id: i64, name: &str) -> AppResult<Option<CatalogItem>> {
        self.item(
            "SELECT o.id, o.name
             FROM subject_option_map m
             JOIN subject_options o ON o.id = m.option_id
             WHERE m.subject_id = ?1 AND o.name = ?2",
            params![subject_id, name.trim()],
        )
    }

    /// Sections of `option_id` that exist for `subject_id`.
    pub fn children_for(&self, subject_id: i64, option_id: i64) -> AppResult<Vec<CatalogItem>> {
        self.items(
            "SELECT c.id, c.name
             FROM subject_option_children_map m
             JOIN option_children c ON c.id = m.child_id
             WHERE m.subject_id = ?1 AND c.option_id = ?2
             ORDER BY m.position, c.id",
            params![subject_id, option_id],
        )
    }

    pub fn child_by_name(&self, subject_id: i64, option_id: i64, name: &str) -> AppResult<Option<CatalogItem>> {
        self.item(
            "SELECT c.id, c.name
             FROM subject_option_children_map m
             JOIN option_children c ON c.id = m.child_id
             WHERE m.subject_id = ?1 AND c.option_id = ?2 AND c.name = ?3",
            params![subject_id, option_id, name.trim()],
        )
    }

    pub fn resources(&self, subject_id: i64, option_id: i64, child_id: i64) -> AppResult<Vec<Resource>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT title, url FROM resources
             WHERE subject_id = ?1 AND option_id = ?2 AND child_id = ?3
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![subject_id, option_id, child_id], |row| {
            Ok(Resource {
                title: row.get(0)?,
                url: row.get(1)?,
            })
        })?;

        let mut resources = Vec::new();
        for row in rows {
            resources.push(row?);
        }
        Ok(resources)
    }

    fn items<P: Params>(&self, sql: &str, params: P) -> AppResult<Vec<CatalogItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(CatalogItem {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    fn item<P: Params>(&self, sql: &str, params: P) -> AppResult<Option<CatalogItem>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(sql, params, |row| {
                Ok(CatalogItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?)
    }
}
