//! Catalog seeding from a JSON document.
//!
//! Seeding replaces the whole catalog in one transaction. Chat selections
//! point at catalog row ids, so every chat is sent back to the first step.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use url::Url;

use super::chats::DEFAULT_STATUS;
use super::db::Store;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSeed {
    pub stages: Vec<StageSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSeed {
    pub name: String,
    #[serde(default)]
    pub terms: Vec<TermSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSeed {
    pub name: String,
    #[serde(default)]
    pub grades: Vec<GradeSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSeed {
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<SubjectSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSeed {
    pub name: String,
    #[serde(default)]
    pub options: Vec<OptionSeed>,
}

/// A content option ("مذكرات", "اختبارات", ...) offered for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSeed {
    pub name: String,
    #[serde(default)]
    pub sections: Vec<SectionSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSeed {
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSeed {
    pub title: String,
    pub url: String,
}

/// Row counts written by [`Store::seed_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub stages: usize,
    pub terms: usize,
    pub grades: usize,
    pub subjects: usize,
    pub resources: usize,
    /// Chats sent back to the first step
    pub chats_reset: usize,
}

impl CatalogSeed {
    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        let seed: Self = serde_json::from_str(raw)?;
        seed.validate()?;
        Ok(seed)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Rejects blank names, duplicate siblings and unparsable resource URLs.
    pub fn validate(&self) -> AppResult<()> {
        unique_names("stages", "catalog", self.stages.iter().map(|s| s.name.as_str()))?;
        for stage in &self.stages {
            unique_names("terms", &stage.name, stage.terms.iter().map(|t| t.name.as_str()))?;
            for term in &stage.terms {
                unique_names("grades", &term.name, term.grades.iter().map(|g| g.name.as_str()))?;
                for grade in &term.grades {
                    unique_names("subjects", &grade.name, grade.subjects.iter().map(|s| s.name.as_str()))?;
                    for subject in &grade.subjects {
                        unique_names("options", &subject.name, subject.options.iter().map(|o| o.name.as_str()))?;
                        for option in &subject.options {
                            unique_names("sections", &option.name, option.sections.iter().map(|s| s.name.as_str()))?;
                            for resource in option.sections.iter().flat_map(|s| &s.resources) {
                                if resource.title.trim().is_empty() {
                                    return Err(AppError::Seed(format!("blank resource title under {}", option.name)));
                                }
                                Url::parse(&resource.url).map_err(|e| {
                                    AppError::Seed(format!("invalid url '{}' for '{}': {}", resource.url, resource.title, e))
                                })?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn unique_names<'a>(kind: &str, parent: &str, names: impl Iterator<Item = &'a str>) -> AppResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Seed(format!("blank name among {} of '{}'", kind, parent)));
        }
        if !seen.insert(name) {
            return Err(AppError::Seed(format!("duplicate '{}' among {} of '{}'", name, kind, parent)));
        }
    }
    Ok(())
}

impl Store {
    /// Replaces the catalog with `seed`.
    ///
    /// Either the whole catalog is replaced or nothing changes.
    pub fn seed_catalog(&self, seed: &CatalogSeed) -> AppResult<SeedSummary> {
        seed.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let summary = write_catalog(&tx, seed)?;
        tx.commit()?;

        log::info!(
            "Catalog seeded: {} stages, {} terms, {} grades, {} subjects, {} resources ({} chats reset)",
            summary.stages,
            summary.terms,
            summary.grades,
            summary.subjects,
            summary.resources,
            summary.chats_reset
        );
        Ok(summary)
    }
}

fn write_catalog(tx: &Transaction<'_>, seed: &CatalogSeed) -> rusqlite::Result<SeedSummary> {
    tx.execute_batch(
        "DELETE FROM resources;
         DELETE FROM subject_option_children_map;
         DELETE FROM option_children;
         DELETE FROM subject_option_map;
         DELETE FROM subject_options;
         DELETE FROM subjects;
         DELETE FROM grades;
         DELETE FROM terms;
         DELETE FROM stages;
         DELETE FROM sqlite_sequence WHERE name IN
            ('stages', 'terms', 'grades', 'subjects', 'subject_options', 'option_children', 'resources');",
    )?;

    let mut summary = SeedSummary {
        chats_reset: tx.execute(
            "UPDATE chats SET status = ?1, stage_id = NULL, term_id = NULL, grade_id = NULL,
                subject_id = NULL, option_id = NULL",
            params![DEFAULT_STATUS],
        )?,
        ..SeedSummary::default()
    };

    for (stage_pos, stage) in seed.stages.iter().enumerate() {
        tx.execute(
            "INSERT INTO stages (name, position) VALUES (?1, ?2)",
            params![stage.name.trim(), stage_pos as i64],
        )?;
        let stage_id = tx.last_insert_rowid();
        summary.stages += 1;

        for (term_pos, term) in stage.terms.iter().enumerate() {
            tx.execute(
                "INSERT INTO terms (stage_id, name, position) VALUES (?1, ?2, ?3)",
                params![stage_id, term.name.trim(), term_pos as i64],
            )?;
            let term_id = tx.last_insert_rowid();
            summary.terms += 1;

            for (grade_pos, grade) in term.grades.iter().enumerate() {
                tx.execute(
                    "INSERT INTO grades (term_id, name, position) VALUES (?1, ?2, ?3)",
                    params![term_id, grade.name.trim(), grade_pos as i64],
                )?;
                let grade_id = tx.last_insert_rowid();
                summary.grades += 1;

                for (subject_pos, subject) in grade.subjects.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO subjects (grade_id, name, position) VALUES (?1, ?2, ?3)",
                        params![grade_id, subject.name.trim(), subject_pos as i64],
                    )?;
                    let subject_id = tx.last_insert_rowid();
                    summary.subjects += 1;

                    summary.resources += write_subject_options(tx, subject_id, &subject.options)?;
                }
            }
        }
    }

    Ok(summary)
}

/// Options and sections are shared by name across subjects; the map tables
/// record which ones a subject offers.
fn write_subject_options(tx: &Transaction<'_>, subject_id: i64, options: &[OptionSeed]) -> rusqlite::Result<usize> {
    let mut resources = 0;

    for (option_pos, option) in options.iter().enumerate() {
        tx.execute(
            "INSERT INTO subject_options (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            params![option.name.trim()],
        )?;
        let option_id: i64 = tx.query_row(
            "SELECT id FROM subject_options WHERE name = ?1",
            params![option.name.trim()],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO subject_option_map (subject_id, option_id, position) VALUES (?1, ?2, ?3)",
            params![subject_id, option_id, option_pos as i64],
        )?;

        for (section_pos, section) in option.sections.iter().enumerate() {
            tx.execute(
                "INSERT INTO option_children (option_id, name) VALUES (?1, ?2)
                 ON CONFLICT(option_id, name) DO NOTHING",
                params![option_id, section.name.trim()],
            )?;
            let child_id: i64 = tx.query_row(
                "SELECT id FROM option_children WHERE option_id = ?1 AND name = ?2",
                params![option_id, section.name.trim()],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO subject_option_children_map (subject_id, child_id, position)
                 VALUES (?1, ?2, ?3)",
                params![subject_id, child_id, section_pos as i64],
            )?;

            for resource in &section.resources {
                tx.execute(
                    "INSERT INTO resources (subject_id, option_id, child_id, title, url) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![subject_id, option_id, child_id, resource.title.trim(), resource.url],
                )?;
                resources += 1;
            }
        }
    }

    Ok(resources)
}
