use crate::schema::{DocumentTypeConfig, FieldRegistry, FieldType};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads document-type configs laid out as `<projects_dir>/<project>/<name>.yaml`.
pub struct DocumentTypeLoader {
    projects_dir: PathBuf,
}

impl DocumentTypeLoader {
    pub fn new(projects_dir: impl AsRef<Path>) -> Self {
        Self {
            projects_dir: projects_dir.as_ref().to_path_buf(),
        }
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    pub fn load_all(&self) -> Result<Vec<DocumentTypeConfig>> {
        if !self.projects_dir.exists() {
            return Err(Error::Config(format!(
                "Projects directory does not exist: {}",
                self.projects_dir.display()
            )));
        }

        let mut configs = Vec::new();
        let mut projects: Vec<_> = fs::read_dir(&self.projects_dir)?
            .collect::<std::io::Result<Vec<_>>>()?;
        projects.sort_by_key(|e| e.file_name());

        for project in projects {
            if !project.file_type()?.is_dir() {
                continue;
            }
            let project_id = project.file_name().to_string_lossy().to_string();
            let mut entries: Vec<_> =
                fs::read_dir(project.path())?.collect::<std::io::Result<Vec<_>>>()?;
            entries.sort_by_key(|e| e.file_name());

            for entry in entries {
                let path = entry.path();
                if !matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                ) {
                    continue;
                }
                let mut config = Self::load_document_type(&path)?;
                config.project = project_id.clone();
                configs.push(config);
            }
        }

        Ok(configs)
    }

    pub fn load_document_type(path: &Path) -> Result<DocumentTypeConfig> {
        let content = fs::read_to_string(path)?;
        let config: DocumentTypeConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Lint a single config and return a list of human-readable issues (empty = ok)
    pub fn lint(config: &DocumentTypeConfig) -> Vec<String> {
        let mut issues = Vec::new();
        if config.index.trim().is_empty() {
            issues.push("index must be set".to_string());
        }
        if config.fields.is_empty() {
            issues.push("fields should have at least one field defined".to_string());
        }

        let registry = match FieldRegistry::new(config.clone()) {
            Ok(r) => r,
            Err(e) => {
                issues.push(e.to_string());
                return issues;
            }
        };

        for field in registry.fields() {
            let path = field.es_path;
            // Every dotted parent should be declared so nesting can be detected
            for (i, _) in path.match_indices('.') {
                let parent = &path[..i];
                match registry.get_by_path(parent) {
                    Some(p) if p.field_type().is_container() => {}
                    Some(p) => issues.push(format!(
                        "field '{}' lives under '{}' which is a {} field, not an object",
                        field.name(),
                        parent,
                        p.field_type()
                    )),
                    None => issues.push(format!(
                        "field '{}': parent path '{}' is not declared; nesting cannot be detected",
                        field.name(),
                        parent
                    )),
                }
            }
            if field.spec.display_values.is_some() && field.field_type().is_container() {
                issues.push(format!(
                    "field '{}' is a {} container and cannot carry display values",
                    field.name(),
                    field.field_type()
                ));
            }
        }

        for sort in &config.default_sort {
            match registry.get(&sort.field) {
                Some(f) if f.field_type() == FieldType::Text => issues.push(format!(
                    "default sort field '{}' is a text field and cannot be sorted",
                    sort.field
                )),
                Some(f) if f.field_type().is_container() => issues.push(format!(
                    "default sort field '{}' is a container",
                    sort.field
                )),
                Some(_) => {}
                None => issues.push(format!("default sort field '{}' is not declared", sort.field)),
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use tempfile::TempDir;

    #[test]
    fn test_load_document_types_from_directory() -> Result<()> {
        let temp = TempDir::new()?;
        let project_dir = temp.path().join("demo");
        fs::create_dir_all(&project_dir)?;
        fs::write(
            project_dir.join("models.yaml"),
            r#"
name: models
index: models_v1
fields:
  - name: status
    type: keyword
  - name: age
    type: long
"#,
        )?;
        fs::write(project_dir.join("README.md"), "not a config")?;

        let loader = DocumentTypeLoader::new(temp.path());
        let configs = loader.load_all()?;

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].project, "demo");
        assert_eq!(configs[0].index, "models_v1");
        assert_eq!(configs[0].fields.len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let loader = DocumentTypeLoader::new("/definitely/not/here");
        assert_eq!(loader.load_all().unwrap_err().kind(), "config");
    }

    #[test]
    fn test_lint_reports_undeclared_parent_and_bad_sort() {
        let config = DocumentTypeConfig {
            name: "cases".to_string(),
            project: "demo".to_string(),
            index: "cases".to_string(),
            fields: vec![
                FieldSpec::new("donors__age", FieldType::Long),
                FieldSpec::new("title", FieldType::Text),
            ],
            default_sort: vec![crate::schema::SortField::new(
                "title",
                crate::schema::SortDirection::Asc,
            )],
            id_field: "_id".to_string(),
        };
        let issues = DocumentTypeLoader::lint(&config);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("parent path 'donors'"));
        assert!(issues[1].contains("text field"));
    }
}
