use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{
    config::ProjectFile,
    manifest::ManifestModel,
    utils::{self, MONODEPLOY_CONFIG_FILENAME},
    MonodeployError, MonodeployResult,
};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Loads the project file of a project.
///
/// ## Arguments
///
/// * `project_dir` - The project directory. Defaults to the current directory.
/// * `project_file` - The name of the project file. Defaults to `monodeploy.yaml`.
///
/// ## Returns
///
/// The parsed project file and the canonical project directory.
pub async fn load_project(
    project_dir: Option<&Path>,
    project_file: Option<&str>,
) -> MonodeployResult<(ProjectFile, PathBuf)> {
    let project_dir = project_dir.unwrap_or_else(|| Path::new("."));
    let project_file = project_file.unwrap_or(MONODEPLOY_CONFIG_FILENAME);
    utils::validate_file_name(project_file)?;

    let full_path = project_dir.join(project_file);
    if !full_path.exists() {
        return Err(MonodeployError::ProjectFileNotFound(
            full_path.display().to_string(),
        ));
    }

    let canonical_project_dir = fs::canonicalize(project_dir).await?;
    let contents = fs::read_to_string(&full_path).await?;
    let project: ProjectFile = serde_yaml::from_str(&contents)?;

    tracing::debug!(path = %full_path.display(), "loaded project file");
    Ok((project, canonical_project_dir))
}

/// Applies the flags set in the project file on top of a composed model.
///
/// Only entries already present in the model are touched.
pub fn apply_declarations(project: &ProjectFile, model: &mut ManifestModel) {
    for declaration in project.get_services() {
        let Some(entry) = model.services.get_mut(declaration.get_name()) else {
            continue;
        };
        if let Some(enabled) = declaration.get_enabled() {
            entry.enabled = *enabled;
        }
        if let Some(archived) = declaration.get_archived() {
            entry.archived = *archived;
        }
        if let Some(template_id) = declaration.get_template_id() {
            entry.template_id = Some(template_id.clone());
        }
        if let Some(comment) = declaration.get_comment() {
            entry.comment = Some(comment.clone());
        }
    }

    for declaration in project.get_storages() {
        let Some(entry) = model.storages.get_mut(declaration.get_name()) else {
            continue;
        };
        if let Some(enabled) = declaration.get_enabled() {
            entry.enabled = *enabled;
        }
        if let Some(archived) = declaration.get_archived() {
            entry.archived = *archived;
        }
        if let Some(template_id) = declaration.get_template_id() {
            entry.template_id = Some(template_id.clone());
        }
    }
}
