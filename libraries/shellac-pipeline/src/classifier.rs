//! Role assignment for discovered assets.
//!
//! Roles are decided exactly once, here. Downstream stages branch on the
//! resulting `Role` variant and never look at filenames again.

use std::path::Path;

use shellac_core::{AudioAsset, MasterError, Result, Role};

/// Filename tokens that mark an opening-credits recording
const OPENING_HINTS: &[&str] = &["opening", "intro"];

/// Filename tokens that mark a closing-credits recording
const CLOSING_HINTS: &[&str] = &["closing", "outro", "credits"];

/// An asset with its assigned structural role
#[derive(Debug, Clone)]
pub struct ClassifiedAsset {
    /// The discovered source recording
    pub asset: AudioAsset,
    /// Its place in the finished book
    pub role: Role,
}

/// Assign a role to every asset.
///
/// Explicit designations win over filename hints. Without a designation,
/// a single hint match takes the role; two matches for the same role are
/// ambiguous and fatal. Everything else becomes a body section, numbered
/// densely from 1 in discovery order.
pub fn classify(
    assets: &[AudioAsset],
    opening: Option<&Path>,
    closing: Option<&Path>,
) -> Result<Vec<ClassifiedAsset>> {
    let mut roles: Vec<Option<Role>> = vec![None; assets.len()];

    if let Some(path) = opening {
        let index = find_designated(assets, path, "opening")?;
        roles[index] = Some(Role::Opening);
    }
    if let Some(path) = closing {
        let index = find_designated(assets, path, "closing")?;
        if roles[index].is_some() {
            return Err(MasterError::classification(format!(
                "{} is designated as both opening and closing",
                assets[index].display_name()
            )));
        }
        roles[index] = Some(Role::Closing);
    }

    if opening.is_none() {
        if let Some(index) = find_hinted(assets, &roles, OPENING_HINTS, "opening")? {
            if closing.is_none() && matches_hint(&assets[index], CLOSING_HINTS) {
                return Err(MasterError::classification(format!(
                    "{} matches both opening and closing tokens; designate it explicitly",
                    assets[index].display_name()
                )));
            }
            roles[index] = Some(Role::Opening);
        }
    }

    if closing.is_none() {
        if let Some(index) = find_hinted(assets, &roles, CLOSING_HINTS, "closing")? {
            roles[index] = Some(Role::Closing);
        }
    }

    let mut body_index = 0;
    let classified = assets
        .iter()
        .zip(roles)
        .map(|(asset, role)| {
            let role = role.unwrap_or_else(|| {
                body_index += 1;
                Role::Body(body_index)
            });
            tracing::debug!(file = %asset.display_name(), role = %role.label(), "classified");
            ClassifiedAsset {
                asset: asset.clone(),
                role,
            }
        })
        .collect();

    Ok(classified)
}

/// Resolve an explicit designation to exactly one discovered asset
fn find_designated(assets: &[AudioAsset], path: &Path, which: &str) -> Result<usize> {
    let matches: Vec<usize> = assets
        .iter()
        .enumerate()
        .filter(|(_, asset)| asset.matches_path(path))
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(MasterError::classification(format!(
            "designated {which} {} does not match any discovered file",
            path.display()
        ))),
        _ => Err(MasterError::classification(format!(
            "designated {which} {} matches more than one discovered file",
            path.display()
        ))),
    }
}

/// Find the single unassigned asset hinting at a role, if any
fn find_hinted(
    assets: &[AudioAsset],
    roles: &[Option<Role>],
    hints: &[&str],
    which: &str,
) -> Result<Option<usize>> {
    let candidates: Vec<usize> = assets
        .iter()
        .enumerate()
        .filter(|(i, asset)| roles[*i].is_none() && matches_hint(asset, hints))
        .map(|(i, _)| i)
        .collect();

    match candidates.as_slice() {
        [] => Ok(None),
        [index] => Ok(Some(*index)),
        several => {
            let names: Vec<String> = several
                .iter()
                .map(|&i| assets[i].display_name())
                .collect();
            Err(MasterError::classification(format!(
                "multiple files match the {which} tokens: {}; designate one explicitly",
                names.join(", ")
            )))
        }
    }
}

fn matches_hint(asset: &AudioAsset, hints: &[&str]) -> bool {
    let stem = asset.stem().to_lowercase();
    hints.iter().any(|hint| stem.contains(hint))
}
