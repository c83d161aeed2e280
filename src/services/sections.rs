use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    ids,
    models::{CreateSectionRequest, Section, UpdateSectionRequest},
    repository::RepositoryState,
    services::{
        courses::{course_not_found, owned_course},
        is_blank,
    },
};

pub fn section_not_found() -> AppError {
    AppError::not_found("SECTION_NOT_FOUND", "Section not found")
}

/// owned_section
///
/// Loads a section whose course the caller may modify.
pub async fn owned_section(
    repo: &RepositoryState,
    caller: &AuthUser,
    section_id: &str,
) -> AppResult<Section> {
    let section = repo.get_section(section_id).await.ok_or_else(section_not_found)?;
    owned_course(repo, caller, &section.course_id).await?;
    Ok(section)
}

/// Next free `order_index` after the given siblings (0 for the first child).
pub fn next_order_index(existing: impl Iterator<Item = i32>) -> i32 {
    existing.max().map(|max| max + 1).unwrap_or(0)
}

pub async fn list_sections(state: &AppState, course_id: &str) -> AppResult<Vec<Section>> {
    state.repo.get_course(course_id).await.ok_or_else(course_not_found)?;
    Ok(state.repo.list_sections(course_id).await)
}

pub async fn create_section(
    state: &AppState,
    caller: &AuthUser,
    course_id: &str,
    request: CreateSectionRequest,
) -> AppResult<Section> {
    owned_course(&state.repo, caller, course_id).await?;
    if is_blank(&request.title) {
        return Err(AppError::validation("title is required"));
    }

    let order_index = match request.order_index {
        Some(index) => index,
        None => {
            let siblings = state.repo.list_sections(course_id).await;
            next_order_index(siblings.iter().map(|s| s.order_index))
        }
    };

    let now = Utc::now();
    let section = Section {
        section_id: ids::new_id(ids::SECTION),
        course_id: course_id.to_string(),
        title: request.title.trim().to_string(),
        description: request.description,
        order_index,
        estimated_hours: request.estimated_hours.unwrap_or(0),
        created_at: now,
        updated_at: now,
    };

    state
        .repo
        .create_section(section)
        .await
        .ok_or_else(|| AppError::persistence("section"))
}

pub async fn update_section(
    state: &AppState,
    caller: &AuthUser,
    section_id: &str,
    request: UpdateSectionRequest,
) -> AppResult<Section> {
    let mut section = owned_section(&state.repo, caller, section_id).await?;

    if let Some(title) = request.title {
        if is_blank(&title) {
            return Err(AppError::validation("title must not be blank"));
        }
        section.title = title.trim().to_string();
    }
    if let Some(description) = request.description {
        section.description = description;
    }
    if let Some(order_index) = request.order_index {
        section.order_index = order_index;
    }
    if let Some(estimated_hours) = request.estimated_hours {
        section.estimated_hours = estimated_hours;
    }
    section.updated_at = Utc::now();

    state
        .repo
        .update_section(section)
        .await
        .ok_or_else(|| AppError::persistence("section"))
}

/// delete_section
///
/// Removes the section with all of its modules, lessons and videos.
pub async fn delete_section(state: &AppState, caller: &AuthUser, section_id: &str) -> AppResult<()> {
    owned_section(&state.repo, caller, section_id).await?;
    if !state.repo.delete_section(section_id).await {
        return Err(AppError::Internal(format!("Failed to delete section {section_id}")));
    }
    Ok(())
}

/// reorder_sections
///
/// `orderIndex` becomes the position in `section_ids`. Ids that are unknown or belong to
/// another course are skipped.
pub async fn reorder_sections(
    state: &AppState,
    caller: &AuthUser,
    course_id: &str,
    section_ids: &[String],
) -> AppResult<Vec<Section>> {
    owned_course(&state.repo, caller, course_id).await?;

    let now = Utc::now();
    for (position, section_id) in section_ids.iter().enumerate() {
        let Some(mut section) = state.repo.get_section(section_id).await else {
            continue;
        };
        if section.course_id != course_id {
            continue;
        }
        section.order_index = position as i32;
        section.updated_at = now;
        state
            .repo
            .update_section(section)
            .await
            .ok_or_else(|| AppError::persistence("section"))?;
    }

    Ok(state.repo.list_sections(course_id).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_index_follows_the_highest_sibling() {
        assert_eq!(next_order_index(std::iter::empty()), 0);
        assert_eq!(next_order_index([0, 4, 2].into_iter()), 5);
    }
}
