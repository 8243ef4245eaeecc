use std::collections::HashMap;

use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::RecipeShort;
use crate::raw_sql::always_false;
use crate::schema::{recipes, users};
use crate::subscribed_to_author;

/// Public user representation with the viewer's follow flag attached.
#[derive(Debug, Clone, Serialize, ToSchema, Queryable)]
pub struct UserProfile {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// Followed-author representation: the profile plus that author's recipe
/// cards and total recipe count.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithRecipes {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

/// Loads one user's profile as seen by `viewer_id`. Anonymous viewers get
/// a constant false follow flag instead of a membership probe.
pub fn load_profile(
    conn: &mut PgConnection,
    viewer_id: Option<i32>,
    user_id: i32,
) -> QueryResult<Option<UserProfile>> {
    match viewer_id {
        Some(viewer) => users::table
            .find(user_id)
            .select((
                users::email,
                users::id,
                users::username,
                users::first_name,
                users::last_name,
                subscribed_to_author!(viewer),
            ))
            .first::<UserProfile>(conn)
            .optional(),
        None => users::table
            .find(user_id)
            .select((
                users::email,
                users::id,
                users::username,
                users::first_name,
                users::last_name,
                always_false(),
            ))
            .first::<UserProfile>(conn)
            .optional(),
    }
}

/// `recipes_limit` query parameter; values that fail to parse are ignored.
pub fn parse_recipes_limit(pairs: &[(String, String)]) -> Option<usize> {
    crate::api::last_value(pairs, "recipes_limit").and_then(|v| v.parse::<usize>().ok())
}

/// Batch-fetches recipe cards for a set of authors in one query, newest
/// first, truncated to `limit` per author. Keeps subscription listings at a
/// constant query count instead of one recipe query per author.
pub fn recipes_for_authors(
    conn: &mut PgConnection,
    author_ids: &[i32],
    limit: Option<usize>,
) -> QueryResult<HashMap<i32, Vec<RecipeShort>>> {
    if author_ids.is_empty() || limit == Some(0) {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, RecipeShort)> = recipes::table
        .filter(recipes::author_id.eq_any(author_ids))
        .order(recipes::id.desc())
        .select((recipes::author_id, RecipeShort::as_select()))
        .load(conn)?;

    Ok(group_by_author(rows, limit))
}

fn group_by_author(
    rows: Vec<(i32, RecipeShort)>,
    limit: Option<usize>,
) -> HashMap<i32, Vec<RecipeShort>> {
    let mut by_author: HashMap<i32, Vec<RecipeShort>> = HashMap::new();
    for (author_id, recipe) in rows {
        let entry = by_author.entry(author_id).or_default();
        if limit.map_or(true, |l| entry.len() < l) {
            entry.push(recipe);
        }
    }
    by_author
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn card(id: i32) -> RecipeShort {
        RecipeShort {
            id,
            name: format!("recipe-{id}"),
            image: String::new(),
            cooking_time: 10,
        }
    }

    #[test]
    fn test_parse_recipes_limit_absent() {
        assert_eq!(parse_recipes_limit(&[]), None);
    }

    #[test]
    fn test_parse_recipes_limit_valid() {
        assert_eq!(parse_recipes_limit(&pairs(&[("recipes_limit", "3")])), Some(3));
    }

    #[test]
    fn test_parse_recipes_limit_ignores_garbage() {
        assert_eq!(parse_recipes_limit(&pairs(&[("recipes_limit", "abc")])), None);
        assert_eq!(parse_recipes_limit(&pairs(&[("recipes_limit", "-1")])), None);
        assert_eq!(parse_recipes_limit(&pairs(&[("recipes_limit", "1.5")])), None);
    }

    #[test]
    fn test_parse_recipes_limit_last_value_wins() {
        let p = pairs(&[("recipes_limit", "2"), ("recipes_limit", "5")]);
        assert_eq!(parse_recipes_limit(&p), Some(5));
    }

    #[test]
    fn test_group_by_author_groups_and_preserves_order() {
        let rows = vec![(1, card(9)), (2, card(8)), (1, card(7))];
        let grouped = group_by_author(rows, None);
        assert_eq!(
            grouped[&1].iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![9, 7]
        );
        assert_eq!(grouped[&2].len(), 1);
    }

    #[test]
    fn test_group_by_author_truncates_per_author() {
        let rows = vec![(1, card(9)), (1, card(7)), (1, card(5)), (2, card(8))];
        let grouped = group_by_author(rows, Some(2));
        assert_eq!(
            grouped[&1].iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![9, 7]
        );
        assert_eq!(grouped[&2].len(), 1);
    }

    #[test]
    fn test_group_by_author_zero_limit() {
        let grouped = group_by_author(vec![(1, card(9))], Some(0));
        assert!(grouped[&1].is_empty());
    }
}
