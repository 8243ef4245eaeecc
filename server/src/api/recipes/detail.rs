use std::collections::HashMap;

use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::users::profile::UserProfile;
use crate::models::Tag;
use crate::raw_sql::always_false;
use crate::schema::{ingredients, recipe_ingredients, recipe_tags, recipes, tags, users};
use crate::{favorited_by_viewer, in_cart_of_viewer, subscribed_to_author};

/// Nested ingredient line in a recipe response.
#[derive(Debug, Clone, Serialize, ToSchema, Queryable)]
pub struct RecipeIngredientAmount {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation with the viewer's flags attached.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeDetail {
    pub id: i32,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientAmount>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Recipe row as selected by the listing and detail queries.
#[derive(Queryable)]
pub struct RecipeRow {
    pub id: i32,
    pub author_id: i32,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Attaches authors, tags, and ingredient amounts to a page of recipe rows.
///
/// Three batched queries cover the whole page, so the query count stays
/// constant no matter how many recipes are listed.
pub fn assemble_details(
    conn: &mut PgConnection,
    viewer_id: Option<i32>,
    rows: Vec<RecipeRow>,
) -> QueryResult<Vec<RecipeDetail>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<i32> = rows.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: Vec<UserProfile> = match viewer_id {
        Some(viewer) => users::table
            .filter(users::id.eq_any(&author_ids))
            .select((
                users::email,
                users::id,
                users::username,
                users::first_name,
                users::last_name,
                subscribed_to_author!(viewer),
            ))
            .load(conn)?,
        None => users::table
            .filter(users::id.eq_any(&author_ids))
            .select((
                users::email,
                users::id,
                users::username,
                users::first_name,
                users::last_name,
                always_false(),
            ))
            .load(conn)?,
    };

    let tag_rows: Vec<(i32, Tag)> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq_any(&recipe_ids))
        .order(tags::name.asc())
        .select((recipe_tags::recipe_id, Tag::as_select()))
        .load(conn)?;

    let ingredient_rows: Vec<(i32, RecipeIngredientAmount)> = recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq_any(&recipe_ids))
        .order(recipe_ingredients::id.desc())
        .select((
            recipe_ingredients::recipe_id,
            (
                ingredients::id,
                ingredients::name,
                ingredients::measurement_unit,
                recipe_ingredients::amount,
            ),
        ))
        .load(conn)?;

    let authors: HashMap<i32, UserProfile> = authors.into_iter().map(|a| (a.id, a)).collect();
    merge(rows, &authors, tag_rows, ingredient_rows).ok_or(diesel::result::Error::NotFound)
}

/// Loads one recipe with flags and nested data, as seen by `viewer_id`.
pub fn load_detail(
    conn: &mut PgConnection,
    viewer_id: Option<i32>,
    recipe_id: i32,
) -> QueryResult<Option<RecipeDetail>> {
    let row: Option<RecipeRow> = match viewer_id {
        Some(viewer) => recipes::table
            .find(recipe_id)
            .select((
                recipes::id,
                recipes::author_id,
                recipes::name,
                recipes::image,
                recipes::text,
                recipes::cooking_time,
                favorited_by_viewer!(viewer),
                in_cart_of_viewer!(viewer),
            ))
            .first(conn)
            .optional()?,
        None => recipes::table
            .find(recipe_id)
            .select((
                recipes::id,
                recipes::author_id,
                recipes::name,
                recipes::image,
                recipes::text,
                recipes::cooking_time,
                always_false(),
                always_false(),
            ))
            .first(conn)
            .optional()?,
    };

    let row = match row {
        Some(r) => r,
        None => return Ok(None),
    };

    let mut details = assemble_details(conn, viewer_id, vec![row])?;
    Ok(details.pop())
}

/// Pure merge step shared by the batched and single-recipe paths. Returns
/// `None` if a row references an author missing from the author map.
fn merge(
    rows: Vec<RecipeRow>,
    authors: &HashMap<i32, UserProfile>,
    tag_rows: Vec<(i32, Tag)>,
    ingredient_rows: Vec<(i32, RecipeIngredientAmount)>,
) -> Option<Vec<RecipeDetail>> {
    let mut tags_by_recipe: HashMap<i32, Vec<Tag>> = HashMap::new();
    for (recipe_id, tag) in tag_rows {
        tags_by_recipe.entry(recipe_id).or_default().push(tag);
    }

    let mut ingredients_by_recipe: HashMap<i32, Vec<RecipeIngredientAmount>> = HashMap::new();
    for (recipe_id, line) in ingredient_rows {
        ingredients_by_recipe.entry(recipe_id).or_default().push(line);
    }

    let mut details = Vec::with_capacity(rows.len());
    for row in rows {
        let author = authors.get(&row.author_id)?.clone();
        details.push(RecipeDetail {
            id: row.id,
            tags: tags_by_recipe.remove(&row.id).unwrap_or_default(),
            author,
            ingredients: ingredients_by_recipe.remove(&row.id).unwrap_or_default(),
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
        });
    }
    Some(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, author_id: i32) -> RecipeRow {
        RecipeRow {
            id,
            author_id,
            name: format!("recipe-{id}"),
            image: String::new(),
            text: "steps".to_string(),
            cooking_time: 5,
            is_favorited: false,
            is_in_shopping_cart: true,
        }
    }

    fn profile(id: i32) -> UserProfile {
        UserProfile {
            email: format!("u{id}@example.com"),
            id,
            username: format!("u{id}"),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            is_subscribed: false,
        }
    }

    fn tag(id: i32, name: &str) -> Tag {
        Tag {
            id,
            name: name.to_string(),
            color: "#FF0000".to_string(),
            slug: name.to_string(),
        }
    }

    #[test]
    fn test_merge_groups_nested_data_per_recipe() {
        let authors = HashMap::from([(1, profile(1))]);
        let tag_rows = vec![(10, tag(1, "breakfast")), (11, tag(2, "lunch"))];
        let ingredient_rows = vec![
            (
                10,
                RecipeIngredientAmount {
                    id: 1,
                    name: "egg".to_string(),
                    measurement_unit: "pcs".to_string(),
                    amount: 2,
                },
            ),
            (
                10,
                RecipeIngredientAmount {
                    id: 1,
                    name: "egg".to_string(),
                    measurement_unit: "pcs".to_string(),
                    amount: 3,
                },
            ),
        ];

        let details = merge(
            vec![row(10, 1), row(11, 1)],
            &authors,
            tag_rows,
            ingredient_rows,
        )
        .unwrap();

        assert_eq!(details.len(), 2);
        assert_eq!(details[0].tags.len(), 1);
        assert_eq!(details[0].tags[0].slug, "breakfast");
        // duplicate ingredient entries stay as separate lines
        assert_eq!(details[0].ingredients.len(), 2);
        assert_eq!(details[1].tags[0].slug, "lunch");
        assert!(details[1].ingredients.is_empty());
        assert!(details[0].is_in_shopping_cart);
    }

    #[test]
    fn test_merge_fails_on_missing_author() {
        let authors = HashMap::new();
        assert!(merge(vec![row(10, 1)], &authors, vec![], vec![]).is_none());
    }

    #[test]
    fn test_merge_preserves_row_order() {
        let authors = HashMap::from([(1, profile(1)), (2, profile(2))]);
        let details = merge(
            vec![row(12, 2), row(10, 1), row(11, 1)],
            &authors,
            vec![],
            vec![],
        )
        .unwrap();
        let ids: Vec<i32> = details.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![12, 10, 11]);
    }
}
