use diesel::prelude::*;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{ApiError, Target};
use crate::models::{
    NewRecipeIngredient, NewRecipeTag, MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT, MIN_COOKING_TIME,
    MIN_INGREDIENT_AMOUNT,
};
use crate::schema::{ingredients, recipe_ingredients, recipe_tags, tags};

/// One (ingredient, amount) entry in a recipe payload. Repeated ids are
/// kept as separate rows; the shopping list aggregator sums across them.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientEntry {
    pub id: i32,
    pub amount: i32,
}

/// Body shared by recipe create and update.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecipePayload {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientEntry>,
}

/// Bounds-checks the payload and collapses repeated tag ids, which would
/// otherwise trip the composite primary key on insert.
pub fn validate(payload: &mut RecipePayload) -> Result<(), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Name cannot be empty".to_string()));
    }
    if payload.name.len() > 200 {
        return Err(ApiError::Validation(
            "Name must be at most 200 characters".to_string(),
        ));
    }
    if payload.text.trim().is_empty() {
        return Err(ApiError::Validation("Text cannot be empty".to_string()));
    }
    if payload.image.is_empty() {
        return Err(ApiError::Validation("Image cannot be empty".to_string()));
    }
    if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&payload.cooking_time) {
        return Err(ApiError::Validation(format!(
            "Cooking time must be between {} and {}",
            MIN_COOKING_TIME, MAX_COOKING_TIME
        )));
    }
    for entry in &payload.ingredients {
        if !(MIN_INGREDIENT_AMOUNT..=MAX_INGREDIENT_AMOUNT).contains(&entry.amount) {
            return Err(ApiError::Validation(format!(
                "Ingredient amount must be between {} and {}",
                MIN_INGREDIENT_AMOUNT, MAX_INGREDIENT_AMOUNT
            )));
        }
    }

    payload.tags.sort_unstable();
    payload.tags.dedup();

    Ok(())
}

/// Confirms every referenced tag and ingredient id exists, before any
/// write happens.
pub(super) fn verify_references(
    conn: &mut PgConnection,
    payload: &RecipePayload,
) -> Result<(), ApiError> {
    let found_tags: i64 = tags::table
        .filter(tags::id.eq_any(&payload.tags))
        .count()
        .get_result(conn)?;
    if found_tags != payload.tags.len() as i64 {
        return Err(ApiError::NotFound(Target::Tag));
    }

    let mut ingredient_ids: Vec<i32> = payload.ingredients.iter().map(|e| e.id).collect();
    ingredient_ids.sort_unstable();
    ingredient_ids.dedup();
    let found_ingredients: i64 = ingredients::table
        .filter(ingredients::id.eq_any(&ingredient_ids))
        .count()
        .get_result(conn)?;
    if found_ingredients != ingredient_ids.len() as i64 {
        return Err(ApiError::NotFound(Target::Ingredient));
    }

    Ok(())
}

/// Writes the payload's tag and ingredient rows for `recipe_id`.
pub(super) fn insert_relations(
    conn: &mut PgConnection,
    recipe_id: i32,
    payload: &RecipePayload,
) -> Result<(), ApiError> {
    let tag_rows: Vec<NewRecipeTag> = payload
        .tags
        .iter()
        .map(|&tag_id| NewRecipeTag { recipe_id, tag_id })
        .collect();
    diesel::insert_into(recipe_tags::table)
        .values(&tag_rows)
        .execute(conn)?;

    let ingredient_rows: Vec<NewRecipeIngredient> = payload
        .ingredients
        .iter()
        .map(|entry| NewRecipeIngredient {
            recipe_id,
            ingredient_id: entry.id,
            amount: entry.amount,
        })
        .collect();
    diesel::insert_into(recipe_ingredients::table)
        .values(&ingredient_rows)
        .execute(conn)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> RecipePayload {
        RecipePayload {
            name: "Omelette".to_string(),
            text: "Whisk and fry.".to_string(),
            image: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            cooking_time: 10,
            tags: vec![1],
            ingredients: vec![IngredientEntry { id: 1, amount: 2 }],
        }
    }

    #[test]
    fn test_validate_accepts_valid_payload() {
        assert!(validate(&mut valid_payload()).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let mut payload = valid_payload();
        payload.name = "   ".to_string();
        assert!(validate(&mut payload).is_err());
    }

    #[test]
    fn test_validate_rejects_overlong_name() {
        let mut payload = valid_payload();
        payload.name = "x".repeat(201);
        assert!(validate(&mut payload).is_err());
    }

    #[test]
    fn test_validate_rejects_cooking_time_out_of_bounds() {
        let mut payload = valid_payload();
        payload.cooking_time = 0;
        assert!(validate(&mut payload).is_err());

        let mut payload = valid_payload();
        payload.cooking_time = 32_001;
        assert!(validate(&mut payload).is_err());

        let mut payload = valid_payload();
        payload.cooking_time = 32_000;
        assert!(validate(&mut payload).is_ok());
    }

    #[test]
    fn test_validate_rejects_amount_out_of_bounds() {
        let mut payload = valid_payload();
        payload.ingredients[0].amount = 0;
        assert!(validate(&mut payload).is_err());

        let mut payload = valid_payload();
        payload.ingredients[0].amount = 32_001;
        assert!(validate(&mut payload).is_err());
    }

    #[test]
    fn test_validate_dedupes_tags() {
        let mut payload = valid_payload();
        payload.tags = vec![3, 1, 3, 2, 1];
        validate(&mut payload).unwrap();
        assert_eq!(payload.tags, vec![1, 2, 3]);
    }

    #[test]
    fn test_validate_keeps_duplicate_ingredients() {
        let mut payload = valid_payload();
        payload.ingredients = vec![
            IngredientEntry { id: 1, amount: 2 },
            IngredientEntry { id: 1, amount: 3 },
        ];
        validate(&mut payload).unwrap();
        assert_eq!(payload.ingredients.len(), 2);
    }

    #[test]
    fn test_validate_allows_empty_relation_lists() {
        let mut payload = valid_payload();
        payload.tags = vec![];
        payload.ingredients = vec![];
        assert!(validate(&mut payload).is_ok());
    }
}
