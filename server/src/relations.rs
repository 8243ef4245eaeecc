//! Membership flags: favorites, shopping cart entries, and follows.
//!
//! All three relations share one add/remove control flow. The storage
//! unique constraints double as the concurrency backstop: two racing adds
//! both pass the duplicate probe, one insert loses against the constraint,
//! and the loser reports the same duplicate error a sequential double-add
//! would get.

use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use crate::error::{ApiError, Target};
use crate::models::{NewFavorite, NewFollow, NewShoppingCartItem, RecipeShort, User};
use crate::schema::{favorites, follows, recipes, shopping_cart_items, users};

/// The three toggleable user-to-target relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Favorite,
    ShoppingCart,
    Follow,
}

impl Relation {
    pub fn already_exists_code(self) -> &'static str {
        match self {
            Relation::Favorite => "already_favorite",
            Relation::ShoppingCart => "already_in_cart",
            Relation::Follow => "already_following",
        }
    }

    pub fn already_exists_message(self) -> &'static str {
        match self {
            Relation::Favorite => "Recipe already is in favorites.",
            Relation::ShoppingCart => "Recipe already is in the shopping cart.",
            Relation::Follow => "Already following the user.",
        }
    }

    pub fn missing_code(self) -> &'static str {
        match self {
            Relation::Favorite => "not_favorite",
            Relation::ShoppingCart => "not_in_cart",
            Relation::Follow => "not_following",
        }
    }

    pub fn missing_message(self) -> &'static str {
        match self {
            Relation::Favorite => "Recipe is not in favorites.",
            Relation::ShoppingCart => "Recipe is not in the shopping cart.",
            Relation::Follow => "Not following the user.",
        }
    }
}

/// Storage operations for one flag relation.
///
/// `TargetRow` is what a successful add hands back to the endpoint so it
/// can build its response without re-resolving the target.
pub trait FlagRelation {
    const RELATION: Relation;
    const TARGET: Target;
    type TargetRow;

    fn load_target(conn: &mut PgConnection, target_id: i32) -> QueryResult<Option<Self::TargetRow>>;
    fn flag_exists(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<bool>;
    fn insert(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<usize>;
    fn delete(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<usize>;
}

pub struct FavoriteFlag;

impl FlagRelation for FavoriteFlag {
    const RELATION: Relation = Relation::Favorite;
    const TARGET: Target = Target::Recipe;
    type TargetRow = RecipeShort;

    fn load_target(conn: &mut PgConnection, target_id: i32) -> QueryResult<Option<RecipeShort>> {
        recipes::table
            .find(target_id)
            .select(RecipeShort::as_select())
            .first(conn)
            .optional()
    }

    fn flag_exists(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<bool> {
        diesel::select(exists(
            favorites::table
                .filter(favorites::user_id.eq(user_id))
                .filter(favorites::recipe_id.eq(target_id)),
        ))
        .get_result(conn)
    }

    fn insert(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<usize> {
        diesel::insert_into(favorites::table)
            .values(&NewFavorite {
                user_id,
                recipe_id: target_id,
            })
            .execute(conn)
    }

    fn delete(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<usize> {
        diesel::delete(
            favorites::table
                .filter(favorites::user_id.eq(user_id))
                .filter(favorites::recipe_id.eq(target_id)),
        )
        .execute(conn)
    }
}

pub struct CartFlag;

impl FlagRelation for CartFlag {
    const RELATION: Relation = Relation::ShoppingCart;
    const TARGET: Target = Target::Recipe;
    type TargetRow = RecipeShort;

    fn load_target(conn: &mut PgConnection, target_id: i32) -> QueryResult<Option<RecipeShort>> {
        recipes::table
            .find(target_id)
            .select(RecipeShort::as_select())
            .first(conn)
            .optional()
    }

    fn flag_exists(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<bool> {
        diesel::select(exists(
            shopping_cart_items::table
                .filter(shopping_cart_items::user_id.eq(user_id))
                .filter(shopping_cart_items::recipe_id.eq(target_id)),
        ))
        .get_result(conn)
    }

    fn insert(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<usize> {
        diesel::insert_into(shopping_cart_items::table)
            .values(&NewShoppingCartItem {
                user_id,
                recipe_id: target_id,
            })
            .execute(conn)
    }

    fn delete(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<usize> {
        diesel::delete(
            shopping_cart_items::table
                .filter(shopping_cart_items::user_id.eq(user_id))
                .filter(shopping_cart_items::recipe_id.eq(target_id)),
        )
        .execute(conn)
    }
}

pub struct FollowFlag;

impl FlagRelation for FollowFlag {
    const RELATION: Relation = Relation::Follow;
    const TARGET: Target = Target::User;
    type TargetRow = User;

    fn load_target(conn: &mut PgConnection, target_id: i32) -> QueryResult<Option<User>> {
        users::table
            .find(target_id)
            .select(User::as_select())
            .first(conn)
            .optional()
    }

    fn flag_exists(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<bool> {
        diesel::select(exists(
            follows::table
                .filter(follows::user_id.eq(user_id))
                .filter(follows::author_id.eq(target_id)),
        ))
        .get_result(conn)
    }

    fn insert(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<usize> {
        diesel::insert_into(follows::table)
            .values(&NewFollow {
                user_id,
                author_id: target_id,
            })
            .execute(conn)
    }

    fn delete(conn: &mut PgConnection, user_id: i32, target_id: i32) -> QueryResult<usize> {
        diesel::delete(
            follows::table
                .filter(follows::user_id.eq(user_id))
                .filter(follows::author_id.eq(target_id)),
        )
        .execute(conn)
    }
}

/// Translates an insert failure into the relation's domain error.
fn map_insert_error(err: diesel::result::Error, relation: Relation, target: Target) -> ApiError {
    match err {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            ApiError::AlreadyExists(relation)
        }
        diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            ApiError::NotFound(target)
        }
        e => ApiError::from(e),
    }
}

/// A delete that touched no rows means the flag was never set.
fn check_removed(removed: usize, relation: Relation) -> Result<(), ApiError> {
    if removed == 0 {
        return Err(ApiError::MissingRelation(relation));
    }
    Ok(())
}

/// Adds the flag row, returning the target so the endpoint can serialize it.
///
/// Resolution order matches the removal path: the target is looked up first
/// (404 for a missing target beats the duplicate error), then the duplicate
/// probe, then the insert. Constraint violations from racing requests are
/// reported as the relation's duplicate error; a target deleted mid-flight
/// trips the foreign key and is reported as not found.
pub fn add_flag<F: FlagRelation>(
    conn: &mut PgConnection,
    user_id: i32,
    target_id: i32,
) -> Result<F::TargetRow, ApiError> {
    let target = F::load_target(conn, target_id)?.ok_or(ApiError::NotFound(F::TARGET))?;

    if F::flag_exists(conn, user_id, target_id)? {
        return Err(ApiError::AlreadyExists(F::RELATION));
    }

    match F::insert(conn, user_id, target_id) {
        Ok(_) => Ok(target),
        Err(e) => Err(map_insert_error(e, F::RELATION, F::TARGET)),
    }
}

/// Removes the flag row. Missing target reports 404; an existing target
/// without the flag reports the relation's missing-flag error.
pub fn remove_flag<F: FlagRelation>(
    conn: &mut PgConnection,
    user_id: i32,
    target_id: i32,
) -> Result<(), ApiError> {
    if F::load_target(conn, target_id)?.is_none() {
        return Err(ApiError::NotFound(F::TARGET));
    }

    let removed = F::delete(conn, user_id, target_id)?;
    check_removed(removed, F::RELATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_codes_are_distinct() {
        let relations = [Relation::Favorite, Relation::ShoppingCart, Relation::Follow];
        for (i, a) in relations.iter().enumerate() {
            for b in relations.iter().skip(i + 1) {
                assert_ne!(a.already_exists_code(), b.already_exists_code());
                assert_ne!(a.missing_code(), b.missing_code());
            }
        }
    }

    #[test]
    fn test_relation_messages() {
        assert_eq!(
            Relation::Favorite.already_exists_message(),
            "Recipe already is in favorites."
        );
        assert_eq!(
            Relation::ShoppingCart.already_exists_message(),
            "Recipe already is in the shopping cart."
        );
        assert_eq!(
            Relation::Follow.already_exists_message(),
            "Already following the user."
        );
        assert_eq!(Relation::Favorite.missing_message(), "Recipe is not in favorites.");
        assert_eq!(
            Relation::ShoppingCart.missing_message(),
            "Recipe is not in the shopping cart."
        );
        assert_eq!(Relation::Follow.missing_message(), "Not following the user.");
    }

    #[test]
    fn test_flag_targets() {
        assert_eq!(FavoriteFlag::TARGET, Target::Recipe);
        assert_eq!(CartFlag::TARGET, Target::Recipe);
        assert_eq!(FollowFlag::TARGET, Target::User);
    }

    const ALL_FLAGS: [(Relation, Target); 3] = [
        (Relation::Favorite, Target::Recipe),
        (Relation::ShoppingCart, Target::Recipe),
        (Relation::Follow, Target::User),
    ];

    fn database_error(kind: DatabaseErrorKind) -> diesel::result::Error {
        diesel::result::Error::DatabaseError(kind, Box::new(String::from("constraint violated")))
    }

    #[test]
    fn test_unique_violation_maps_to_duplicate_flag() {
        for (relation, target) in ALL_FLAGS {
            let err = map_insert_error(
                database_error(DatabaseErrorKind::UniqueViolation),
                relation,
                target,
            );
            match err {
                ApiError::AlreadyExists(r) => assert_eq!(r, relation),
                other => panic!("expected AlreadyExists, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_foreign_key_violation_maps_to_missing_target() {
        for (relation, target) in ALL_FLAGS {
            let err = map_insert_error(
                database_error(DatabaseErrorKind::ForeignKeyViolation),
                relation,
                target,
            );
            match err {
                ApiError::NotFound(t) => assert_eq!(t, target),
                other => panic!("expected NotFound, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_other_insert_errors_pass_through_as_database() {
        let err = map_insert_error(diesel::result::Error::NotFound, Relation::Follow, Target::User);
        assert!(matches!(err, ApiError::Database(_)));
    }

    #[test]
    fn test_delete_count_zero_reports_missing_flag() {
        for (relation, _) in ALL_FLAGS {
            match check_removed(0, relation) {
                Err(ApiError::MissingRelation(r)) => assert_eq!(r, relation),
                other => panic!("expected MissingRelation, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_delete_count_one_is_ok() {
        assert!(check_removed(1, Relation::Favorite).is_ok());
        assert!(check_removed(1, Relation::Follow).is_ok());
    }
}
