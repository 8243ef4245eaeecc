//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! # Safety
//!
//! All SQL in this module has been reviewed for SQL injection safety:
//! - User input is ALWAYS passed via `.bind()` parameters
//! - No string concatenation or interpolation with user data
//!
//! When adding new SQL here:
//! 1. Document why Diesel DSL can't be used
//! 2. Ensure all user input uses `.bind()`

use diesel::dsl::sql;
use diesel::expression::SqlLiteral;
use diesel::sql_types::{BigInt, Bool};

/// Window function for counting total rows across the full result set.
///
/// Returns `COUNT(*) OVER()` which gives the total count before LIMIT/OFFSET.
/// Diesel doesn't support window functions natively.
///
/// # Safety
/// Static SQL string with no user input.
pub fn count_over() -> SqlLiteral<BigInt> {
    sql::<BigInt>("COUNT(*) OVER()")
}

/// Constant boolean select column, for branches where a viewer flag is
/// known without a lookup (anonymous viewers).
///
/// # Safety
/// Static SQL string with no user input.
pub fn always_false() -> SqlLiteral<Bool> {
    sql::<Bool>("FALSE")
}

/// Constant TRUE variant of [`always_false`], for listings whose rows are
/// members by construction (e.g. followed authors).
pub fn always_true() -> SqlLiteral<Bool> {
    sql::<Bool>("TRUE")
}

/// Correlated count of recipes owned by the `users` row in scope.
///
/// Attached in select position so author listings get their recipe totals
/// in the same query as the authors themselves.
///
/// # Safety
/// Static SQL string with no user input.
pub fn recipes_count() -> SqlLiteral<BigInt> {
    sql::<BigInt>("(SELECT COUNT(*) FROM recipes WHERE recipes.author_id = users.id)")
}

/// Correlated membership probe: has the viewer favorited the `recipes` row
/// in scope? Usable both as a select column and as a filter predicate.
///
/// # Safety
/// The viewer id is passed via `.bind()`, not interpolated.
///
/// # Why raw SQL?
/// Diesel has no way to reference the outer query's row from a subquery
/// (`OuterRef`-style correlation).
#[macro_export]
macro_rules! favorited_by_viewer {
    ($user_id:expr) => {
        diesel::dsl::sql::<diesel::sql_types::Bool>(
            "EXISTS (SELECT 1 FROM favorites \
             WHERE favorites.recipe_id = recipes.id AND favorites.user_id = ",
        )
        .bind::<diesel::sql_types::Integer, _>($user_id)
        .sql(")")
    };
}

/// Correlated membership probe: is the `recipes` row in scope in the
/// viewer's shopping cart? See [`favorited_by_viewer`].
///
/// # Safety
/// The viewer id is passed via `.bind()`, not interpolated.
#[macro_export]
macro_rules! in_cart_of_viewer {
    ($user_id:expr) => {
        diesel::dsl::sql::<diesel::sql_types::Bool>(
            "EXISTS (SELECT 1 FROM shopping_cart_items \
             WHERE shopping_cart_items.recipe_id = recipes.id AND shopping_cart_items.user_id = ",
        )
        .bind::<diesel::sql_types::Integer, _>($user_id)
        .sql(")")
    };
}

/// Correlated membership probe: does the viewer follow the `users` row in
/// scope?
///
/// # Safety
/// The viewer id is passed via `.bind()`, not interpolated.
#[macro_export]
macro_rules! subscribed_to_author {
    ($user_id:expr) => {
        diesel::dsl::sql::<diesel::sql_types::Bool>(
            "EXISTS (SELECT 1 FROM follows \
             WHERE follows.author_id = users.id AND follows.user_id = ",
        )
        .bind::<diesel::sql_types::Integer, _>($user_id)
        .sql(")")
    };
}

/// Filter predicate: does the `recipes` row in scope carry at least one of
/// the given tag slugs? One probe covers the whole slug set, so repeated
/// tag parameters cost a single EXISTS rather than a join per slug (and
/// can't duplicate result rows the way a join would).
///
/// # Safety
/// The slug list is passed via `.bind()` as a text array, not interpolated.
#[macro_export]
macro_rules! has_tag_slug {
    ($slugs:expr) => {
        diesel::dsl::sql::<diesel::sql_types::Bool>(
            "EXISTS (SELECT 1 FROM recipe_tags \
             JOIN tags ON tags.id = recipe_tags.tag_id \
             WHERE recipe_tags.recipe_id = recipes.id AND tags.slug = ANY(",
        )
        .bind::<diesel::sql_types::Array<diesel::sql_types::Text>, _>($slugs)
        .sql("))")
    };
}
