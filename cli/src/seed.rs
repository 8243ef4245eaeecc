use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use diesel::prelude::*;
use potluck_server::models::{NewIngredient, NewTag};
use potluck_server::schema::{ingredients, tags};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TagSeed {
    name: String,
    color: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct IngredientSeed {
    name: String,
    measurement_unit: String,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn seed(database_url: &str, data_dir: &Path) -> Result<()> {
    let tag_seeds: Vec<TagSeed> = read_json(&data_dir.join("tags.json"))?;
    let ingredient_seeds: Vec<IngredientSeed> = read_json(&data_dir.join("ingredients.json"))?;

    let mut conn =
        PgConnection::establish(database_url).context("Failed to connect to database")?;

    let tag_rows: Vec<NewTag> = tag_seeds
        .iter()
        .map(|t| NewTag {
            name: &t.name,
            color: &t.color,
            slug: &t.slug,
        })
        .collect();

    let inserted = diesel::insert_into(tags::table)
        .values(&tag_rows)
        .on_conflict(tags::slug)
        .do_nothing()
        .execute(&mut conn)
        .context("Failed to seed tags")?;
    println!(
        "Seeded {} tags ({} already present)",
        inserted,
        tag_seeds.len() - inserted
    );

    // The catalog has no unique constraint, so a plain re-run would
    // duplicate every row. A non-empty table means seeding already happened.
    let existing: i64 = ingredients::table
        .count()
        .get_result(&mut conn)
        .context("Failed to check ingredient catalog")?;
    if existing > 0 {
        println!(
            "Ingredient catalog already has {} entries, skipping",
            existing
        );
        return Ok(());
    }

    let ingredient_rows: Vec<NewIngredient> = ingredient_seeds
        .iter()
        .map(|i| NewIngredient {
            name: &i.name,
            measurement_unit: &i.measurement_unit,
        })
        .collect();

    diesel::insert_into(ingredients::table)
        .values(&ingredient_rows)
        .execute(&mut conn)
        .context("Failed to seed ingredients")?;
    println!("Seeded {} ingredients", ingredient_seeds.len());

    Ok(())
}
