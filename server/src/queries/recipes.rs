use diesel::prelude::*;

use crate::models::{Ingredient, NewRecipe, Recipe, RecipeChanges, Tag};
use crate::schema::{recipe_ingredients, recipe_tags, recipes};

use super::{ingredients, tags};

/// Restricts a recipe list to recipes carrying at least one of the given
/// tags and at least one of the given ingredients. Empty lists do not
/// restrict.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tag_ids: Vec<i64>,
    pub ingredient_ids: Vec<i64>,
}

/// A recipe together with everything attached to it.
#[derive(Debug, Clone)]
pub struct RecipeRow {
    pub recipe: Recipe,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

/// Nested names supplied with a create or update. `None` leaves that
/// relationship untouched; `Some(&[])` clears it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Relations<'a> {
    pub tags: Option<&'a [String]>,
    pub ingredients: Option<&'a [String]>,
}

pub fn list(
    conn: &mut PgConnection,
    user_id: i64,
    filter: &RecipeFilter,
) -> QueryResult<Vec<Recipe>> {
    let mut query = recipes::table
        .filter(recipes::user_id.eq(user_id))
        .select(Recipe::as_select())
        .order(recipes::id.desc())
        .into_boxed();

    // IN subqueries keep each recipe once no matter how many ids match.
    if !filter.tag_ids.is_empty() {
        let tagged = recipe_tags::table
            .filter(recipe_tags::tag_id.eq_any(filter.tag_ids.clone()))
            .select(recipe_tags::recipe_id);
        query = query.filter(recipes::id.eq_any(tagged));
    }

    if !filter.ingredient_ids.is_empty() {
        let containing = recipe_ingredients::table
            .filter(recipe_ingredients::ingredient_id.eq_any(filter.ingredient_ids.clone()))
            .select(recipe_ingredients::recipe_id);
        query = query.filter(recipes::id.eq_any(containing));
    }

    query.load(conn)
}

pub fn find(conn: &mut PgConnection, user_id: i64, id: i64) -> QueryResult<Option<Recipe>> {
    recipes::table
        .filter(recipes::id.eq(id))
        .filter(recipes::user_id.eq(user_id))
        .select(Recipe::as_select())
        .first(conn)
        .optional()
}

pub fn insert(conn: &mut PgConnection, new_recipe: &NewRecipe) -> QueryResult<Recipe> {
    diesel::insert_into(recipes::table)
        .values(new_recipe)
        .returning(Recipe::as_returning())
        .get_result(conn)
}

pub fn update(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
    changes: &RecipeChanges,
) -> QueryResult<Option<Recipe>> {
    diesel::update(
        recipes::table
            .filter(recipes::id.eq(id))
            .filter(recipes::user_id.eq(user_id)),
    )
    .set(changes)
    .returning(Recipe::as_returning())
    .get_result(conn)
    .optional()
}

/// Returns `None` when nothing was deleted, otherwise the image key the
/// recipe held.
pub fn delete(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> QueryResult<Option<Option<String>>> {
    diesel::delete(
        recipes::table
            .filter(recipes::id.eq(id))
            .filter(recipes::user_id.eq(user_id)),
    )
    .returning(recipes::image)
    .get_result(conn)
    .optional()
}

/// Point the recipe at a new image key, returning the updated recipe and
/// the key it replaced.
pub fn replace_image(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
    key: &str,
) -> QueryResult<Option<(Recipe, Option<String>)>> {
    conn.transaction(|conn| {
        let previous: Option<Option<String>> = recipes::table
            .filter(recipes::id.eq(id))
            .filter(recipes::user_id.eq(user_id))
            .select(recipes::image)
            .for_update()
            .first(conn)
            .optional()?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        let recipe = diesel::update(recipes::table.find(id))
            .set((
                recipes::image.eq(key),
                recipes::updated_at.eq(chrono::Utc::now()),
            ))
            .returning(Recipe::as_returning())
            .get_result(conn)?;

        Ok(Some((recipe, previous)))
    })
}

/// Resolve nested names for the owner and replace the recipe's
/// relationship sets that were supplied.
pub fn attach(
    conn: &mut PgConnection,
    user_id: i64,
    recipe_id: i64,
    relations: Relations,
) -> QueryResult<()> {
    if let Some(names) = relations.tags {
        let ids: Vec<i64> = tags::get_or_create(conn, user_id, names)?
            .into_iter()
            .map(|tag| tag.id)
            .collect();
        tags::replace_for_recipe(conn, recipe_id, &ids)?;
    }

    if let Some(names) = relations.ingredients {
        let ids: Vec<i64> = ingredients::get_or_create(conn, user_id, names)?
            .into_iter()
            .map(|ingredient| ingredient.id)
            .collect();
        ingredients::replace_for_recipe(conn, recipe_id, &ids)?;
    }

    Ok(())
}

/// Load tags and ingredients for a page of recipes in two queries.
pub fn with_relations(conn: &mut PgConnection, recipes: Vec<Recipe>) -> QueryResult<Vec<RecipeRow>> {
    let tags = tags::for_recipes(conn, &recipes)?;
    let ingredients = ingredients::for_recipes(conn, &recipes)?;

    Ok(recipes
        .into_iter()
        .zip(tags)
        .zip(ingredients)
        .map(|((recipe, tags), ingredients)| RecipeRow {
            recipe,
            tags,
            ingredients,
        })
        .collect())
}

pub fn load_row(conn: &mut PgConnection, recipe: Recipe) -> QueryResult<RecipeRow> {
    with_relations(conn, vec![recipe])?
        .pop()
        .ok_or(diesel::result::Error::NotFound)
}
