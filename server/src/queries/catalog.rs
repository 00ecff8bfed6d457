//! Tag and ingredient queries. Both resources share one shape, so the
//! query set is generated once per table.

macro_rules! catalog_queries {
    (
        $module:ident,
        model = $model:ident,
        table = $table:ident,
        link = $link:ident,
        link_model = $link_model:ident,
        link_column = $link_column:ident $(,)?
    ) => {
        pub mod $module {
            use diesel::prelude::*;
            use diesel::upsert::excluded;

            use crate::models::{$link_model, $model, Recipe};
            use crate::schema::{$link, $table, recipes};

            /// All entries owned by `user_id`, newest name first. With
            /// `assigned_only`, only entries attached to one of the user's
            /// recipes.
            pub fn list(
                conn: &mut PgConnection,
                user_id: i64,
                assigned_only: bool,
            ) -> QueryResult<Vec<$model>> {
                let mut query = $table::table
                    .filter($table::user_id.eq(user_id))
                    .select($model::as_select())
                    .order(($table::name.desc(), $table::id.desc()))
                    .into_boxed();

                if assigned_only {
                    let assigned = $link::table
                        .inner_join(recipes::table)
                        .filter(recipes::user_id.eq(user_id))
                        .select($link::$link_column);
                    query = query.filter($table::id.eq_any(assigned));
                }

                query.load(conn)
            }

            pub fn find(
                conn: &mut PgConnection,
                user_id: i64,
                id: i64,
            ) -> QueryResult<Option<$model>> {
                $table::table
                    .filter($table::id.eq(id))
                    .filter($table::user_id.eq(user_id))
                    .select($model::as_select())
                    .first(conn)
                    .optional()
            }

            /// Plain insert; a taken name surfaces as a unique violation.
            pub fn create(conn: &mut PgConnection, user_id: i64, name: &str) -> QueryResult<$model> {
                diesel::insert_into($table::table)
                    .values(($table::user_id.eq(user_id), $table::name.eq(name)))
                    .returning($model::as_returning())
                    .get_result(conn)
            }

            pub fn rename(
                conn: &mut PgConnection,
                user_id: i64,
                id: i64,
                name: &str,
            ) -> QueryResult<Option<$model>> {
                diesel::update(
                    $table::table
                        .filter($table::id.eq(id))
                        .filter($table::user_id.eq(user_id)),
                )
                .set($table::name.eq(name))
                .returning($model::as_returning())
                .get_result(conn)
                .optional()
            }

            /// Association rows go with it through the foreign key cascade.
            pub fn delete(conn: &mut PgConnection, user_id: i64, id: i64) -> QueryResult<bool> {
                let deleted = diesel::delete(
                    $table::table
                        .filter($table::id.eq(id))
                        .filter($table::user_id.eq(user_id)),
                )
                .execute(conn)?;
                Ok(deleted > 0)
            }

            /// Resolve names to rows owned by `user_id`, inserting the
            /// missing ones in the same statement.
            pub fn get_or_create(
                conn: &mut PgConnection,
                user_id: i64,
                names: &[String],
            ) -> QueryResult<Vec<$model>> {
                let mut unique: Vec<&str> = Vec::with_capacity(names.len());
                for name in names {
                    if !unique.contains(&name.as_str()) {
                        unique.push(name);
                    }
                }
                if unique.is_empty() {
                    return Ok(Vec::new());
                }

                let rows: Vec<_> = unique
                    .iter()
                    .map(|name| ($table::user_id.eq(user_id), $table::name.eq(*name)))
                    .collect();

                // The no-op update makes RETURNING include rows that already existed.
                diesel::insert_into($table::table)
                    .values(rows)
                    .on_conflict(($table::user_id, $table::name))
                    .do_update()
                    .set($table::name.eq(excluded($table::name)))
                    .returning($model::as_returning())
                    .get_results(conn)
            }

            /// Make `ids` the complete set attached to the recipe.
            pub fn replace_for_recipe(
                conn: &mut PgConnection,
                recipe_id: i64,
                ids: &[i64],
            ) -> QueryResult<()> {
                diesel::delete($link::table.filter($link::recipe_id.eq(recipe_id))).execute(conn)?;

                if ids.is_empty() {
                    return Ok(());
                }

                let rows: Vec<_> = ids
                    .iter()
                    .map(|id| ($link::recipe_id.eq(recipe_id), $link::$link_column.eq(*id)))
                    .collect();

                diesel::insert_into($link::table)
                    .values(rows)
                    .on_conflict_do_nothing()
                    .execute(conn)?;
                Ok(())
            }

            /// Entries attached to each recipe, in the same order as `recipes`.
            pub fn for_recipes(
                conn: &mut PgConnection,
                recipes: &[Recipe],
            ) -> QueryResult<Vec<Vec<$model>>> {
                let rows: Vec<($link_model, $model)> = $link_model::belonging_to(recipes)
                    .inner_join($table::table)
                    .select(($link_model::as_select(), $model::as_select()))
                    .order($table::id.asc())
                    .load(conn)?;

                Ok(rows
                    .grouped_by(recipes)
                    .into_iter()
                    .map(|group| group.into_iter().map(|(_, entry)| entry).collect())
                    .collect())
            }
        }
    };
}

catalog_queries!(
    tags,
    model = Tag,
    table = tags,
    link = recipe_tags,
    link_model = RecipeTag,
    link_column = tag_id,
);

catalog_queries!(
    ingredients,
    model = Ingredient,
    table = ingredients,
    link = recipe_ingredients,
    link_model = RecipeIngredient,
    link_column = ingredient_id,
);
