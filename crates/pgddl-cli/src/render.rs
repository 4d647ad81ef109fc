use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use pgddl::{IndexDefinition, ReferentialAction, SchemaState, TableDefinition};

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold).fg(Color::Cyan))
        .collect()
}

fn new_table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(titles));
    table
}

/// Human-readable rendering of a schema: one table for enum types, then one per table.
pub fn schema_tables(schema: &SchemaState) -> String {
    let mut out = String::new();

    if !schema.types.is_empty() {
        let mut types = new_table(&["Type", "Labels"]);
        for ty in schema.types.values() {
            types.add_row(vec![
                Cell::new(&ty.name).fg(Color::Yellow),
                Cell::new(ty.labels.join(", ")),
            ]);
        }
        out.push_str(&types.to_string());
        out.push('\n');
    }

    for table in schema.tables.values() {
        out.push('\n');
        out.push_str(&table.name);
        out.push('\n');
        out.push_str(&columns_table(table).to_string());
        out.push('\n');
        if !table.indexes.is_empty() {
            out.push_str(&indexes_table(table).to_string());
            out.push('\n');
        }
    }

    if out.is_empty() {
        out.push_str("(empty schema)\n");
    }
    out
}

fn columns_table(table: &TableDefinition) -> Table {
    let mut t = new_table(&["Column", "Type", "Not Null", "Default"]);
    for col in table.columns.values() {
        t.add_row(vec![
            Cell::new(&col.name).fg(Color::Yellow),
            Cell::new(&col.data_type),
            Cell::new(if col.modifiers.not_null { "yes" } else { "" }),
            Cell::new(col.modifiers.default.as_deref().unwrap_or("")).fg(Color::DarkGrey),
        ]);
    }
    t
}

fn indexes_table(table: &TableDefinition) -> Table {
    let mut t = new_table(&["Constraint", "Kind", "Columns", "Details"]);
    for index in &table.indexes {
        let (kind, details) = match index {
            IndexDefinition::PrimaryKey { .. } => ("primary key", String::new()),
            IndexDefinition::Unique { .. } => ("unique", String::new()),
            IndexDefinition::Check { expression, .. } => ("check", expression.clone()),
            IndexDefinition::ForeignKey {
                table_name,
                reference_columns,
                on_delete,
                on_update,
                ..
            } => {
                let mut d = format!("{table_name}({})", reference_columns.join(", "));
                if let Some(a) = on_delete {
                    d.push_str(&format!(" ON DELETE {}", action_sql(*a)));
                }
                if let Some(a) = on_update {
                    d.push_str(&format!(" ON UPDATE {}", action_sql(*a)));
                }
                ("foreign key", d)
            }
        };
        t.add_row(vec![
            Cell::new(index.name()).fg(Color::Yellow),
            Cell::new(kind),
            Cell::new(index.columns().join(", ")),
            Cell::new(details).fg(Color::DarkGrey),
        ]);
    }
    t
}

fn action_sql(a: ReferentialAction) -> &'static str {
    match a {
        ReferentialAction::Cascade => "CASCADE",
        ReferentialAction::Restrict => "RESTRICT",
        ReferentialAction::NoAction => "NO ACTION",
        ReferentialAction::SetNull => "SET NULL",
        ReferentialAction::SetDefault => "SET DEFAULT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgddl::Simulator;

    #[test]
    fn renders_types_columns_and_constraints() {
        let mut sim = Simulator::new();
        sim.simulate_script(
            "CREATE TYPE mood AS ENUM ('sad', 'ok');
             CREATE TABLE person (
                 id serial PRIMARY KEY,
                 team_id int REFERENCES team (id) ON DELETE SET NULL,
                 feeling mood NOT NULL DEFAULT 'ok'
             );",
        )
        .unwrap();

        let out = schema_tables(sim.state());
        for needle in [
            "mood",
            "sad, ok",
            "person",
            "person_pkey",
            "team(id) ON DELETE SET NULL",
            "'ok'",
        ] {
            assert!(out.contains(needle), "missing {needle:?} in\n{out}");
        }
    }

    #[test]
    fn empty_schema() {
        assert_eq!(schema_tables(&SchemaState::default()), "(empty schema)\n");
    }
}
