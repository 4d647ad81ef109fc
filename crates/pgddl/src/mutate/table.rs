//! `CREATE TABLE`, `ALTER TABLE`, `DROP TABLE`.

use crate::error::{ObjectKind, SimError, SimResult};
use crate::lexer::Lexer;
use crate::mutate::column::{
    ColumnItem, Constraint, default_expr, parse_column, parse_table_constraint,
    starts_table_constraint,
};
use crate::scan::split_top_level;
use crate::schema::{SchemaState, TableDefinition};

enum TableItem {
    Column(ColumnItem),
    Constraint(Constraint),
}

/// `CREATE TABLE [IF NOT EXISTS] name (item, ...)`, lexer positioned after `TABLE`.
///
/// Columns are added in declaration order first; then every constraint, inline or
/// table-level, becomes an index in declaration order (a primary key always lands first).
pub(crate) fn create_table(state: &mut SchemaState, lx: &mut Lexer<'_>) -> SimResult<()> {
    let if_not_exists = lx.eat_keywords(&["IF", "NOT", "EXISTS"])?;
    let name = lx.ident()?;
    let body = lx.group()?;
    lx.expect_eof()?;

    if state.tables.contains_key(&name) {
        if if_not_exists {
            tracing::debug!(table = %name, "table exists, skipping");
            return Ok(());
        }
        return Err(SimError::already_exists(ObjectKind::Table, name));
    }

    let mut items = Vec::new();
    for item in split_top_level(body, ',')? {
        let mut item_lx = Lexer::new(item);
        if starts_table_constraint(&mut item_lx)? {
            items.push(TableItem::Constraint(parse_table_constraint(&mut item_lx)?));
        } else {
            items.push(TableItem::Column(parse_column(&mut item_lx)?));
        }
    }

    let mut table = TableDefinition::new(name.clone());
    for item in &items {
        if let TableItem::Column(c) = item {
            if table.columns.contains_key(&c.column.name) {
                return Err(SimError::already_exists(
                    ObjectKind::Column,
                    c.column.name.clone(),
                ));
            }
            table.columns.insert(c.column.name.clone(), c.column.clone());
        }
    }
    for item in items {
        let constraints = match item {
            TableItem::Column(c) => c.constraints,
            TableItem::Constraint(c) => vec![c],
        };
        for c in constraints {
            let index = c.into_index(&table);
            table.add_index(index)?;
        }
    }

    tracing::trace!(
        table = %name,
        columns = table.columns.len(),
        indexes = table.indexes.len(),
        "create table"
    );
    state.tables.insert(name, table);
    Ok(())
}

/// `DROP TABLE [IF EXISTS] name[, ...] [CASCADE | RESTRICT]`, lexer positioned after `TABLE`.
pub(crate) fn drop_table(state: &mut SchemaState, lx: &mut Lexer<'_>) -> SimResult<()> {
    let if_exists = lx.eat_keywords(&["IF", "EXISTS"])?;
    let names = lx.ident_seq()?;
    if !lx.eat_keyword("CASCADE")? {
        lx.eat_keyword("RESTRICT")?;
    }
    lx.expect_eof()?;

    if !if_exists {
        if let Some(missing) = names.iter().find(|n| !state.tables.contains_key(*n)) {
            return Err(SimError::not_found(ObjectKind::Table, missing.clone()));
        }
    }

    for name in names {
        if state.tables.shift_remove(&name).is_some() {
            tracing::trace!(table = %name, "drop table");
        } else {
            tracing::warn!(table = %name, "table does not exist, skipping");
        }
    }
    Ok(())
}

/// `ALTER TABLE [IF EXISTS] [ONLY] name action[, action...]`, lexer positioned after
/// `TABLE`.
///
/// Actions run left to right against the same table, each observing the previous ones.
/// There is no rollback: when an action fails, the earlier ones stay applied.
pub(crate) fn alter_table(state: &mut SchemaState, lx: &mut Lexer<'_>) -> SimResult<()> {
    let if_exists = lx.eat_keywords(&["IF", "EXISTS"])?;
    lx.eat_keyword("ONLY")?;
    let mut name = lx.ident()?;

    let actions = split_top_level(lx.rest(), ',')?;
    if actions.is_empty() {
        return Err(lx.unexpected("expected an ALTER TABLE action"));
    }

    if !state.tables.contains_key(&name) {
        if if_exists {
            tracing::warn!(table = %name, "table does not exist, skipping");
            return Ok(());
        }
        return Err(SimError::not_found(ObjectKind::Table, name));
    }

    let mut last_column = None;
    for action in actions {
        tracing::trace!(table = %name, %action, "alter table action");
        apply_action(state, &mut name, &mut last_column, action)?;
    }
    Ok(())
}

fn apply_action(
    state: &mut SchemaState,
    table_name: &mut String,
    last_column: &mut Option<String>,
    action: &str,
) -> SimResult<()> {
    let mut lx = Lexer::new(action);

    // `ALTER COLUMN c SET NOT NULL, SET DEFAULT 1`: a bare column action continues the
    // previous ALTER COLUMN.
    if let Some(column) = last_column.as_deref() {
        if continues_alter_column(&lx)? {
            let table = state.table_mut(table_name.as_str())?;
            return alter_column_action(table, column, &mut lx);
        }
    }
    *last_column = None;

    if lx.eat_keyword("RENAME")? {
        if lx.eat_keyword("TO")? {
            let new_name = lx.ident()?;
            lx.expect_eof()?;
            return rename_table(state, table_name, new_name);
        }
        let table = state.table_mut(table_name.as_str())?;
        if lx.eat_keyword("CONSTRAINT")? {
            return rename_constraint(table, &mut lx);
        }
        lx.eat_keyword("COLUMN")?;
        return rename_column(table, &mut lx);
    }

    let table = state.table_mut(table_name.as_str())?;
    if lx.eat_keyword("ADD")? {
        if lx.eat_keyword("COLUMN")? || !starts_table_constraint(&mut lx)? {
            return add_column(table, &mut lx);
        }
        let index = parse_table_constraint(&mut lx)?.into_index(table);
        return table.add_index(index);
    }
    if lx.eat_keyword("DROP")? {
        if lx.eat_keyword("CONSTRAINT")? {
            return drop_constraint(table, &mut lx);
        }
        lx.eat_keyword("COLUMN")?;
        return drop_column(table, &mut lx);
    }
    if lx.eat_keyword("ALTER")? {
        lx.eat_keyword("COLUMN")?;
        let column = lx.ident()?;
        alter_column_action(table, &column, &mut lx)?;
        *last_column = Some(column);
        return Ok(());
    }

    Err(SimError::unsupported(action))
}

/// `ADD [COLUMN] [IF NOT EXISTS] name type [modifiers]`: the column is appended and its
/// inline constraints become indexes. Either all of it lands or none of it does.
fn add_column(table: &mut TableDefinition, lx: &mut Lexer<'_>) -> SimResult<()> {
    let if_not_exists = lx.eat_keywords(&["IF", "NOT", "EXISTS"])?;
    let item = parse_column(lx)?;

    if table.columns.contains_key(&item.column.name) {
        if if_not_exists {
            tracing::debug!(table = %table.name, column = %item.column.name, "column exists, skipping");
            return Ok(());
        }
        return Err(SimError::already_exists(
            ObjectKind::Column,
            item.column.name,
        ));
    }

    let mut staged = table.clone();
    staged
        .columns
        .insert(item.column.name.clone(), item.column);
    for c in item.constraints {
        let index = c.into_index(&staged);
        staged.add_index(index)?;
    }
    *table = staged;
    Ok(())
}

/// `DROP [COLUMN] [IF EXISTS] name [IF EXISTS] [CASCADE | RESTRICT]`.
///
/// Only the column entry is removed; indexes naming the column are left as they are.
fn drop_column(table: &mut TableDefinition, lx: &mut Lexer<'_>) -> SimResult<()> {
    let mut if_exists = lx.eat_keywords(&["IF", "EXISTS"])?;
    let column = lx.ident()?;
    if_exists |= lx.eat_keywords(&["IF", "EXISTS"])?;
    if !lx.eat_keyword("CASCADE")? {
        lx.eat_keyword("RESTRICT")?;
    }
    lx.expect_eof()?;

    if table.columns.shift_remove(&column).is_none() {
        if if_exists {
            tracing::warn!(table = %table.name, %column, "column does not exist, skipping");
            return Ok(());
        }
        return Err(SimError::not_found(ObjectKind::Column, column));
    }
    Ok(())
}

fn continues_alter_column(lx: &Lexer<'_>) -> SimResult<bool> {
    let mut ahead = lx.clone();
    Ok(ahead.peek_keyword("SET")?
        || ahead.peek_keyword("TYPE")?
        || ahead.eat_keywords(&["DROP", "DEFAULT"])?
        || ahead.eat_keywords(&["DROP", "NOT", "NULL"])?)
}

/// Column action after `ALTER [COLUMN] name`: `TYPE t`, `SET DATA TYPE t [USING expr]`,
/// `SET DEFAULT expr`, `DROP DEFAULT`, `SET NOT NULL` or `DROP NOT NULL`.
fn alter_column_action(
    table: &mut TableDefinition,
    name: &str,
    lx: &mut Lexer<'_>,
) -> SimResult<()> {
    if lx.eat_keyword("TYPE")? || lx.eat_keywords(&["SET", "DATA", "TYPE"])? {
        let Some(data_type) = lx.span_until(&["USING"])? else {
            return Err(lx.unexpected("expected a data type"));
        };
        if lx.eat_keyword("USING")? && lx.span_until(&[])?.is_none() {
            return Err(lx.unexpected("expected a USING expression"));
        }
        lx.expect_eof()?;
        table.column_mut(name)?.data_type = data_type.to_string();
    } else if lx.eat_keywords(&["SET", "DEFAULT"])? {
        let expr = default_expr(lx, &[])?;
        lx.expect_eof()?;
        table.column_mut(name)?.modifiers.default = Some(expr.to_string());
    } else if lx.eat_keywords(&["DROP", "DEFAULT"])? {
        lx.expect_eof()?;
        table.column_mut(name)?.modifiers.default = None;
    } else if lx.eat_keywords(&["SET", "NOT", "NULL"])? {
        lx.expect_eof()?;
        table.column_mut(name)?.modifiers.not_null = true;
    } else if lx.eat_keywords(&["DROP", "NOT", "NULL"])? {
        lx.expect_eof()?;
        table.column_mut(name)?.modifiers.not_null = false;
    } else {
        return Err(lx.unexpected(&format!("unsupported ALTER COLUMN action for \"{name}\"")));
    }
    Ok(())
}

/// `RENAME [COLUMN] old TO new`. The renamed entry moves to the end of the column map.
fn rename_column(table: &mut TableDefinition, lx: &mut Lexer<'_>) -> SimResult<()> {
    let old = lx.ident()?;
    lx.expect_keyword("TO")?;
    let new = lx.ident()?;
    lx.expect_eof()?;

    if !table.columns.contains_key(&old) {
        return Err(SimError::not_found(ObjectKind::Column, old));
    }
    if old != new && table.columns.contains_key(&new) {
        return Err(SimError::already_exists(ObjectKind::Column, new));
    }
    if let Some(mut column) = table.columns.shift_remove(&old) {
        column.name = new.clone();
        table.columns.insert(new, column);
    }
    Ok(())
}

fn rename_table(state: &mut SchemaState, table_name: &mut String, new_name: String) -> SimResult<()> {
    if state.tables.contains_key(&new_name) {
        return Err(SimError::already_exists(ObjectKind::Table, new_name));
    }
    let Some(mut table) = state.tables.shift_remove(table_name.as_str()) else {
        return Err(SimError::not_found(ObjectKind::Table, table_name.clone()));
    };
    tracing::trace!(table = %table_name, %new_name, "rename table");
    table.name = new_name.clone();
    state.tables.insert(new_name.clone(), table);
    *table_name = new_name;
    Ok(())
}

/// `RENAME CONSTRAINT old TO new`.
fn rename_constraint(table: &mut TableDefinition, lx: &mut Lexer<'_>) -> SimResult<()> {
    let old = lx.ident()?;
    lx.expect_keyword("TO")?;
    let new = lx.ident()?;
    lx.expect_eof()?;

    if table.index(&new).is_some() {
        return Err(SimError::already_exists(ObjectKind::Constraint, new));
    }
    let Some(index) = table.indexes.iter_mut().find(|i| i.name() == old) else {
        return Err(SimError::not_found(ObjectKind::Constraint, old));
    };
    index.set_name(new);
    Ok(())
}

/// `DROP CONSTRAINT [IF EXISTS] name [CASCADE | RESTRICT]`.
fn drop_constraint(table: &mut TableDefinition, lx: &mut Lexer<'_>) -> SimResult<()> {
    let if_exists = lx.eat_keywords(&["IF", "EXISTS"])?;
    let name = lx.ident()?;
    if !lx.eat_keyword("CASCADE")? {
        lx.eat_keyword("RESTRICT")?;
    }
    lx.expect_eof()?;

    match table.indexes.iter().position(|i| i.name() == name) {
        Some(at) => {
            table.indexes.remove(at);
            Ok(())
        }
        None if if_exists => {
            tracing::warn!(table = %table.name, constraint = %name, "constraint does not exist, skipping");
            Ok(())
        }
        None => Err(SimError::not_found(ObjectKind::Constraint, name)),
    }
}
