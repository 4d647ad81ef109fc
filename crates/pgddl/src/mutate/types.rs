//! `CREATE TYPE ... AS ENUM`, `ALTER TYPE`, `DROP TYPE`.

use crate::error::{ObjectKind, SimError, SimResult};
use crate::lexer::Lexer;
use crate::scan::split_top_level;
use crate::schema::{SchemaState, TypeDefinition};

/// `CREATE TYPE name AS ENUM ('a', 'b', ...)`, with the lexer positioned after `TYPE`.
///
/// Labels keep their escape sequences: `'b\''` is stored as `b\'`.
pub(crate) fn create_type(state: &mut SchemaState, lx: &mut Lexer<'_>) -> SimResult<()> {
    let name = lx.ident()?;
    lx.expect_keywords(&["AS", "ENUM"])?;

    let mut labels = Vec::new();
    for item in split_top_level(lx.group()?, ',')? {
        let mut item_lx = Lexer::new(item);
        labels.push(item_lx.literal()?.to_string());
        item_lx.expect_eof()?;
    }
    lx.expect_eof()?;

    if state.types.contains_key(&name) {
        return Err(SimError::already_exists(ObjectKind::Type, name));
    }

    tracing::trace!(r#type = %name, labels = labels.len(), "create enum type");
    state
        .types
        .insert(name.clone(), TypeDefinition::new_enum(name, labels));
    Ok(())
}

/// `ALTER TYPE name ...`, with the lexer positioned after `TYPE`.
///
/// Supported actions: `ADD VALUE [IF NOT EXISTS] 'v' [BEFORE 'ref' | AFTER 'ref']`,
/// `RENAME VALUE 'a' TO 'b'`, `RENAME TO new_name`.
pub(crate) fn alter_type(state: &mut SchemaState, lx: &mut Lexer<'_>) -> SimResult<()> {
    let name = lx.ident()?;

    if lx.eat_keywords(&["ADD", "VALUE"])? {
        let if_not_exists = lx.eat_keywords(&["IF", "NOT", "EXISTS"])?;
        let label = lx.literal()?.to_string();

        enum Anchor {
            Before(String),
            After(String),
            End,
        }
        let anchor = if lx.eat_keyword("BEFORE")? {
            Anchor::Before(lx.literal()?.to_string())
        } else if lx.eat_keyword("AFTER")? {
            Anchor::After(lx.literal()?.to_string())
        } else {
            Anchor::End
        };
        lx.expect_eof()?;

        let ty = state.type_mut(&name)?;
        if ty.label_position(&label).is_some() {
            if if_not_exists {
                tracing::debug!(r#type = %name, %label, "enum label exists, skipping");
                return Ok(());
            }
            return Err(SimError::already_exists(ObjectKind::EnumLabel, label));
        }

        let at = match anchor {
            Anchor::Before(r) => position_of(ty, &r)?,
            Anchor::After(r) => position_of(ty, &r)? + 1,
            Anchor::End => ty.labels.len(),
        };
        tracing::trace!(r#type = %name, %label, at, "add enum label");
        ty.labels.insert(at, label);
        return Ok(());
    }

    if lx.eat_keywords(&["RENAME", "VALUE"])? {
        let old = lx.literal()?.to_string();
        lx.expect_keyword("TO")?;
        let new = lx.literal()?.to_string();
        lx.expect_eof()?;

        let ty = state.type_mut(&name)?;
        let at = position_of(ty, &old)?;
        if ty.label_position(&new).is_some() {
            return Err(SimError::already_exists(ObjectKind::EnumLabel, new));
        }
        tracing::trace!(r#type = %name, %old, %new, "rename enum label");
        ty.labels[at] = new;
        return Ok(());
    }

    if lx.eat_keywords(&["RENAME", "TO"])? {
        let new_name = lx.ident()?;
        lx.expect_eof()?;

        if !state.types.contains_key(&name) {
            return Err(SimError::not_found(ObjectKind::Type, name));
        }
        if state.types.contains_key(&new_name) {
            return Err(SimError::already_exists(ObjectKind::Type, new_name));
        }
        if let Some(mut ty) = state.types.shift_remove(&name) {
            tracing::trace!(r#type = %name, %new_name, "rename enum type");
            ty.name = new_name.clone();
            state.types.insert(new_name, ty);
        }
        return Ok(());
    }

    Err(lx.unexpected("expected ADD VALUE, RENAME VALUE or RENAME TO"))
}

/// `DROP TYPE [IF EXISTS] name[, ...] [CASCADE | RESTRICT]`, lexer positioned after `TYPE`.
pub(crate) fn drop_type(state: &mut SchemaState, lx: &mut Lexer<'_>) -> SimResult<()> {
    let if_exists = lx.eat_keywords(&["IF", "EXISTS"])?;
    let names = lx.ident_seq()?;
    if !lx.eat_keyword("CASCADE")? {
        lx.eat_keyword("RESTRICT")?;
    }
    lx.expect_eof()?;

    if !if_exists {
        if let Some(missing) = names.iter().find(|n| !state.types.contains_key(*n)) {
            return Err(SimError::not_found(ObjectKind::Type, missing.clone()));
        }
    }

    for name in names {
        if state.types.shift_remove(&name).is_some() {
            tracing::trace!(r#type = %name, "drop type");
        } else {
            tracing::warn!(r#type = %name, "type does not exist, skipping");
        }
    }
    Ok(())
}

fn position_of(ty: &TypeDefinition, label: &str) -> SimResult<usize> {
    ty.label_position(label)
        .ok_or_else(|| SimError::not_found(ObjectKind::EnumLabel, label))
}
