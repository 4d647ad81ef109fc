//! Column definitions and constraint clauses.
//!
//! Parsing here produces [`ColumnItem`]s and [`Constraint`]s; turning a constraint into an
//! [`IndexDefinition`] needs the owning table (for names and for resolving the columns a
//! table-level `CHECK` refers to), see [`Constraint::into_index`].

use crate::error::{SimError, SimResult};
use crate::lexer::{Lexer, TokenKind, ident_list};
use crate::scan;
use crate::schema::{
    ColumnDefinition, IndexDefinition, ReferentialAction, TableDefinition, default_index_name,
};

/// Keywords that end a column's data type or `DEFAULT` expression.
pub(crate) const COLUMN_STOP: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY",
    "NOT",
    "NULL",
    "UNIQUE",
    "DEFAULT",
    "CHECK",
    "REFERENCES",
];

/// Keywords that start a table-level constraint item.
const TABLE_CONSTRAINT_START: &[&str] = &["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnItem {
    pub column: ColumnDefinition,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Constraint {
    /// Explicit `CONSTRAINT name`.
    pub name: Option<String>,
    /// Declared on a column rather than as a table element.
    pub inline: bool,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConstraintKind {
    PrimaryKey {
        columns: Vec<String>,
    },
    Unique {
        columns: Vec<String>,
    },
    Check {
        expression: String,
        columns: Vec<String>,
    },
    ForeignKey {
        columns: Vec<String>,
        table_name: String,
        reference_columns: Vec<String>,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    },
}

impl Constraint {
    /// Build the index entry for this constraint on `table`.
    ///
    /// Default names follow Postgres: `{table}_pkey` for an inline primary key,
    /// `{table}_{cols}_pkey` for a table-level one, `{table}_{cols}_key`,
    /// `{table}_{col}_check` and `{table}_{cols}_fkey`. A generated name already taken on
    /// `table` gets a numeric suffix (`t_a_check1`); an explicit one is kept as written. A
    /// table-level `CHECK` takes its columns from the table columns mentioned in the
    /// expression.
    pub fn into_index(self, table: &TableDefinition) -> IndexDefinition {
        let base = base_name(&table.name);
        let explicit = self.name;
        let name = |generated: String| match &explicit {
            Some(name) => name.clone(),
            None => table.unused_index_name(generated),
        };
        match self.kind {
            ConstraintKind::PrimaryKey { columns } => {
                let name = if self.inline {
                    name(default_index_name(base, &[], "pkey"))
                } else {
                    name(default_index_name(base, &columns, "pkey"))
                };
                IndexDefinition::PrimaryKey { name, columns }
            }
            ConstraintKind::Unique { columns } => IndexDefinition::Unique {
                name: name(default_index_name(base, &columns, "key")),
                columns,
            },
            ConstraintKind::Check {
                expression,
                columns,
            } => {
                let columns = if self.inline {
                    columns
                } else {
                    referenced_columns(&expression, table)
                };
                let name = name(default_index_name(
                    base,
                    &columns[..columns.len().min(1)],
                    "check",
                ));
                IndexDefinition::Check {
                    name,
                    expression,
                    columns,
                }
            }
            ConstraintKind::ForeignKey {
                columns,
                table_name,
                reference_columns,
                on_delete,
                on_update,
            } => IndexDefinition::ForeignKey {
                name: name(default_index_name(base, &columns, "fkey")),
                columns,
                table_name,
                reference_columns,
                on_delete,
                on_update,
            },
        }
    }
}

/// Unqualified part of a possibly schema-qualified table name.
fn base_name(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}

/// Returns true if the next token starts a table-level constraint.
pub(crate) fn starts_table_constraint(lx: &mut Lexer<'_>) -> SimResult<bool> {
    Ok(lx
        .peek()?
        .is_some_and(|t| t.is_any_keyword(TABLE_CONSTRAINT_START)))
}

/// Parse `name dataType [modifiers...]` up to the end of the lexer input.
pub(crate) fn parse_column(lx: &mut Lexer<'_>) -> SimResult<ColumnItem> {
    let name = lx.ident()?;
    parse_column_rest(lx, name)
}

/// Parse `dataType [modifiers...]` for a column whose name was already consumed.
pub(crate) fn parse_column_rest(lx: &mut Lexer<'_>, name: String) -> SimResult<ColumnItem> {
    let Some(data_type) = lx.span_until(COLUMN_STOP)? else {
        return Err(lx.unexpected(&format!("expected a data type for column \"{name}\"")));
    };

    let mut column = ColumnDefinition::new(name, data_type);
    let mut constraints = Vec::new();
    let mut pending_name: Option<String> = None;

    while !lx.is_eof() {
        if lx.eat_keyword("CONSTRAINT")? {
            pending_name = Some(lx.ident()?);
            continue;
        }

        let col = vec![column.name.clone()];
        let kind = if lx.eat_keywords(&["PRIMARY", "KEY"])? {
            Some(ConstraintKind::PrimaryKey { columns: col })
        } else if lx.eat_keywords(&["NOT", "NULL"])? {
            column.modifiers.not_null = true;
            None
        } else if lx.eat_keyword("NULL")? {
            column.modifiers.not_null = false;
            None
        } else if lx.eat_keyword("UNIQUE")? {
            Some(ConstraintKind::Unique { columns: col })
        } else if lx.eat_keyword("DEFAULT")? {
            column.modifiers.default = Some(default_expr(lx, COLUMN_STOP)?.to_string());
            None
        } else if lx.eat_keyword("CHECK")? {
            Some(ConstraintKind::Check {
                expression: lx.group()?.trim().to_string(),
                columns: col,
            })
        } else if lx.eat_keyword("REFERENCES")? {
            Some(parse_references(lx, col)?)
        } else {
            return Err(lx.unexpected(&format!(
                "unexpected token in definition of column \"{}\"",
                column.name
            )));
        };

        match kind {
            Some(kind) => constraints.push(Constraint {
                name: pending_name.take(),
                inline: true,
                kind,
            }),
            None if pending_name.is_some() => {
                // `CONSTRAINT n NOT NULL` / `CONSTRAINT n DEFAULT ...` names nothing we model.
                pending_name = None;
            }
            None => {}
        }
    }

    if let Some(name) = pending_name {
        return Err(SimError::parse(
            format!("constraint \"{name}\" has no definition"),
            lx.pos(),
        ));
    }

    Ok(ColumnItem {
        column,
        constraints,
    })
}

/// Parse a `DEFAULT` expression: the first token unconditionally (so `DEFAULT NULL`
/// works), then every token up to a `stop` keyword, comma or end.
pub(crate) fn default_expr<'a>(lx: &mut Lexer<'a>, stop: &[&str]) -> SimResult<&'a str> {
    let first = match lx.next_token()? {
        Some(t) if t.kind != TokenKind::Punct => t,
        _ => return Err(lx.unexpected("expected a default expression")),
    };
    let end = lx.range_until(stop)?.map_or(first.end, |(_, e)| e);
    Ok(&lx.src()[first.start..end])
}

/// Parse a table-level constraint item (the whole lexer input).
pub(crate) fn parse_table_constraint(lx: &mut Lexer<'_>) -> SimResult<Constraint> {
    let name = if lx.eat_keyword("CONSTRAINT")? {
        Some(lx.ident()?)
    } else {
        None
    };

    let kind = if lx.eat_keywords(&["PRIMARY", "KEY"])? {
        ConstraintKind::PrimaryKey {
            columns: non_empty_list(lx, "PRIMARY KEY")?,
        }
    } else if lx.eat_keyword("UNIQUE")? {
        ConstraintKind::Unique {
            columns: non_empty_list(lx, "UNIQUE")?,
        }
    } else if lx.eat_keyword("CHECK")? {
        ConstraintKind::Check {
            expression: lx.group()?.trim().to_string(),
            columns: Vec::new(),
        }
    } else if lx.eat_keywords(&["FOREIGN", "KEY"])? {
        let columns = non_empty_list(lx, "FOREIGN KEY")?;
        lx.expect_keyword("REFERENCES")?;
        parse_references(lx, columns)?
    } else {
        return Err(lx.unexpected("expected PRIMARY KEY, UNIQUE, CHECK or FOREIGN KEY"));
    };

    lx.expect_eof()?;
    Ok(Constraint {
        name,
        inline: false,
        kind,
    })
}

fn non_empty_list(lx: &mut Lexer<'_>, what: &str) -> SimResult<Vec<String>> {
    let at = lx.pos();
    let columns = ident_list(lx.group()?)?;
    if columns.is_empty() {
        return Err(SimError::parse(format!("{what} needs at least one column"), at));
    }
    Ok(columns)
}

/// Parse `refTable [(refCol, ...)] [ON DELETE action] [ON UPDATE action]` after
/// `REFERENCES`. Without a column list `reference_columns` stays empty; the referenced
/// table's primary key is not looked up.
fn parse_references(lx: &mut Lexer<'_>, columns: Vec<String>) -> SimResult<ConstraintKind> {
    let table_name = lx.ident()?;
    let reference_columns = match lx.opt_group()? {
        Some(inner) => ident_list(inner)?,
        None => Vec::new(),
    };

    let mut on_delete = None;
    let mut on_update = None;
    loop {
        if lx.eat_keywords(&["ON", "DELETE"])? {
            on_delete = Some(referential_action(lx)?);
        } else if lx.eat_keywords(&["ON", "UPDATE"])? {
            on_update = Some(referential_action(lx)?);
        } else {
            break;
        }
    }

    Ok(ConstraintKind::ForeignKey {
        columns,
        table_name,
        reference_columns,
        on_delete,
        on_update,
    })
}

fn referential_action(lx: &mut Lexer<'_>) -> SimResult<ReferentialAction> {
    if lx.eat_keyword("CASCADE")? {
        Ok(ReferentialAction::Cascade)
    } else if lx.eat_keyword("RESTRICT")? {
        Ok(ReferentialAction::Restrict)
    } else if lx.eat_keywords(&["NO", "ACTION"])? {
        Ok(ReferentialAction::NoAction)
    } else if lx.eat_keywords(&["SET", "NULL"])? {
        Ok(ReferentialAction::SetNull)
    } else if lx.eat_keywords(&["SET", "DEFAULT"])? {
        Ok(ReferentialAction::SetDefault)
    } else {
        Err(lx.unexpected("expected a referential action"))
    }
}

/// Columns of `table` mentioned in `expression`, in order of first appearance.
/// String literals are skipped.
fn referenced_columns(expression: &str, table: &TableDefinition) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |word: &str| {
        if table.columns.contains_key(word) && !found.iter().any(|f| f == word) {
            found.push(word.to_string());
        }
    };

    let mut pos = 0usize;
    let mut word_start: Option<usize> = None;
    while let Some(c) = expression[pos..].chars().next() {
        if c.is_alphanumeric() || c == '_' {
            word_start.get_or_insert(pos);
            pos += c.len_utf8();
            continue;
        }
        if let Some(s) = word_start.take() {
            push(&expression[s..pos]);
        }
        if c == '\'' || c == '"' {
            match scan::scope(expression, pos) {
                Ok(s) => {
                    if c == '"' {
                        push(s.inner);
                    }
                    pos = s.end;
                }
                Err(_) => break,
            }
            continue;
        }
        pos += c.len_utf8();
    }
    if let Some(s) = word_start {
        push(&expression[s..]);
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(src: &str) -> ColumnItem {
        parse_column(&mut Lexer::new(src)).expect("column")
    }

    #[test]
    fn multi_word_type_and_modifiers() {
        let item = column("created_at timestamp without time zone NOT NULL DEFAULT now()");
        assert_eq!(item.column.data_type, "timestamp without time zone");
        assert!(item.column.modifiers.not_null);
        assert_eq!(item.column.modifiers.default.as_deref(), Some("now()"));
        assert!(item.constraints.is_empty());
    }

    #[test]
    fn default_accepts_calls_literals_and_null() {
        let item = column("id uuid DEFAULT gen_random_uuid() PRIMARY KEY");
        assert_eq!(item.column.modifiers.default.as_deref(), Some("gen_random_uuid()"));
        assert_eq!(item.constraints.len(), 1);

        let item = column("label text DEFAULT 'a, (b)'::text NOT NULL");
        assert_eq!(item.column.modifiers.default.as_deref(), Some("'a, (b)'::text"));

        let item = column("note text DEFAULT NULL");
        assert_eq!(item.column.modifiers.default.as_deref(), Some("NULL"));

        let item = column("n numeric(10, 2) DEFAULT coalesce(f(1, 2), (3))");
        assert_eq!(item.column.data_type, "numeric(10, 2)");
        assert_eq!(
            item.column.modifiers.default.as_deref(),
            Some("coalesce(f(1, 2), (3))")
        );
    }

    #[test]
    fn inline_constraints_in_order() {
        let item = column(
            "test_id INTEGER UNIQUE CHECK ( test_id > 0 ) REFERENCES test (id) ON DELETE CASCADE",
        );
        assert_eq!(item.constraints.len(), 3);
        assert_eq!(
            item.constraints[1].kind,
            ConstraintKind::Check {
                expression: "test_id > 0".into(),
                columns: vec!["test_id".into()],
            }
        );
        assert_eq!(
            item.constraints[2].kind,
            ConstraintKind::ForeignKey {
                columns: vec!["test_id".into()],
                table_name: "test".into(),
                reference_columns: vec!["id".into()],
                on_delete: Some(ReferentialAction::Cascade),
                on_update: None,
            }
        );
    }

    #[test]
    fn named_inline_constraint() {
        let item = column("email text CONSTRAINT users_email_uniq UNIQUE");
        assert_eq!(item.constraints[0].name.as_deref(), Some("users_email_uniq"));
    }

    #[test]
    fn missing_type_or_junk_is_an_error() {
        assert!(parse_column(&mut Lexer::new("id NOT NULL")).is_err());
        assert!(parse_column(&mut Lexer::new("id int NOT NULL junk")).is_err());
        assert!(parse_column(&mut Lexer::new("id int CONSTRAINT dangling")).is_err());
    }

    #[test]
    fn table_check_resolves_referenced_columns() {
        let table = TableDefinition::new("orders")
            .with_column(ColumnDefinition::new("qty", "int"))
            .with_column(ColumnDefinition::new("price", "int"));

        let c = parse_table_constraint(&mut Lexer::new("CHECK (price * qty > 0 AND 'qty' <> '')"))
            .unwrap();
        let IndexDefinition::Check { name, columns, .. } = c.into_index(&table) else {
            panic!("expected check");
        };
        assert_eq!(columns, vec!["price", "qty"]);
        assert_eq!(name, "orders_price_check");

        let c = parse_table_constraint(&mut Lexer::new("CHECK (now() > '2020-01-01')")).unwrap();
        assert_eq!(c.into_index(&table).name(), "orders_check");
    }

    #[test]
    fn table_level_names() {
        let table = TableDefinition::new("public.test");
        let pk = parse_table_constraint(&mut Lexer::new("PRIMARY KEY (a, b)")).unwrap();
        assert_eq!(pk.into_index(&table).name(), "test_a_b_pkey");

        let fk = parse_table_constraint(&mut Lexer::new(
            "CONSTRAINT fk_owner FOREIGN KEY (owner_id) REFERENCES users (id)",
        ))
        .unwrap();
        assert_eq!(fk.into_index(&table).name(), "fk_owner");

        assert!(parse_table_constraint(&mut Lexer::new("PRIMARY KEY ()")).is_err());
        assert!(parse_table_constraint(&mut Lexer::new("EXCLUDE (a WITH =)")).is_err());
    }
}
