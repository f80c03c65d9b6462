//! Row and column editing for `table > table_row > (table_cell | table_header)`.

use crate::commands::{Command, command, emit};
use crate::core::{Attrs, EditorState, Node};
use crate::ops::{Op, Path, Transaction};
use crate::schema::Schema;

pub const TABLE: &str = "table";
pub const TABLE_ROW: &str = "table_row";
pub const TABLE_CELL: &str = "table_cell";
pub const TABLE_HEADER: &str = "table_header";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableContext {
    pub table: Path,
    pub row: usize,
    pub col: usize,
}

impl TableContext {
    fn row_path(&self, row: usize) -> Path {
        let mut path = self.table.clone();
        path.push(row);
        path
    }

    fn cell_path(&self, row: usize, col: usize) -> Path {
        let mut path = self.row_path(row);
        path.push(col);
        path
    }
}

/// The innermost table cell holding the selection head.
pub fn table_context(state: &EditorState) -> Option<TableContext> {
    let doc = state.doc();
    let block = state.selection().focus.block_path();
    for len in (3..block.len()).rev() {
        let cell = &block[..len];
        let table = &cell[..len - 2];
        let row = &cell[..len - 1];
        let is_cell = matches!(doc.kind_at(cell), Some(TABLE_CELL) | Some(TABLE_HEADER));
        if is_cell && doc.kind_at(row) == Some(TABLE_ROW) && doc.kind_at(table) == Some(TABLE) {
            return Some(TableContext {
                table: table.to_vec(),
                row: cell[len - 2],
                col: cell[len - 1],
            });
        }
    }
    None
}

fn rows<'a>(state: &'a EditorState, ctx: &TableContext) -> &'a [Node] {
    state.doc().children_at(&ctx.table).unwrap_or(&[])
}

fn row_cells(row: &Node) -> &[Node] {
    row.as_element()
        .map(|el| el.children.as_slice())
        .unwrap_or(&[])
}

fn default_block_kind(schema: &Schema) -> &str {
    if schema.is_text_block("paragraph") {
        return "paragraph";
    }
    schema
        .nodes()
        .iter()
        .find(|spec| spec.is_text_block() && !spec.code)
        .map(|spec| spec.kind.as_str())
        .unwrap_or("paragraph")
}

fn empty_cell(schema: &Schema, kind: &str) -> Node {
    Node::element(
        kind,
        Attrs::default(),
        vec![Node::element(
            default_block_kind(schema),
            Attrs::default(),
            vec![Node::text("")],
        )],
    )
}

fn table_command(
    source: &'static str,
    build: impl Fn(&EditorState, &TableContext) -> Option<Vec<Op>> + Send + Sync + 'static,
) -> Command {
    command(move |state, dispatch| {
        let Some(ctx) = table_context(state) else {
            return false;
        };
        let Some(ops) = build(state, &ctx) else {
            return false;
        };
        if ops.is_empty() {
            return false;
        }
        emit(dispatch, Transaction::new(ops).source(source))
    })
}

fn add_column(state: &EditorState, ctx: &TableContext, after: bool) -> Option<Vec<Op>> {
    let at = ctx.col + usize::from(after);
    let ops = rows(state, ctx)
        .iter()
        .enumerate()
        .map(|(row_ix, row)| {
            let cells = row_cells(row);
            // New cells take the kind of the current column's cell in the same row.
            let kind = cells
                .get(ctx.col.min(cells.len().saturating_sub(1)))
                .and_then(Node::kind)
                .unwrap_or(TABLE_CELL);
            Op::InsertNode {
                path: ctx.cell_path(row_ix, at.min(cells.len())),
                node: empty_cell(state.schema(), kind),
            }
        })
        .collect();
    Some(ops)
}

fn add_row(state: &EditorState, ctx: &TableContext, after: bool) -> Option<Vec<Op>> {
    let width = row_cells(rows(state, ctx).get(ctx.row)?).len().max(1);
    let cells = (0..width)
        .map(|_| empty_cell(state.schema(), TABLE_CELL))
        .collect();
    Some(vec![Op::InsertNode {
        path: ctx.row_path(ctx.row + usize::from(after)),
        node: Node::element(TABLE_ROW, Attrs::default(), cells),
    }])
}

pub fn add_column_before() -> Command {
    table_command("add_column_before", |state, ctx| add_column(state, ctx, false))
}

pub fn add_column_after() -> Command {
    table_command("add_column_after", |state, ctx| add_column(state, ctx, true))
}

pub fn add_row_before() -> Command {
    table_command("add_row_before", |state, ctx| add_row(state, ctx, false))
}

pub fn add_row_after() -> Command {
    table_command("add_row_after", |state, ctx| add_row(state, ctx, true))
}

/// Not applicable when every row is down to a single cell.
pub fn delete_column() -> Command {
    table_command("delete_column", |state, ctx| {
        let rows = rows(state, ctx);
        if rows.iter().all(|row| row_cells(row).len() <= 1) {
            return None;
        }
        let ops = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row_cells(row).len() > ctx.col)
            .map(|(row_ix, _)| Op::RemoveNode {
                path: ctx.cell_path(row_ix, ctx.col),
            })
            .collect();
        Some(ops)
    })
}

/// Not applicable on a single-row table.
pub fn delete_row() -> Command {
    table_command("delete_row", |state, ctx| {
        if rows(state, ctx).len() <= 1 {
            return None;
        }
        Some(vec![Op::RemoveNode {
            path: ctx.row_path(ctx.row),
        }])
    })
}

pub fn delete_table() -> Command {
    table_command("delete_table", |state, ctx| {
        let (_, parent) = ctx.table.split_last()?;
        let siblings = state.doc().children_at(parent)?.len();
        let mut ops = vec![Op::RemoveNode {
            path: ctx.table.clone(),
        }];
        if siblings == 1 {
            ops.push(Op::InsertNode {
                path: ctx.table.clone(),
                node: Node::element(
                    default_block_kind(state.schema()),
                    Attrs::default(),
                    vec![Node::text("")],
                ),
            });
        }
        Some(ops)
    })
}

/// Makes the first row header cells, or plain cells when it already is one.
pub fn toggle_header_row() -> Command {
    table_command("toggle_header_row", |state, ctx| {
        let first = rows(state, ctx).first()?;
        let cells = row_cells(first);
        let all_headers = !cells.is_empty() && cells.iter().all(|c| c.kind() == Some(TABLE_HEADER));
        let target = if all_headers { TABLE_CELL } else { TABLE_HEADER };

        let ops = cells
            .iter()
            .enumerate()
            .filter_map(|(col, cell)| {
                let el = cell.as_element()?;
                if el.kind == target {
                    return None;
                }
                Some(Op::ReplaceNode {
                    path: ctx.cell_path(0, col),
                    node: Node::element(target, el.attrs.clone(), el.children.clone()),
                })
            })
            .collect();
        Some(ops)
    })
}
