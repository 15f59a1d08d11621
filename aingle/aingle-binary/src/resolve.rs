//! Compatibility rules between a writer schema node and a reader schema node.
//!
//! Both nodes are expected to be dereferenced already (no [`Schema::Ref`]).

use aingle_core::{Name, Names, Schema, UnionSchema};

/// Numeric widening permitted when reading: `int` to `long`/`float`/`double`,
/// `long` to `float`/`double`, `float` to `double`.
pub fn is_promotable(writer: &Schema, reader: &Schema) -> bool {
    matches!(
        (writer, reader),
        (Schema::Int, Schema::Long | Schema::Float | Schema::Double)
            | (Schema::Long, Schema::Float | Schema::Double)
            | (Schema::Float, Schema::Double)
    )
}

/// Whether the named writer type may be read as the named reader type:
/// equal full names, equal unqualified names, or an alias on either side
/// naming the other.
pub fn names_match(writer: &Schema, reader: &Schema) -> bool {
    match (writer.name(), reader.name()) {
        (Some(w), Some(r)) => {
            w == r
                || w.name == r.name
                || reader.aliases().contains(w)
                || writer.aliases().contains(r)
        }
        _ => false,
    }
}

/// Strictest name match: full names equal or a reader alias names the writer.
fn full_names_match(writer: &Name, reader: &Schema) -> bool {
    reader.name() == Some(writer) || reader.aliases().contains(writer)
}

/// Kind tag used for branch matching; logical types count as their base.
fn kind(schema: &Schema) -> &'static str {
    match schema {
        Schema::Logical(logical) => kind(&logical.base),
        other => other.type_name(),
    }
}

fn strip_logical(schema: &Schema) -> &Schema {
    match schema {
        Schema::Logical(logical) => &logical.base,
        other => other,
    }
}

/// Pick the reader union branch that reads data written under the
/// (non-union) `writer` schema.
///
/// Three passes over the branches, first hit wins:
/// 1. same kind and, for named types, the same full name (or a reader alias);
/// 2. same named kind with the same unqualified name;
/// 3. a numeric promotion from the writer kind.
pub fn select_union_branch(
    writer: &Schema,
    reader: &UnionSchema,
    names: &Names,
) -> Option<usize> {
    let writer = strip_logical(writer);
    let branches: Vec<&Schema> = reader
        .variants()
        .iter()
        .map(|branch| strip_logical(branch.deref(names).unwrap_or(branch)))
        .collect();

    let exact = branches.iter().position(|branch| {
        kind(branch) == kind(writer)
            && match writer.name() {
                Some(name) => full_names_match(name, branch),
                None => true,
            }
    });
    if exact.is_some() {
        return exact;
    }

    let unqualified = writer.name().and_then(|w| {
        branches.iter().position(|branch| {
            kind(branch) == kind(writer) && branch.name().is_some_and(|r| r.name == w.name)
        })
    });
    if unqualified.is_some() {
        return unqualified;
    }

    branches
        .iter()
        .position(|branch| is_promotable(writer, branch))
}
