//! Schema notation parser
//!
//! Notation: `@primary, plain, [partA+partB], plain`. Entries are separated by
//! `,`; an `@` prefix marks the primary key; brackets wrap a composite key whose
//! members are joined by `+`. A `+` outside brackets still splits the entry
//! into separate fields, but they are not flagged as composite.

use super::model::FieldDescriptor;

const FIELD_SEPARATOR: char = ',';
const COMPOSITE_SEPARATOR: char = '+';
const PRIMARY_KEY_MARKER: char = '@';
const COMPOSITE_OPEN: char = '[';
const COMPOSITE_CLOSE: char = ']';

/// Parse a notation string into an ordered field list
///
/// Field order follows declaration order. Duplicates pass through; callers
/// that need a set must de-duplicate. Only the first `@` entry is flagged as
/// primary key, on its first part; later ones become plain fields.
pub fn parse_notation(notation: &str) -> Vec<FieldDescriptor> {
    let mut fields = Vec::new();
    let mut seen_primary = false;

    for entry in notation.split(FIELD_SEPARATOR) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let is_composite = entry.starts_with(COMPOSITE_OPEN);
        let mut wants_primary =
            !is_composite && entry.starts_with(PRIMARY_KEY_MARKER) && !seen_primary;

        for part in entry.split(COMPOSITE_SEPARATOR) {
            let name = clean_name(part);
            if name.is_empty() {
                continue;
            }
            let field = if is_composite {
                FieldDescriptor::composite(name)
            } else if wants_primary {
                wants_primary = false;
                seen_primary = true;
                FieldDescriptor::primary(name)
            } else {
                FieldDescriptor::plain(name)
            };
            fields.push(field);
        }
    }

    fields
}

/// Strip structural markers and surrounding whitespace from a field name
fn clean_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(*c, PRIMARY_KEY_MARKER | COMPOSITE_OPEN | COMPOSITE_CLOSE))
        .collect::<String>()
        .trim()
        .to_string()
}
