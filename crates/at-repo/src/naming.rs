//! Branch/commit-message derivation (spec.md §6.2, P8), grounded on
//! `original_source/autotransform/repo/git.py`'s `GitRepo.get_branch_name`/
//! `get_commit_message`.

/// Replaces `[n/m]` with `n_m` and spaces with underscores, e.g.
/// `"[1/3] Fix foo"` → `"1_3_Fix_foo"`.
fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut chars = title.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '[' {
            let mut inner = String::new();
            let mut closed = false;
            for c2 in chars.by_ref() {
                if c2 == ']' {
                    closed = true;
                    break;
                }
                inner.push(c2);
            }
            if closed && inner.contains('/') {
                out.push_str(&inner.replace('/', "_"));
            } else {
                out.push('[');
                out.push_str(&inner);
                if closed {
                    out.push(']');
                }
            }
        } else if c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// `"AUTO_TRANSFORM/<schema_name>/<sanitized_title>"` (spec.md §6.2, P8).
pub fn branch_name(schema_name: &str, title: &str) -> String {
    format!("AUTO_TRANSFORM/{schema_name}/{}", sanitize_title(title))
}

/// `"[AutoTransform][<schema_name>] <title>"`.
pub fn commit_message(schema_name: &str, title: &str) -> String {
    format!("[AutoTransform][{schema_name}] {title}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_matches_p8() {
        assert_eq!(
            branch_name("FooSchema", "[1/3] Fix foo"),
            "AUTO_TRANSFORM/FooSchema/1_3_Fix_foo"
        );
    }

    #[test]
    fn branch_name_without_chunk_prefix_just_underscores_spaces() {
        assert_eq!(branch_name("FooSchema", "Fix foo bar"), "AUTO_TRANSFORM/FooSchema/Fix_foo_bar");
    }

    #[test]
    fn commit_message_prefixes_schema_name() {
        assert_eq!(
            commit_message("FooSchema", "Fix foo"),
            "[AutoTransform][FooSchema] Fix foo"
        );
    }
}
