//! Instruction templates
//!
//! `{{name}}` is replaced by the named value, `{{#name}} ... {{/name}}`
//! keeps its body only when the value is non-blank.
//!
//! Tags are read from the template alone. Substituted values are written
//! straight to the output and never scanned again, so snapshot text that
//! looks like a tag stays literal.

pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    render_into(&mut out, template, values);
    out
}

fn lookup<'a>(values: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
    values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

fn render_into(out: &mut String, template: &str, values: &[(&str, &str)]) {
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return;
        };
        let tag = &after[..end];
        let tail = &after[end + 2..];

        if let Some(name) = tag.strip_prefix('#') {
            let close = format!("{{{{/{}}}}}", name);
            if let Some(close_at) = tail.find(&close) {
                if lookup(values, name).is_some_and(|v| !v.trim().is_empty()) {
                    render_into(out, &tail[..close_at], values);
                }
                rest = &tail[close_at + close.len()..];
                continue;
            }
        } else if let Some(value) = lookup(values, tag) {
            out.push_str(value);
            rest = tail;
            continue;
        }

        // Not a known tag: keep the braces and move on
        out.push_str("{{");
        rest = after;
    }

    out.push_str(rest);
}
