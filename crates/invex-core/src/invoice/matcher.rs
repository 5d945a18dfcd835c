//! Template identification.

use tracing::{debug, info, warn};

use crate::models::template::{Template, TemplateSet};

use super::pattern::compile;

/// Select the template that applies to `text`.
///
/// Non-default templates are tried in name order and the first whose `match`
/// pattern is found anywhere in the text wins. Templates without a pattern,
/// or with a pattern that does not compile, never win the search. When
/// nothing matches, the `default` template is returned if present.
pub fn select<'a>(text: &str, templates: &'a TemplateSet) -> Option<&'a Template> {
    for template in templates.iter().filter(|t| !t.is_default()) {
        let Some(pattern) = template.match_pattern.as_deref() else {
            continue;
        };

        match compile(pattern) {
            Ok(re) if re.is_match(text) => {
                info!("Document matched template '{}'", template.name);
                return Some(template);
            }
            Ok(_) => debug!("Template '{}' did not match", template.name),
            Err(e) => warn!(
                "Template '{}' has an invalid match pattern, skipping: {}",
                template.name, e
            ),
        }
    }

    let fallback = templates.default_template();
    match fallback {
        Some(_) => info!("No template matched, using default template"),
        None => warn!("No template matched and no default template is loaded"),
    }
    fallback
}
