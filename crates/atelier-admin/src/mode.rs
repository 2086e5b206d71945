//! Mode model and mode-aware URL rewriting.

use url::form_urlencoded;

/// Query parameter carrying the UI mode.
pub const MODE_QUERY_PARAM: &str = "mode";

/// The only parameter value that selects admin mode.
pub const ADMIN_MODE_VALUE: &str = "admin";

/// UI mode: ordinary viewing or privileged editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Admin,
}

impl Mode {
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::View => Self::Admin,
            Self::Admin => Self::View,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Admin => ADMIN_MODE_VALUE,
        }
    }
}

struct TargetParts<'a> {
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

fn split_target(target: &str) -> TargetParts<'_> {
    let (without_fragment, fragment) = match target.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (target, None),
    };
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };
    TargetParts {
        path,
        query,
        fragment,
    }
}

/// Mode requested by a navigation target's query string.
///
/// Absent, or any value other than exactly `"admin"`, means view mode.
#[must_use]
pub fn mode_from_target(target: &str) -> Mode {
    let parts = split_target(target);
    let Some(query) = parts.query else {
        return Mode::View;
    };
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == MODE_QUERY_PARAM {
            return if value == ADMIN_MODE_VALUE {
                Mode::Admin
            } else {
                Mode::View
            };
        }
    }
    Mode::View
}

/// Rewrite a navigation target so its query carries `mode`, preserving
/// the path, every other query parameter, and the fragment.
///
/// View mode serializes as the absence of the parameter, so a target that
/// never mentions mode comes back unchanged.
#[must_use]
pub fn append_mode_to(target: &str, mode: Mode) -> String {
    let parts = split_target(target);

    let mut pairs: Vec<(String, String)> = Vec::new();
    if let Some(query) = parts.query {
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key != MODE_QUERY_PARAM {
                pairs.push((key.into_owned(), value.into_owned()));
            }
        }
    }
    if mode.is_admin() {
        pairs.push((MODE_QUERY_PARAM.to_string(), ADMIN_MODE_VALUE.to_string()));
    }

    let mut rewritten = parts.path.to_string();
    if !pairs.is_empty() {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &pairs {
            serializer.append_pair(key, value);
        }
        rewritten.push('?');
        rewritten.push_str(&serializer.finish());
    }
    if let Some(fragment) = parts.fragment {
        rewritten.push('#');
        rewritten.push_str(fragment);
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_is_derived_from_the_query_parameter() {
        assert_eq!(mode_from_target("/projects"), Mode::View);
        assert_eq!(mode_from_target("/projects?mode=admin"), Mode::Admin);
        assert_eq!(mode_from_target("/projects?mode=Admin"), Mode::View);
        assert_eq!(mode_from_target("/projects?mode=editor"), Mode::View);
        assert_eq!(mode_from_target("/projects?tag=web&mode=admin#top"), Mode::Admin);
    }

    #[test]
    fn view_mode_serializes_as_absence() {
        assert_eq!(append_mode_to("/projects", Mode::View), "/projects");
        assert_eq!(append_mode_to("/projects?mode=admin", Mode::View), "/projects");
    }

    #[test]
    fn admin_mode_is_appended_once() {
        assert_eq!(
            append_mode_to("/contact", Mode::Admin),
            "/contact?mode=admin"
        );
        assert_eq!(
            append_mode_to("/contact?mode=admin", Mode::Admin),
            "/contact?mode=admin"
        );
    }

    #[test]
    fn other_parameters_and_fragment_survive_a_rewrite() {
        assert_eq!(
            append_mode_to("/work?tag=web&page=2#gallery", Mode::Admin),
            "/work?tag=web&page=2&mode=admin#gallery"
        );
        assert_eq!(
            append_mode_to("/work?tag=web&mode=admin&page=2#gallery", Mode::View),
            "/work?tag=web&page=2#gallery"
        );
    }

    #[test]
    fn rewriting_an_unchanged_mode_is_idempotent() {
        for target in ["/about", "/about?lang=de", "/about?mode=admin&lang=de#bio"] {
            let mode = mode_from_target(target);
            let once = append_mode_to(target, mode);
            let twice = append_mode_to(&once, mode);
            assert_eq!(once, twice);
            assert_eq!(mode_from_target(&once), mode);
        }
    }

    #[test]
    fn absolute_targets_are_supported() {
        assert_eq!(
            append_mode_to("https://atelier.example.com/work?tag=web", Mode::Admin),
            "https://atelier.example.com/work?tag=web&mode=admin"
        );
    }
}
