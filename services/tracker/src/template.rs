//! Placeholder substitution for provider-supplied URLs
//!
//! Survey providers and administrators paste URLs containing `{NAME}`
//! placeholders. Both the upper- and lower-case spellings are accepted;
//! unrecognized placeholders pass through untouched so provider-specific
//! macros survive. A recognized placeholder with no binding substitutes
//! the empty string, never the literal.

/// Values available for substitution. A `None` binding substitutes as
/// the empty string.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bindings<'a> {
    /// The provider's external respondent id. Deliberately left unbound
    /// when building the outbound survey URL so it is never forwarded.
    pub user_id: Option<&'a str>,
    pub masked_id: Option<&'a str>,
    pub project_uid: Option<&'a str>,
}

/// Substitute the recognized placeholders into `template`.
pub fn substitute(template: &str, bindings: &Bindings) -> String {
    if template.is_empty() {
        return String::new();
    }

    let user_id = bindings.user_id.unwrap_or("");
    let masked_id = bindings.masked_id.unwrap_or("");
    let project_uid = bindings.project_uid.unwrap_or("");

    let pairs: [(&str, &str); 7] = [
        ("USER_ID", user_id),
        ("UID", user_id),
        ("ID", user_id),
        ("MASKED_ID", masked_id),
        ("MID", masked_id),
        ("PROJECT_UID", project_uid),
        ("PID", project_uid),
    ];

    let mut out = template.to_string();
    for (name, value) in pairs {
        out = out.replace(&format!("{{{name}}}"), value);
        out = out.replace(&format!("{{{}}}", name.to_ascii_lowercase()), value);
    }
    out
}

/// Append a URL-encoded `key=value` pair, picking `&` or `?` from the
/// presence of an existing query string. An empty input URL is returned
/// unchanged; this never fails.
pub fn append_param(url: &str, key: &str, value: &str) -> String {
    if url.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{}={}", encode(key), encode(value))
}

fn encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_both_cases_and_aliases() {
        let bindings = Bindings {
            user_id: Some("u-9"),
            masked_id: Some("m-1"),
            project_uid: Some("P1234567"),
        };
        assert_eq!(
            substitute("https://s.example/?a={USER_ID}&b={uid}&c={ID}", &bindings),
            "https://s.example/?a=u-9&b=u-9&c=u-9"
        );
        assert_eq!(
            substitute("{MASKED_ID}/{mid}/{PROJECT_UID}/{pid}", &bindings),
            "m-1/m-1/P1234567/P1234567"
        );
    }

    #[test]
    fn missing_binding_becomes_empty_string() {
        let bindings = Bindings {
            masked_id: Some("m-1"),
            ..Bindings::default()
        };
        assert_eq!(
            substitute("https://s.example/?uid={USER_ID}&mid={MASKED_ID}", &bindings),
            "https://s.example/?uid=&mid=m-1"
        );
    }

    #[test]
    fn unrecognized_placeholders_pass_through() {
        let out = substitute("https://s.example/?x={SURVEY_TOKEN}", &Bindings::default());
        assert_eq!(out, "https://s.example/?x={SURVEY_TOKEN}");
    }

    #[test]
    fn append_param_picks_separator() {
        assert_eq!(
            append_param("https://s.example/run", "mid", "m 1"),
            "https://s.example/run?mid=m+1"
        );
        assert_eq!(
            append_param("https://s.example/run?a=1", "mid", "m1"),
            "https://s.example/run?a=1&mid=m1"
        );
    }

    #[test]
    fn append_param_on_empty_url_is_a_no_op() {
        assert_eq!(append_param("", "mid", "m1"), "");
    }
}
