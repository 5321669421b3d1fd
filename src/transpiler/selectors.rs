//! Smart selector inference: picks the Playwright locator call that fits a
//! selector string.

use std::sync::LazyLock;

use regex::Regex;

use super::writer::quote;

/// A tag name followed by an id, class, attribute or pseudo-class: `input[name=q]`,
/// `button.primary`, `a:has-text("x")`.
static TAG_WITH_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][\w-]*(\[|\.[\w-]|#[\w-]|:[a-z])").expect("valid selector pattern")
});

static TEST_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[data-testid\s*=\s*["']?([^"'\]]+)["']?\]$"#).expect("valid selector pattern")
});

/// Returns the locator call for `selector` on `root` (`page` or a frame).
///
/// | selector                | call                |
/// |-------------------------|---------------------|
/// | `[data-testid=x]`       | `getByTestId('x')`  |
/// | `//div`, `xpath=...`    | `locator(...)`      |
/// | `#id`, `.cls`, `[attr]`, `tag.cls`, `a > b` | `locator(...)` |
/// | `text=Sign in`          | `getByText(...)`    |
/// | `label=Email`           | `getByLabel(...)`   |
/// | `placeholder=Search`    | `getByPlaceholder(...)` |
/// | `role=button`           | `getByRole(...)`    |
/// | anything else           | `getByText(...)`    |
pub(crate) fn locator_for(root: &str, selector: &str) -> String {
    let selector = selector.trim();

    if let Some(captures) = TEST_ID.captures(selector) {
        return format!("{}.getByTestId({})", root, quote(&captures[1]));
    }

    for (prefix, method) in [
        ("text=", "getByText"),
        ("label=", "getByLabel"),
        ("placeholder=", "getByPlaceholder"),
        ("role=", "getByRole"),
    ] {
        if let Some(rest) = selector.strip_prefix(prefix) {
            return format!("{}.{}({})", root, method, quote(rest.trim()));
        }
    }

    if is_css_or_xpath(selector) {
        format!("{}.locator({})", root, quote(selector))
    } else {
        format!("{}.getByText({})", root, quote(selector))
    }
}

fn is_css_or_xpath(selector: &str) -> bool {
    selector.starts_with("//")
        || selector.starts_with("(//")
        || selector.starts_with("xpath=")
        || selector.starts_with("css=")
        || selector.starts_with(['#', '.', '['])
        || selector.contains(" > ")
        || selector.contains(">>")
        || TAG_WITH_QUALIFIER.is_match(selector)
}
