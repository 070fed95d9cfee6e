use regex::Regex;
use std::sync::LazyLock;

static PUBLIC_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+(?:(?:final|abstract|strictfp)\s+)*class\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .expect("public class pattern is valid")
});

/// Name of the first public class declared in `source`.
///
/// `javac` requires a public class to live in a file of the same name, and
/// `java` launches it by that name, so this is both the file stem and the
/// program identifier.
pub fn public_class_name(source: &str) -> Option<&str> {
    PUBLIC_CLASS
        .captures(source)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}
